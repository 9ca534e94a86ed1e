//! Project-specific utilities live here.

/// True when `value` is empty or whitespace only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// True when `value` is absent, empty, or whitespace only.
pub fn is_missing(value: Option<&str>) -> bool {
    value.map_or(true, is_blank)
}
