//! Feature modules. Each one registers itself with `inventory::submit!` and
//! is enabled by name through `modules.enabled`.

pub mod books;
pub mod reviews;
