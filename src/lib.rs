//! Folio application library: the book catalog and review modules plus the
//! bootstrap that wires them into the HTTP server.

pub mod bootstrap;
pub mod error;
pub mod modules;
pub mod utils;

pub use bootstrap::{migrate, prepare, serve};
