//! Folio kernel: module trait, registry, and layered settings.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module, ModuleFactory, Resources};
pub use registry::ModuleRegistry;
