//! The array simulator engine: resource model, persistence, background
//! workers, and the Housekeeper. The `rest` crate is a thin HTTP façade
//! over this crate's `Registry`.

pub mod global_registry;
pub mod housekeeper;
pub mod logger;
pub mod persistence;
pub mod registry;
pub mod specs;
pub mod workers;

pub use registry::Registry;
