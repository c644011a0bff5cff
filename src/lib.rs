//! Catalog Application Library
//!
//! Book copy management for a library catalog, assembled from the kernel,
//! db and http crates.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::App;
