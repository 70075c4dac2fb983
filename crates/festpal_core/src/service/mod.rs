//! Use-case facade over the internal and external databases.
//!
//! # Responsibility
//! - Orchestrate repository and remote calls into app-level operations.
//! - Keep FFI/CLI layers decoupled from storage and wire details.

pub mod data_model;

pub use data_model::{DataModel, DataModelError, DataModelResult};
