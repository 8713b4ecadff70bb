//! localqa-core
//!
//! Domain types, collaborator traits and configuration shared by the
//! retrieval, context and CLI crates.

pub mod config;
pub mod corpus;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
