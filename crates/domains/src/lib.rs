//! crates/domains/src/lib.rs
//!
//! The central domain model and interface definitions for the news board.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
