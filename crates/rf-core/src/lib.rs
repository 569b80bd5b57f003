//! rusty-forum/crates/rf-core/src/lib.rs
//!
//! The central domain logic and interface definitions for the forum:
//! models, the moderation & visibility engine, listing order, and the
//! storage port.

pub mod error;
pub mod feed;
pub mod models;
pub mod ordering;
pub mod pagination;
pub mod service;
pub mod slug;
pub mod state;
pub mod traits;
pub mod visibility;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
pub use visibility::*;
