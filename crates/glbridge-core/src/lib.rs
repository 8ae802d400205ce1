//! Core types, upstream service traits and error handling for glbridge.
//!
//! This crate provides the foundational abstractions shared by the GitLab
//! client and the MCP server.

pub mod api;
pub mod config;
pub mod error;
pub mod paginate;
pub mod scalar;
pub mod types;

pub use api::{Client, Noteable};
pub use config::{Config, Credentials};
pub use error::{Error, Result, ResultExt};
pub use paginate::{Page, Paginated};
pub use scalar::{Id, OptionalBool};
