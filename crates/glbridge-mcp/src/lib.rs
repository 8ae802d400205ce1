//! MCP (Model Context Protocol) server for glbridge.
//!
//! This crate exposes GitLab issues, merge requests, discussions, pipelines
//! and related resources as MCP tools over stdio.

pub mod discussions;
pub mod encode;
pub mod parse;
pub mod protocol;
pub mod reflect;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;

pub use encode::ToolOutput;
pub use registry::{ToolContext, ToolHints, ToolRegistry};
pub use server::McpServer;
pub use tools::catalogue;
