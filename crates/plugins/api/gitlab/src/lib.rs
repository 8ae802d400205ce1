//! GitLab REST API v4 client for glbridge.
//!
//! [`GitLabClient`] implements every upstream service trait of
//! `glbridge-core` and is usually consumed through
//! [`GitLabClient::into_client`].

mod client;
mod services;

pub use client::GitLabClient;

/// Default GitLab API URL.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
