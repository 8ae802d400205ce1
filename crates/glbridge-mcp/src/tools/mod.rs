//! The GitLab tool catalogue.
//!
//! Every handler follows the same shape: decode its argument struct, check
//! cross-field constraints, build the upstream options, call the service
//! (through the paginator for listings) and encode the result.

use futures::stream::BoxStream;

use glbridge_core::paginate::{collect_all, effective_limit, limited};
use glbridge_core::Result;

use crate::registry::ToolRegistry;

mod discussions;
mod epics;
mod events;
mod issues;
mod jobs;
mod merge_requests;
mod repository;
mod snippets;
mod todos;
mod users;

/// Items returned by a listing when `limit` is not positive.
pub const DEFAULT_LIMIT: usize = 1000;

/// Default `limit` of `list_user_todos`.
pub const TODO_LIMIT: usize = 100;

/// Every GitLab tool.
pub fn catalogue() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    discussions::register(&mut registry);
    epics::register(&mut registry);
    issues::register(&mut registry);
    merge_requests::register(&mut registry);
    jobs::register(&mut registry);
    snippets::register(&mut registry);
    todos::register(&mut registry);
    users::register(&mut registry);
    events::register(&mut registry);
    repository::register(&mut registry);
    registry
}

/// Collect up to `limit` items of a listing.
async fn take<T: Send>(items: BoxStream<'_, Result<T>>, limit: i64, default: usize) -> Result<Vec<T>> {
    collect_all(limited(items, effective_limit(limit, default))).await
}
