//! Contribution event tools.

use std::sync::Arc;

use glbridge_core::api::ListEventsOptions;
use glbridge_core::paginate::{effective_limit, paginate_scoped, ListOptions};
use glbridge_core::{Id, Result, ResultExt};

use super::{take, DEFAULT_LIMIT};
use crate::encode::ToolOutput;
use crate::parse::non_empty;
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry.register(
        "list_user_events",
        "List the contribution events of a user. Without a date range only the most recent page is returned.",
        ToolHints::READ_ONLY,
        list_user_events,
    );
}

tool_args! {
    pub struct ListUserEventsArgs {
        /// User ID or username; the authenticated user when empty
        user_id: Id,
        /// Event action
        action: Option<String> [one_of = [
            "approved",
            "closed",
            "commented",
            "created",
            "destroyed",
            "expired",
            "joined",
            "left",
            "merged",
            "pushed",
            "reopened",
            "updated",
        ]],
        /// Type of the target resource
        target_type: Option<String> [one_of = [
            "epic",
            "issue",
            "merge_request",
            "milestone",
            "note",
            "project",
            "snippet",
            "user",
        ]],
        /// Only events created before this date (YYYY-MM-DD)
        before: Option<String>,
        /// Only events created after this date (YYYY-MM-DD)
        after: Option<String>,
        /// Sort direction by creation date
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of events to return when a date range is given
        limit: i64,
    }
}

async fn list_user_events(ctx: Arc<ToolContext>, args: ListUserEventsArgs) -> Result<ToolOutput> {
    let svc = ctx.client.events.as_ref();
    let user = if args.user_id.is_zero() {
        Id::Path(ctx.current_user.username.clone())
    } else {
        args.user_id
    };

    let opts = ListEventsOptions {
        action: non_empty(args.action),
        target_type: non_empty(args.target_type),
        before: non_empty(args.before),
        after: non_empty(args.after),
        sort: non_empty(args.sort),
        list: ListOptions::max_page(),
    };

    // Unbounded history: one page only, whatever the cursor says.
    if opts.before.is_none() && opts.after.is_none() {
        let page = svc
            .list_user_events(&user, opts)
            .await
            .with_context(|| format!("list events of user {}", user))?;
        let mut events = page.items;
        events.truncate(effective_limit(args.limit, DEFAULT_LIMIT));
        return ToolOutput::list(events);
    }

    let events = paginate_scoped(user.clone(), opts, move |user, opts| async move {
        svc.list_user_events(&user, opts).await
    });
    let events = take(events, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list events of user {}", user))?;
    ToolOutput::list(events)
}
