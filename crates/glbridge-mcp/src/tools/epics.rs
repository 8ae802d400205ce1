//! Group epic tools.

use std::sync::Arc;

use glbridge_core::api::ListEpicsOptions;
use glbridge_core::paginate::{paginate_scoped, ListOptions};
use glbridge_core::{Id, OptionalBool, Result, ResultExt};

use super::{take, DEFAULT_LIMIT};
use crate::encode::ToolOutput;
use crate::parse::{non_empty, parse_labels};
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "list_group_epics",
            "List the epics of a group.",
            ToolHints::READ_ONLY,
            list_group_epics,
        )
        .register(
            "get_epic",
            "Get a single epic of a group.",
            ToolHints::READ_ONLY,
            get_epic,
        )
        .register(
            "get_epic_links",
            "List the child epics of an epic.",
            ToolHints::READ_ONLY,
            get_epic_links,
        )
        .register(
            "list_epic_issues",
            "List the issues assigned to an epic.",
            ToolHints::READ_ONLY,
            list_epic_issues,
        );
}

tool_args! {
    pub struct ListGroupEpicsArgs {
        /// Group ID or path
        group_id: Id [required],
        /// Only epics created by this user ID
        author_id: Option<u64>,
        /// Comma-separated label names
        labels: Option<String>,
        /// Epic state
        state: Option<String> [one_of = ["opened", "closed", "all"]],
        /// Search in title and description
        search: Option<String>,
        /// Include epics of ancestor groups
        include_ancestor_groups: OptionalBool,
        /// Include epics of descendant groups
        include_descendant_groups: OptionalBool,
        /// Only epics created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only epics created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Only epics updated on or after this ISO 8601 time
        updated_after: Option<String>,
        /// Only epics updated on or before this ISO 8601 time
        updated_before: Option<String>,
        /// Sort field
        order_by: Option<String> [one_of = ["created_at", "updated_at", "title"]],
        /// Sort direction
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of epics to return
        limit: i64,
    }
}

tool_args! {
    pub struct EpicArgs {
        /// Group ID or path
        group_id: Id [required],
        /// Epic IID
        epic_iid: u64 [required],
    }
}

tool_args! {
    pub struct EpicListArgs {
        /// Group ID or path
        group_id: Id [required],
        /// Epic IID
        epic_iid: u64 [required],
        /// Maximum number of items to return
        limit: i64,
    }
}

async fn list_group_epics(ctx: Arc<ToolContext>, args: ListGroupEpicsArgs) -> Result<ToolOutput> {
    let svc = ctx.client.epics.as_ref();
    let opts = ListEpicsOptions {
        author_id: args.author_id,
        labels: parse_labels(args.labels),
        state: non_empty(args.state),
        search: non_empty(args.search),
        include_ancestor_groups: args.include_ancestor_groups.get(),
        include_descendant_groups: args.include_descendant_groups.get(),
        created_after: non_empty(args.created_after),
        created_before: non_empty(args.created_before),
        updated_after: non_empty(args.updated_after),
        updated_before: non_empty(args.updated_before),
        order_by: non_empty(args.order_by),
        sort: non_empty(args.sort),
        list: ListOptions::max_page(),
    };

    let group = args.group_id;
    let epics = paginate_scoped(group.clone(), opts, move |group, opts| async move {
        svc.list_group_epics(&group, opts).await
    });
    let epics = take(epics, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list epics of group {}", group))?;
    ToolOutput::list(epics)
}

async fn get_epic(ctx: Arc<ToolContext>, args: EpicArgs) -> Result<ToolOutput> {
    let epic = ctx
        .client
        .epics
        .get_epic(&args.group_id, args.epic_iid)
        .await
        .with_context(|| format!("get epic {}&{}", args.group_id, args.epic_iid))?;
    ToolOutput::json(&epic)
}

async fn get_epic_links(ctx: Arc<ToolContext>, args: EpicListArgs) -> Result<ToolOutput> {
    let svc = ctx.client.epics.as_ref();
    let iid = args.epic_iid;

    let children = paginate_scoped(
        args.group_id.clone(),
        ListOptions::max_page(),
        move |group, opts| async move { svc.list_child_epics(&group, iid, opts).await },
    );
    let children = take(children, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list child epics of {}&{}", args.group_id, iid))?;
    ToolOutput::list(children)
}

async fn list_epic_issues(ctx: Arc<ToolContext>, args: EpicListArgs) -> Result<ToolOutput> {
    let svc = ctx.client.epics.as_ref();
    let iid = args.epic_iid;

    let issues = paginate_scoped(
        args.group_id.clone(),
        ListOptions::max_page(),
        move |group, opts| async move { svc.list_epic_issues(&group, iid, opts).await },
    );
    let issues = take(issues, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list issues of epic {}&{}", args.group_id, iid))?;
    ToolOutput::list(issues)
}
