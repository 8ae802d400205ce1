//! Merge request tools.

use std::sync::Arc;

use serde::Serialize;

use glbridge_core::api::{ListMergeRequestsOptions, UpdateMergeRequestOptions};
use glbridge_core::paginate::{collect_all, paginate, paginate_scoped, ListOptions};
use glbridge_core::types::{Diff, Discussion, MergeRequest};
use glbridge_core::{Error, Id, Noteable, OptionalBool, Result, ResultExt};

use super::{take, DEFAULT_LIMIT};
use crate::discussions::DiscussionManager;
use crate::encode::ToolOutput;
use crate::parse::{non_empty, parse_labels, parse_user_ids};
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "list_user_merge_requests",
            "List merge requests a user authored or reviews, across all projects. Defaults to the authenticated user.",
            ToolHints::READ_ONLY,
            list_user_merge_requests,
        )
        .register(
            "list_project_merge_requests",
            "List the merge requests of a project.",
            ToolHints::READ_ONLY,
            list_project_merge_requests,
        )
        .register(
            "list_group_merge_requests",
            "List the merge requests of a group and its projects.",
            ToolHints::READ_ONLY,
            list_group_merge_requests,
        )
        .register(
            "get_merge_request",
            "Get a merge request together with its discussions and diffs.",
            ToolHints::READ_ONLY,
            get_merge_request,
        )
        .register(
            "get_merge_request_approvals",
            "Get the approval state of a merge request.",
            ToolHints::READ_ONLY,
            get_merge_request_approvals,
        )
        .register(
            "get_merge_request_commits",
            "List the commits of a merge request.",
            ToolHints::READ_ONLY,
            get_merge_request_commits,
        )
        .register(
            "list_merge_request_diffs",
            "List the file diffs of a merge request.",
            ToolHints::READ_ONLY,
            list_merge_request_diffs,
        )
        .register(
            "get_merge_request_participants",
            "List the users taking part in a merge request.",
            ToolHints::READ_ONLY,
            get_merge_request_participants,
        )
        .register(
            "get_merge_request_reviewers",
            "List the reviewers of a merge request and their review state.",
            ToolHints::READ_ONLY,
            get_merge_request_reviewers,
        )
        .register(
            "list_merge_request_pipelines",
            "List the pipelines run for a merge request.",
            ToolHints::READ_ONLY,
            list_merge_request_pipelines,
        )
        .register(
            "get_issues_closed_on_merge",
            "List the issues a merge request closes once merged.",
            ToolHints::READ_ONLY,
            get_issues_closed_on_merge,
        )
        .register(
            "get_merge_request_dependencies",
            "List the merge requests that block a merge request.",
            ToolHints::READ_ONLY,
            get_merge_request_dependencies,
        )
        .register(
            "edit_merge_request",
            "Update a merge request.",
            ToolHints::IDEMPOTENT,
            edit_merge_request,
        )
        .register(
            "list_draft_notes",
            "List the pending draft review notes of a merge request.",
            ToolHints::READ_ONLY,
            list_draft_notes,
        );
}

tool_args! {
    pub struct ListUserMergeRequestsArgs {
        /// Username; the authenticated user when empty
        username: Option<String>,
        /// Whether the user authored or reviews the merge requests
        role: Option<String> [one_of = ["author", "reviewer"]],
        /// Merge request state
        state: Option<String> [one_of = ["opened", "closed", "locked", "merged", "all"]],
        /// Comma-separated label names
        labels: Option<String>,
        /// Search in title and description
        search: Option<String>,
        /// Only merge requests created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only merge requests created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Only merge requests updated on or after this ISO 8601 time
        updated_after: Option<String>,
        /// Only merge requests updated on or before this ISO 8601 time
        updated_before: Option<String>,
        /// Sort field
        order_by: Option<String> [one_of = ["created_at", "updated_at", "merged_at", "title"]],
        /// Sort direction
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of merge requests to return
        limit: i64,
    }
}

tool_args! {
    pub struct ListProjectMergeRequestsArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Merge request state
        state: Option<String> [one_of = ["opened", "closed", "locked", "merged", "all"]],
        /// Comma-separated label names
        labels: Option<String>,
        /// Search in title and description
        search: Option<String>,
        /// Only merge requests created by this username
        author_username: Option<String>,
        /// Only merge requests reviewed by this username
        reviewer_username: Option<String>,
        /// Source branch name
        source_branch: Option<String>,
        /// Target branch name
        target_branch: Option<String>,
        /// Only merge requests created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only merge requests created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Only merge requests updated on or after this ISO 8601 time
        updated_after: Option<String>,
        /// Only merge requests updated on or before this ISO 8601 time
        updated_before: Option<String>,
        /// Sort field
        order_by: Option<String> [one_of = ["created_at", "updated_at", "merged_at", "title"]],
        /// Sort direction
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of merge requests to return
        limit: i64,
    }
}

tool_args! {
    pub struct ListGroupMergeRequestsArgs {
        /// Group ID or path
        group_id: Id [required],
        /// Merge request state
        state: Option<String> [one_of = ["opened", "closed", "locked", "merged", "all"]],
        /// Comma-separated label names
        labels: Option<String>,
        /// Search in title and description
        search: Option<String>,
        /// Only merge requests created by this username
        author_username: Option<String>,
        /// Only merge requests reviewed by this username
        reviewer_username: Option<String>,
        /// Source branch name
        source_branch: Option<String>,
        /// Target branch name
        target_branch: Option<String>,
        /// Only merge requests created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only merge requests created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Only merge requests updated on or after this ISO 8601 time
        updated_after: Option<String>,
        /// Only merge requests updated on or before this ISO 8601 time
        updated_before: Option<String>,
        /// Sort field
        order_by: Option<String> [one_of = ["created_at", "updated_at", "merged_at", "title"]],
        /// Sort direction
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of merge requests to return
        limit: i64,
    }
}

tool_args! {
    pub struct GetMergeRequestArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Merge request IID
        merge_request_iid: u64 [required],
        /// Include internal notes
        confidential: bool,
    }
}

tool_args! {
    pub struct MergeRequestArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Merge request IID
        merge_request_iid: u64 [required],
    }
}

tool_args! {
    pub struct MergeRequestListArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Merge request IID
        merge_request_iid: u64 [required],
        /// Maximum number of items to return
        limit: i64,
    }
}

tool_args! {
    pub struct EditMergeRequestArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Merge request IID
        merge_request_iid: u64 [required],
        /// New title
        title: Option<String>,
        /// New markdown description
        description: Option<String>,
        /// Close or reopen the merge request
        state_event: Option<String> [one_of = ["close", "reopen"]],
        /// New target branch
        target_branch: Option<String>,
        /// Comma-separated labels to add
        add_labels: Option<String>,
        /// Comma-separated labels to remove
        remove_labels: Option<String>,
        /// Comma-separated user IDs to assign; "-" unassigns everyone
        assignee_ids: String,
        /// Comma-separated user IDs to request review from; "-" removes every reviewer
        reviewer_ids: String,
        /// Milestone ID
        milestone_id: Option<u64>,
        /// Squash commits on merge
        squash: OptionalBool,
        /// Delete the source branch on merge
        remove_source_branch: OptionalBool,
        /// Lock or unlock the discussions
        discussion_locked: OptionalBool,
        /// Let members who can merge push to the source branch
        allow_collaboration: OptionalBool,
    }
}

/// Filters shared by the merge request listings.
struct MergeRequestFilters {
    state: Option<String>,
    labels: Option<String>,
    search: Option<String>,
    created_after: Option<String>,
    created_before: Option<String>,
    updated_after: Option<String>,
    updated_before: Option<String>,
    order_by: Option<String>,
    sort: Option<String>,
}

impl MergeRequestFilters {
    fn into_options(self) -> ListMergeRequestsOptions {
        ListMergeRequestsOptions {
            state: non_empty(self.state),
            labels: parse_labels(self.labels),
            search: non_empty(self.search),
            created_after: non_empty(self.created_after),
            created_before: non_empty(self.created_before),
            updated_after: non_empty(self.updated_after),
            updated_before: non_empty(self.updated_before),
            order_by: non_empty(self.order_by),
            sort: non_empty(self.sort),
            list: ListOptions::max_page(),
            ..Default::default()
        }
    }
}

async fn list_user_merge_requests(
    ctx: Arc<ToolContext>,
    args: ListUserMergeRequestsArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let username =
        non_empty(args.username).unwrap_or_else(|| ctx.current_user.username.clone());
    let role = non_empty(args.role).unwrap_or_else(|| "author".to_string());

    let mut opts = ListMergeRequestsOptions {
        scope: Some("all".to_string()),
        ..MergeRequestFilters {
            state: args.state,
            labels: args.labels,
            search: args.search,
            created_after: args.created_after,
            created_before: args.created_before,
            updated_after: args.updated_after,
            updated_before: args.updated_before,
            order_by: args.order_by,
            sort: args.sort,
        }
        .into_options()
    };
    match role.as_str() {
        "author" => opts.author_username = Some(username.clone()),
        "reviewer" => opts.reviewer_username = Some(username.clone()),
        other => {
            return Err(Error::InvalidArgument(format!(
                "role must be author or reviewer, got {:?}",
                other
            )))
        }
    }

    let merge_requests = paginate(opts, move |opts| async move {
        svc.list_merge_requests(opts).await
    });
    let merge_requests = take(merge_requests, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list merge requests where {} is {}", username, role))?;
    ToolOutput::list(merge_requests)
}

async fn list_project_merge_requests(
    ctx: Arc<ToolContext>,
    args: ListProjectMergeRequestsArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let opts = ListMergeRequestsOptions {
        author_username: non_empty(args.author_username),
        reviewer_username: non_empty(args.reviewer_username),
        source_branch: non_empty(args.source_branch),
        target_branch: non_empty(args.target_branch),
        ..MergeRequestFilters {
            state: args.state,
            labels: args.labels,
            search: args.search,
            created_after: args.created_after,
            created_before: args.created_before,
            updated_after: args.updated_after,
            updated_before: args.updated_before,
            order_by: args.order_by,
            sort: args.sort,
        }
        .into_options()
    };

    let project = args.project_id;
    let merge_requests = paginate_scoped(project.clone(), opts, move |project, opts| async move {
        svc.list_project_merge_requests(&project, opts).await
    });
    let merge_requests = take(merge_requests, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list merge requests of project {}", project))?;
    ToolOutput::list(merge_requests)
}

async fn list_group_merge_requests(
    ctx: Arc<ToolContext>,
    args: ListGroupMergeRequestsArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let opts = ListMergeRequestsOptions {
        author_username: non_empty(args.author_username),
        reviewer_username: non_empty(args.reviewer_username),
        source_branch: non_empty(args.source_branch),
        target_branch: non_empty(args.target_branch),
        ..MergeRequestFilters {
            state: args.state,
            labels: args.labels,
            search: args.search,
            created_after: args.created_after,
            created_before: args.created_before,
            updated_after: args.updated_after,
            updated_before: args.updated_before,
            order_by: args.order_by,
            sort: args.sort,
        }
        .into_options()
    };

    let group = args.group_id;
    let merge_requests = paginate_scoped(group.clone(), opts, move |group, opts| async move {
        svc.list_group_merge_requests(&group, opts).await
    });
    let merge_requests = take(merge_requests, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list merge requests of group {}", group))?;
    ToolOutput::list(merge_requests)
}

#[derive(Serialize)]
struct MergeRequestDetails {
    merge_request: MergeRequest,
    discussions: Vec<Discussion>,
    diffs: Vec<Diff>,
}

async fn get_merge_request(ctx: Arc<ToolContext>, args: GetMergeRequestArgs) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let project = &args.project_id;
    let iid = args.merge_request_iid;
    let manager = DiscussionManager::new(
        ctx.client.discussions.as_ref(),
        Noteable::MergeRequest {
            project: project.clone(),
            iid,
        },
    )?;

    let diffs = paginate_scoped(
        project.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_diffs(&project, iid, opts).await },
    );

    let (merge_request, discussions, diffs) = tokio::join!(
        async {
            svc.get_merge_request(project, iid)
                .await
                .with_context(|| format!("get merge request {}!{}", project, iid))
        },
        manager.list(args.confidential),
        async {
            collect_all(diffs)
                .await
                .with_context(|| format!("list diffs of merge request {}!{}", project, iid))
        },
    );

    match (merge_request, discussions, diffs) {
        (Ok(merge_request), Ok(discussions), Ok(diffs)) => {
            ToolOutput::json(&MergeRequestDetails {
                merge_request,
                discussions,
                diffs,
            })
        }
        (merge_request, discussions, diffs) => {
            let errors = [merge_request.err(), discussions.err(), diffs.err()]
                .into_iter()
                .flatten()
                .collect();
            Err(Error::joined(errors).context(format!(
                "get merge request {}!{} with discussions and diffs",
                project, iid
            )))
        }
    }
}

async fn get_merge_request_approvals(
    ctx: Arc<ToolContext>,
    args: MergeRequestArgs,
) -> Result<ToolOutput> {
    let approvals = ctx
        .client
        .merge_requests
        .get_approvals(&args.project_id, args.merge_request_iid)
        .await
        .with_context(|| {
            format!(
                "get approvals of merge request {}!{}",
                args.project_id, args.merge_request_iid
            )
        })?;
    ToolOutput::json(&approvals)
}

async fn get_merge_request_commits(
    ctx: Arc<ToolContext>,
    args: MergeRequestListArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let iid = args.merge_request_iid;

    let commits = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_commits(&project, iid, opts).await },
    );
    let commits = take(commits, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list commits of merge request {}!{}", args.project_id, iid))?;
    ToolOutput::list(commits)
}

async fn list_merge_request_diffs(
    ctx: Arc<ToolContext>,
    args: MergeRequestListArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let iid = args.merge_request_iid;

    let diffs = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_diffs(&project, iid, opts).await },
    );
    let diffs = take(diffs, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list diffs of merge request {}!{}", args.project_id, iid))?;
    ToolOutput::list(diffs)
}

async fn get_merge_request_participants(
    ctx: Arc<ToolContext>,
    args: MergeRequestListArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let iid = args.merge_request_iid;

    let participants = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_participants(&project, iid, opts).await },
    );
    let participants = take(participants, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("get participants of merge request {}!{}", args.project_id, iid))?;
    ToolOutput::list(participants)
}

async fn get_merge_request_reviewers(
    ctx: Arc<ToolContext>,
    args: MergeRequestListArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let iid = args.merge_request_iid;

    let reviewers = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_reviewers(&project, iid, opts).await },
    );
    let reviewers = take(reviewers, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("get reviewers of merge request {}!{}", args.project_id, iid))?;
    ToolOutput::list(reviewers)
}

async fn list_merge_request_pipelines(
    ctx: Arc<ToolContext>,
    args: MergeRequestListArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.pipelines.as_ref();
    let iid = args.merge_request_iid;

    let pipelines = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move {
            svc.list_merge_request_pipelines(&project, iid, opts).await
        },
    );
    let pipelines = take(pipelines, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list pipelines of merge request {}!{}", args.project_id, iid))?;
    ToolOutput::list(pipelines)
}

async fn get_issues_closed_on_merge(
    ctx: Arc<ToolContext>,
    args: MergeRequestListArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let iid = args.merge_request_iid;

    let issues = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_closes_issues(&project, iid, opts).await },
    );
    let issues = take(issues, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| {
            format!(
                "list issues closed by merge request {}!{}",
                args.project_id, iid
            )
        })?;
    ToolOutput::list(issues)
}

async fn get_merge_request_dependencies(
    ctx: Arc<ToolContext>,
    args: MergeRequestListArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.merge_requests.as_ref();
    let iid = args.merge_request_iid;

    let dependencies = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_dependencies(&project, iid, opts).await },
    );
    let dependencies = take(dependencies, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("get dependencies of merge request {}!{}", args.project_id, iid))?;
    ToolOutput::list(dependencies)
}

async fn edit_merge_request(
    ctx: Arc<ToolContext>,
    args: EditMergeRequestArgs,
) -> Result<ToolOutput> {
    let opts = UpdateMergeRequestOptions {
        title: non_empty(args.title),
        description: args.description,
        state_event: non_empty(args.state_event),
        target_branch: non_empty(args.target_branch),
        add_labels: parse_labels(args.add_labels),
        remove_labels: parse_labels(args.remove_labels),
        assignee_ids: parse_user_ids(&args.assignee_ids),
        reviewer_ids: parse_user_ids(&args.reviewer_ids),
        milestone_id: args.milestone_id,
        squash: args.squash.get(),
        remove_source_branch: args.remove_source_branch.get(),
        discussion_locked: args.discussion_locked.get(),
        allow_collaboration: args.allow_collaboration.get(),
    };

    let merge_request = ctx
        .client
        .merge_requests
        .update_merge_request(&args.project_id, args.merge_request_iid, opts)
        .await
        .with_context(|| {
            format!(
                "update merge request {}!{}",
                args.project_id, args.merge_request_iid
            )
        })?;
    ToolOutput::json(&merge_request)
}

async fn list_draft_notes(ctx: Arc<ToolContext>, args: MergeRequestListArgs) -> Result<ToolOutput> {
    let svc = ctx.client.draft_notes.as_ref();
    let iid = args.merge_request_iid;

    let notes = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_draft_notes(&project, iid, opts).await },
    );
    let notes = take(notes, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| {
            format!(
                "list draft notes of merge request {}!{}",
                args.project_id, iid
            )
        })?;
    ToolOutput::list(notes)
}
