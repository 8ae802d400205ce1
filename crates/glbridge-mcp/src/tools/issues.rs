//! Issue tools.

use std::sync::Arc;

use serde::Serialize;

use glbridge_core::api::{CreateIssueOptions, ListIssuesOptions, UpdateIssueOptions};
use glbridge_core::paginate::{paginate, paginate_scoped, ListOptions};
use glbridge_core::types::{Discussion, Issue};
use glbridge_core::{Error, Id, Noteable, OptionalBool, Result, ResultExt};

use super::{take, DEFAULT_LIMIT};
use crate::discussions::DiscussionManager;
use crate::encode::ToolOutput;
use crate::parse::{confidential_filter, non_empty, parse_labels, parse_user_ids};
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "list_user_issues",
            "List issues assigned to a user across all projects. Defaults to the authenticated user.",
            ToolHints::READ_ONLY,
            list_user_issues,
        )
        .register(
            "list_group_issues",
            "List the issues of a group and its projects.",
            ToolHints::READ_ONLY,
            list_group_issues,
        )
        .register(
            "list_project_issues",
            "List the issues of a project.",
            ToolHints::READ_ONLY,
            list_project_issues,
        )
        .register(
            "get_issue",
            "Get an issue together with its discussions. Confidential issues require confidential=true.",
            ToolHints::READ_ONLY,
            get_issue,
        )
        .register(
            "list_merge_requests_related_to_issue",
            "List merge requests that reference or close an issue.",
            ToolHints::READ_ONLY,
            list_merge_requests_related_to_issue,
        )
        .register(
            "create_issue",
            "Create a new issue in a project.",
            ToolHints::MUTATING,
            create_issue,
        )
        .register(
            "edit_issue",
            "Update an issue. Confidential issues can only be edited with confidential=true.",
            ToolHints::IDEMPOTENT,
            edit_issue,
        );
}

tool_args! {
    pub struct ListUserIssuesArgs {
        /// Assignee username; the authenticated user when empty
        username: Option<String>,
        /// Issue state
        state: Option<String> [one_of = ["opened", "closed", "all"]],
        /// Comma-separated label names
        labels: Option<String>,
        /// Milestone title
        milestone: Option<String>,
        /// Search in title and description
        search: Option<String>,
        /// Include confidential issues
        confidential: bool,
        /// Only issues created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only issues created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Only issues updated on or after this ISO 8601 time
        updated_after: Option<String>,
        /// Only issues updated on or before this ISO 8601 time
        updated_before: Option<String>,
        /// Sort field
        order_by: Option<String> [one_of = ["created_at", "updated_at", "priority", "due_date", "relative_position", "label_priority", "milestone_due", "popularity", "weight"]],
        /// Sort direction
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of issues to return
        limit: i64,
    }
}

tool_args! {
    pub struct ListGroupIssuesArgs {
        /// Group ID or path
        group_id: Id [required],
        /// Issue state
        state: Option<String> [one_of = ["opened", "closed", "all"]],
        /// Comma-separated label names
        labels: Option<String>,
        /// Milestone title
        milestone: Option<String>,
        /// Search in title and description
        search: Option<String>,
        /// Only issues created by this username
        author_username: Option<String>,
        /// Only issues assigned to this username
        assignee_username: Option<String>,
        /// Include confidential issues
        confidential: bool,
        /// Only issues created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only issues created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Only issues updated on or after this ISO 8601 time
        updated_after: Option<String>,
        /// Only issues updated on or before this ISO 8601 time
        updated_before: Option<String>,
        /// Sort field
        order_by: Option<String> [one_of = ["created_at", "updated_at", "priority", "due_date", "relative_position", "label_priority", "milestone_due", "popularity", "weight"]],
        /// Sort direction
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of issues to return
        limit: i64,
    }
}

tool_args! {
    pub struct ListProjectIssuesArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Issue state
        state: Option<String> [one_of = ["opened", "closed", "all"]],
        /// Comma-separated label names
        labels: Option<String>,
        /// Milestone title
        milestone: Option<String>,
        /// Search in title and description
        search: Option<String>,
        /// Only issues created by this username
        author_username: Option<String>,
        /// Only issues assigned to this username
        assignee_username: Option<String>,
        /// Include confidential issues
        confidential: bool,
        /// Only issues created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only issues created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Only issues updated on or after this ISO 8601 time
        updated_after: Option<String>,
        /// Only issues updated on or before this ISO 8601 time
        updated_before: Option<String>,
        /// Sort field
        order_by: Option<String> [one_of = ["created_at", "updated_at", "priority", "due_date", "relative_position", "label_priority", "milestone_due", "popularity", "weight"]],
        /// Sort direction
        sort: Option<String> [one_of = ["asc", "desc"]],
        /// Maximum number of issues to return
        limit: i64,
    }
}

tool_args! {
    pub struct GetIssueArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Issue IID
        issue_iid: u64 [required],
        /// Allow confidential issues and include internal notes
        confidential: bool,
    }
}

tool_args! {
    pub struct ListRelatedMergeRequestsArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Issue IID
        issue_iid: u64 [required],
        /// Maximum number of merge requests to return
        limit: i64,
    }
}

tool_args! {
    pub struct CreateIssueArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Issue title
        title: String [required],
        /// Markdown description
        description: Option<String>,
        /// Comma-separated label names
        labels: Option<String>,
        /// Comma-separated user IDs to assign
        assignee_ids: String,
        /// Milestone ID
        milestone_id: Option<u64>,
        /// Due date, YYYY-MM-DD
        due_date: Option<String>,
        /// Create the issue as confidential
        confidential: OptionalBool,
        /// Issue type
        issue_type: Option<String> [one_of = ["issue", "incident", "test_case", "task"]],
    }
}

tool_args! {
    pub struct EditIssueArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Issue IID
        issue_iid: u64 [required],
        /// New title
        title: Option<String>,
        /// New markdown description
        description: Option<String>,
        /// Close or reopen the issue
        state_event: Option<String> [one_of = ["close", "reopen"]],
        /// Comma-separated labels to add
        add_labels: Option<String>,
        /// Comma-separated labels to remove
        remove_labels: Option<String>,
        /// Comma-separated user IDs to assign; "-" unassigns everyone
        assignee_ids: String,
        /// Milestone ID
        milestone_id: Option<u64>,
        /// Due date, YYYY-MM-DD
        due_date: Option<String>,
        /// Required to edit a confidential issue; true also marks the issue confidential
        confidential: OptionalBool,
        /// Lock or unlock the discussions
        discussion_locked: OptionalBool,
    }
}

/// Filters shared by the issue listings.
struct IssueFilters {
    state: Option<String>,
    labels: Option<String>,
    milestone: Option<String>,
    search: Option<String>,
    confidential: bool,
    created_after: Option<String>,
    created_before: Option<String>,
    updated_after: Option<String>,
    updated_before: Option<String>,
    order_by: Option<String>,
    sort: Option<String>,
}

impl IssueFilters {
    fn into_options(self) -> ListIssuesOptions {
        ListIssuesOptions {
            state: non_empty(self.state),
            labels: parse_labels(self.labels),
            milestone: non_empty(self.milestone),
            search: non_empty(self.search),
            confidential: confidential_filter(self.confidential),
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

async fn list_user_issues(ctx: Arc<ToolContext>, args: ListUserIssuesArgs) -> Result<ToolOutput> {
    let svc = ctx.client.issues.as_ref();
    let username =
        non_empty(args.username).unwrap_or_else(|| ctx.current_user.username.clone());

    let opts = ListIssuesOptions {
        assignee_username: Some(username.clone()),
        scope: Some("all".to_string()),
        ..IssueFilters {
            state: args.state,
            labels: args.labels,
            milestone: args.milestone,
            search: args.search,
            confidential: args.confidential,
            created_after: args.created_after,
            created_before: args.created_before,
            updated_after: args.updated_after,
            updated_before: args.updated_before,
            order_by: args.order_by,
            sort: args.sort,
        }
        .into_options()
    };

    let issues = paginate(opts, move |opts| async move { svc.list_issues(opts).await });
    let issues = take(issues, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list issues assigned to {}", username))?;
    ToolOutput::list(issues)
}

async fn list_group_issues(ctx: Arc<ToolContext>, args: ListGroupIssuesArgs) -> Result<ToolOutput> {
    let svc = ctx.client.issues.as_ref();
    let opts = ListIssuesOptions {
        author_username: non_empty(args.author_username),
        assignee_username: non_empty(args.assignee_username),
        ..IssueFilters {
            state: args.state,
            labels: args.labels,
            milestone: args.milestone,
            search: args.search,
            confidential: args.confidential,
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
    let issues = paginate_scoped(group.clone(), opts, move |group, opts| async move {
        svc.list_group_issues(&group, opts).await
    });
    let issues = take(issues, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list issues of group {}", group))?;
    ToolOutput::list(issues)
}

async fn list_project_issues(
    ctx: Arc<ToolContext>,
    args: ListProjectIssuesArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.issues.as_ref();
    let opts = ListIssuesOptions {
        author_username: non_empty(args.author_username),
        assignee_username: non_empty(args.assignee_username),
        ..IssueFilters {
            state: args.state,
            labels: args.labels,
            milestone: args.milestone,
            search: args.search,
            confidential: args.confidential,
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
    let issues = paginate_scoped(project.clone(), opts, move |project, opts| async move {
        svc.list_project_issues(&project, opts).await
    });
    let issues = take(issues, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list issues of project {}", project))?;
    ToolOutput::list(issues)
}

#[derive(Serialize)]
struct IssueWithDiscussions {
    issue: Issue,
    discussions: Vec<Discussion>,
}

fn confidential_refusal(project: &Id, iid: u64) -> ToolOutput {
    ToolOutput::refusal(format!(
        "issue {}#{} is confidential; set confidential=true to access it",
        project, iid
    ))
}

/// Fetch an issue with its discussions.
///
/// A confidential issue is refused unless the caller passed
/// `confidential=true`, the same opt-in `edit_issue` and the internal notes
/// in its discussions require.
async fn get_issue(ctx: Arc<ToolContext>, args: GetIssueArgs) -> Result<ToolOutput> {
    let project = &args.project_id;
    let iid = args.issue_iid;
    let manager = DiscussionManager::new(
        ctx.client.discussions.as_ref(),
        Noteable::Issue {
            project: project.clone(),
            iid,
        },
    )?;

    let (issue, discussions) = tokio::join!(
        async {
            ctx.client
                .issues
                .get_issue(project, iid)
                .await
                .with_context(|| format!("get issue {}#{}", project, iid))
        },
        manager.list(args.confidential),
    );

    let (issue, discussions) = match (issue, discussions) {
        (Ok(issue), Ok(discussions)) => (issue, discussions),
        (issue, discussions) => {
            let errors = [issue.err(), discussions.err()].into_iter().flatten().collect();
            return Err(Error::joined(errors)
                .context(format!("get issue {}#{} with discussions", project, iid)));
        }
    };

    if issue.confidential && !args.confidential {
        return Ok(confidential_refusal(project, iid));
    }

    ToolOutput::json(&IssueWithDiscussions { issue, discussions })
}

async fn list_merge_requests_related_to_issue(
    ctx: Arc<ToolContext>,
    args: ListRelatedMergeRequestsArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.issues.as_ref();
    let iid = args.issue_iid;

    let merge_requests = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_related_merge_requests(&project, iid, opts).await },
    );
    let merge_requests = take(merge_requests, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| {
            format!(
                "list merge requests related to issue {}#{}",
                args.project_id, iid
            )
        })?;
    ToolOutput::list(merge_requests)
}

async fn create_issue(ctx: Arc<ToolContext>, args: CreateIssueArgs) -> Result<ToolOutput> {
    let opts = CreateIssueOptions {
        title: args.title,
        description: non_empty(args.description),
        labels: parse_labels(args.labels),
        assignee_ids: parse_user_ids(&args.assignee_ids),
        milestone_id: args.milestone_id,
        due_date: non_empty(args.due_date),
        confidential: args.confidential.get(),
        issue_type: non_empty(args.issue_type),
    };

    let issue = ctx
        .client
        .issues
        .create_issue(&args.project_id, opts)
        .await
        .with_context(|| format!("create issue in {}", args.project_id))?;
    ToolOutput::json(&issue)
}

async fn edit_issue(ctx: Arc<ToolContext>, args: EditIssueArgs) -> Result<ToolOutput> {
    let svc = ctx.client.issues.as_ref();
    let project = &args.project_id;
    let iid = args.issue_iid;

    let current = svc
        .get_issue(project, iid)
        .await
        .with_context(|| format!("get issue {}#{}", project, iid))?;
    if current.confidential && !args.confidential.is_true() {
        return Ok(confidential_refusal(project, iid));
    }

    let opts = UpdateIssueOptions {
        title: non_empty(args.title),
        description: args.description,
        state_event: non_empty(args.state_event),
        add_labels: parse_labels(args.add_labels),
        remove_labels: parse_labels(args.remove_labels),
        assignee_ids: parse_user_ids(&args.assignee_ids),
        milestone_id: args.milestone_id,
        due_date: non_empty(args.due_date),
        // An explicit false never demotes a confidential issue
        confidential: args.confidential.is_true().then_some(true),
        discussion_locked: args.discussion_locked.get(),
    };

    let issue = svc
        .update_issue(project, iid, opts)
        .await
        .with_context(|| format!("update issue {}#{}", project, iid))?;
    ToolOutput::json(&issue)
}
