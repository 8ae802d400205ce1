//! Upstream service interface.
//!
//! Each GitLab resource family is a trait so tool handlers can run against
//! the real REST client or a mock. [`Client`] bundles one handle per family
//! and is shared read-only by every handler.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::paginate::{ListOptions, Page, Paginated};
use crate::scalar::Id;
use crate::types::{
    Approvals, Bridge, Commit, Dependency, Diff, Discussion, DraftNote, Epic, Event, Issue, Job,
    MergeRequest, Note, Pipeline, Reviewer, Snippet, Todo, TreeNode, User, UserStatus,
};

macro_rules! paginated {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Paginated for $ty {
                fn list_options(&self) -> &ListOptions {
                    &self.list
                }

                fn list_options_mut(&mut self) -> &mut ListOptions {
                    &mut self.list
                }
            }
        )*
    };
}

// =============================================================================
// Note-able resources
// =============================================================================

/// A resource that carries discussions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Noteable {
    Issue { project: Id, iid: u64 },
    MergeRequest { project: Id, iid: u64 },
    Epic { group: Id, epic_id: u64 },
    Snippet { project: Id, snippet_id: u64 },
    Commit { project: Id, sha: String },
}

impl Noteable {
    /// Resource kind as used in tool arguments.
    pub fn kind(&self) -> &'static str {
        match self {
            Noteable::Issue { .. } => "issue",
            Noteable::MergeRequest { .. } => "merge_request",
            Noteable::Epic { .. } => "epic",
            Noteable::Snippet { .. } => "snippet",
            Noteable::Commit { .. } => "commit",
        }
    }
}

impl fmt::Display for Noteable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Noteable::Issue { project, iid } => write!(f, "issue {}#{}", project, iid),
            Noteable::MergeRequest { project, iid } => {
                write!(f, "merge request {}!{}", project, iid)
            }
            Noteable::Epic { group, epic_id } => write!(f, "epic {}&{}", group, epic_id),
            Noteable::Snippet {
                project,
                snippet_id,
            } => write!(f, "snippet {}${}", project, snippet_id),
            Noteable::Commit { project, sha } => write!(f, "commit {}@{}", project, sha),
        }
    }
}

/// Line anchor of a diff discussion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Position {
    pub position_type: String,
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<u64>,
}

/// Body of a new discussion thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewDiscussion {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

// =============================================================================
// Issues
// =============================================================================

/// Filters for issue listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListIssuesOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip)]
    pub list: ListOptions,
}

/// Payload of a new issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateIssueOptions {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
}

/// Changes to an issue. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateIssueOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_labels: Option<String>,
    /// `Some(vec![])` unassigns everyone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_locked: Option<bool>,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait IssuesService: Send + Sync {
    /// Issues visible to the authenticated user across all projects.
    async fn list_issues(&self, opts: ListIssuesOptions) -> Result<Page<Issue>>;

    async fn list_group_issues(&self, group: &Id, opts: ListIssuesOptions) -> Result<Page<Issue>>;

    async fn list_project_issues(
        &self,
        project: &Id,
        opts: ListIssuesOptions,
    ) -> Result<Page<Issue>>;

    async fn get_issue(&self, project: &Id, iid: u64) -> Result<Issue>;

    async fn create_issue(&self, project: &Id, opts: CreateIssueOptions) -> Result<Issue>;

    async fn update_issue(&self, project: &Id, iid: u64, opts: UpdateIssueOptions)
        -> Result<Issue>;

    /// Merge requests that mention or close the issue.
    async fn list_related_merge_requests(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<MergeRequest>>;
}

// =============================================================================
// Merge requests
// =============================================================================

/// Filters for merge request listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListMergeRequestsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip)]
    pub list: ListOptions,
}

/// Changes to a merge request. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateMergeRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_labels: Option<String>,
    /// `Some(vec![])` unassigns everyone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
    /// `Some(vec![])` removes every reviewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squash: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_source_branch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_collaboration: Option<bool>,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait MergeRequestsService: Send + Sync {
    /// Merge requests across all projects.
    async fn list_merge_requests(
        &self,
        opts: ListMergeRequestsOptions,
    ) -> Result<Page<MergeRequest>>;

    async fn list_project_merge_requests(
        &self,
        project: &Id,
        opts: ListMergeRequestsOptions,
    ) -> Result<Page<MergeRequest>>;

    async fn list_group_merge_requests(
        &self,
        group: &Id,
        opts: ListMergeRequestsOptions,
    ) -> Result<Page<MergeRequest>>;

    async fn get_merge_request(&self, project: &Id, iid: u64) -> Result<MergeRequest>;

    async fn get_approvals(&self, project: &Id, iid: u64) -> Result<Approvals>;

    async fn list_commits(&self, project: &Id, iid: u64, opts: ListOptions)
        -> Result<Page<Commit>>;

    async fn list_diffs(&self, project: &Id, iid: u64, opts: ListOptions) -> Result<Page<Diff>>;

    async fn list_participants(&self, project: &Id, iid: u64, opts: ListOptions)
        -> Result<Page<User>>;

    async fn list_reviewers(&self, project: &Id, iid: u64, opts: ListOptions)
        -> Result<Page<Reviewer>>;

    /// Issues the merge request closes once merged.
    async fn list_closes_issues(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Issue>>;

    /// Merge requests that block this one.
    async fn list_dependencies(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Dependency>>;

    async fn update_merge_request(
        &self,
        project: &Id,
        iid: u64,
        opts: UpdateMergeRequestOptions,
    ) -> Result<MergeRequest>;
}

// =============================================================================
// Discussions
// =============================================================================

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait DiscussionsService: Send + Sync {
    async fn list_discussions(
        &self,
        target: &Noteable,
        opts: ListOptions,
    ) -> Result<Page<Discussion>>;

    async fn create_discussion(&self, target: &Noteable, new: NewDiscussion)
        -> Result<Discussion>;

    async fn add_note(&self, target: &Noteable, discussion_id: &str, body: &str) -> Result<Note>;

    async fn update_note(
        &self,
        target: &Noteable,
        discussion_id: &str,
        note_id: u64,
        body: &str,
    ) -> Result<Note>;

    async fn delete_note(&self, target: &Noteable, discussion_id: &str, note_id: u64)
        -> Result<()>;

    /// Merge request threads only.
    async fn resolve_discussion(
        &self,
        project: &Id,
        iid: u64,
        discussion_id: &str,
        resolved: bool,
    ) -> Result<Discussion>;
}

// =============================================================================
// Epics
// =============================================================================

/// Filters for group epic listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListEpicsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_ancestor_groups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_descendant_groups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip)]
    pub list: ListOptions,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait EpicsService: Send + Sync {
    async fn list_group_epics(&self, group: &Id, opts: ListEpicsOptions) -> Result<Page<Epic>>;

    async fn get_epic(&self, group: &Id, iid: u64) -> Result<Epic>;

    /// Direct child epics.
    async fn list_child_epics(&self, group: &Id, iid: u64, opts: ListOptions)
        -> Result<Page<Epic>>;

    async fn list_epic_issues(&self, group: &Id, iid: u64, opts: ListOptions)
        -> Result<Page<Issue>>;
}

// =============================================================================
// Snippets
// =============================================================================

/// Filters for the instance-wide snippet listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListSnippetsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<String>,
    #[serde(skip)]
    pub list: ListOptions,
}

/// Payload of a new snippet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateSnippetOptions {
    pub title: String,
    pub file_name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: String,
}

/// Changes to a snippet. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateSnippetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SnippetsService: Send + Sync {
    /// Snippets owned by the authenticated user.
    async fn list_snippets(&self, opts: ListOptions) -> Result<Page<Snippet>>;

    /// Every snippet the authenticated user can see.
    async fn list_all_snippets(&self, opts: ListSnippetsOptions) -> Result<Page<Snippet>>;

    async fn get_snippet(&self, id: u64) -> Result<Snippet>;

    async fn get_snippet_content(&self, id: u64) -> Result<String>;

    async fn create_snippet(&self, opts: CreateSnippetOptions) -> Result<Snippet>;

    async fn update_snippet(&self, id: u64, opts: UpdateSnippetOptions) -> Result<Snippet>;

    async fn delete_snippet(&self, id: u64) -> Result<()>;
}

// =============================================================================
// Jobs and pipelines
// =============================================================================

/// CI job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
}

impl BuildState {
    pub const ALL: [BuildState; 11] = [
        BuildState::Created,
        BuildState::WaitingForResource,
        BuildState::Preparing,
        BuildState::Pending,
        BuildState::Running,
        BuildState::Success,
        BuildState::Failed,
        BuildState::Canceled,
        BuildState::Skipped,
        BuildState::Manual,
        BuildState::Scheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Created => "created",
            BuildState::WaitingForResource => "waiting_for_resource",
            BuildState::Preparing => "preparing",
            BuildState::Pending => "pending",
            BuildState::Running => "running",
            BuildState::Success => "success",
            BuildState::Failed => "failed",
            BuildState::Canceled => "canceled",
            BuildState::Skipped => "skipped",
            BuildState::Manual => "manual",
            BuildState::Scheduled => "scheduled",
        }
    }

    /// Look up a state by its upstream name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for pipeline job listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListJobsOptions {
    /// Sent as repeated `scope[]` parameters; empty means every state
    #[serde(skip)]
    pub scope: Vec<BuildState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_retried: Option<bool>,
    #[serde(skip)]
    pub list: ListOptions,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait JobsService: Send + Sync {
    async fn list_pipeline_jobs(
        &self,
        project: &Id,
        pipeline_id: u64,
        opts: ListJobsOptions,
    ) -> Result<Page<Job>>;

    /// Trigger jobs of a pipeline.
    async fn list_pipeline_bridges(
        &self,
        project: &Id,
        pipeline_id: u64,
        opts: ListOptions,
    ) -> Result<Page<Bridge>>;

    async fn get_job(&self, project: &Id, job_id: u64) -> Result<Job>;

    /// One file out of the job's artifacts archive.
    async fn get_artifact_file(&self, project: &Id, job_id: u64, path: &str) -> Result<String>;

    async fn get_job_log(&self, project: &Id, job_id: u64) -> Result<String>;

    async fn retry_job(&self, project: &Id, job_id: u64) -> Result<Job>;

    /// Start a manual job.
    async fn play_job(&self, project: &Id, job_id: u64) -> Result<Job>;
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait PipelinesService: Send + Sync {
    async fn list_merge_request_pipelines(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Pipeline>>;
}

// =============================================================================
// Users
// =============================================================================

/// Filters for user lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListUsersOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip)]
    pub list: ListOptions,
}

/// New status of the authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetUserStatusOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_status_after: Option<String>,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait UsersService: Send + Sync {
    /// The user owning the access token.
    async fn current_user(&self) -> Result<User>;

    async fn get_user(&self, id: u64) -> Result<User>;

    async fn list_users(&self, opts: ListUsersOptions) -> Result<Page<User>>;

    /// Status of a user given by numeric ID or username.
    async fn get_user_status(&self, user: &Id) -> Result<UserStatus>;

    async fn set_user_status(&self, opts: SetUserStatusOptions) -> Result<UserStatus>;
}

// =============================================================================
// Todos
// =============================================================================

/// Filters for to-do listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListTodosOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(skip)]
    pub list: ListOptions,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait TodosService: Send + Sync {
    async fn list_todos(&self, opts: ListTodosOptions) -> Result<Page<Todo>>;

    async fn mark_todo_done(&self, id: u64) -> Result<Todo>;

    async fn mark_all_todos_done(&self) -> Result<()>;
}

// =============================================================================
// Events
// =============================================================================

/// Filters for contribution events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListEventsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    /// Events created before this date (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Events created after this date (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip)]
    pub list: ListOptions,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait EventsService: Send + Sync {
    async fn list_user_events(&self, user: &Id, opts: ListEventsOptions) -> Result<Page<Event>>;
}

// =============================================================================
// Repositories
// =============================================================================

/// Filters for repository tree listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListTreeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    #[serde(skip)]
    pub list: ListOptions,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait RepositoriesService: Send + Sync {
    async fn list_tree(&self, project: &Id, opts: ListTreeOptions) -> Result<Page<TreeNode>>;

    /// Raw content of a blob by SHA.
    async fn get_raw_blob(&self, project: &Id, sha: &str) -> Result<String>;

    /// Raw content of a file, at `git_ref` or the default branch.
    async fn get_raw_file(
        &self,
        project: &Id,
        file_path: &str,
        git_ref: Option<String>,
    ) -> Result<String>;
}

// =============================================================================
// Draft notes
// =============================================================================

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait DraftNotesService: Send + Sync {
    async fn list_draft_notes(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<DraftNote>>;
}

paginated!(
    ListIssuesOptions,
    ListMergeRequestsOptions,
    ListEpicsOptions,
    ListSnippetsOptions,
    ListJobsOptions,
    ListUsersOptions,
    ListTodosOptions,
    ListEventsOptions,
    ListTreeOptions,
);

// =============================================================================
// Client bundle
// =============================================================================

/// One handle per upstream resource family.
#[derive(Clone)]
pub struct Client {
    pub issues: Arc<dyn IssuesService>,
    pub merge_requests: Arc<dyn MergeRequestsService>,
    pub discussions: Arc<dyn DiscussionsService>,
    pub epics: Arc<dyn EpicsService>,
    pub snippets: Arc<dyn SnippetsService>,
    pub jobs: Arc<dyn JobsService>,
    pub pipelines: Arc<dyn PipelinesService>,
    pub users: Arc<dyn UsersService>,
    pub todos: Arc<dyn TodosService>,
    pub events: Arc<dyn EventsService>,
    pub repositories: Arc<dyn RepositoriesService>,
    pub draft_notes: Arc<dyn DraftNotesService>,
}

impl Client {
    /// Bundle a single value implementing every service.
    pub fn from_shared<S>(service: Arc<S>) -> Self
    where
        S: IssuesService
            + MergeRequestsService
            + DiscussionsService
            + EpicsService
            + SnippetsService
            + JobsService
            + PipelinesService
            + UsersService
            + TodosService
            + EventsService
            + RepositoriesService
            + DraftNotesService
            + 'static,
    {
        Self {
            issues: service.clone(),
            merge_requests: service.clone(),
            discussions: service.clone(),
            epics: service.clone(),
            snippets: service.clone(),
            jobs: service.clone(),
            pipelines: service.clone(),
            users: service.clone(),
            todos: service.clone(),
            events: service.clone(),
            repositories: service.clone(),
            draft_notes: service,
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noteable_display() {
        let target = Noteable::MergeRequest {
            project: Id::parse("g/p"),
            iid: 4,
        };
        assert_eq!(target.to_string(), "merge request g/p!4");
        assert_eq!(target.kind(), "merge_request");
    }

    #[test]
    fn test_build_state_names() {
        assert_eq!(
            BuildState::from_name("waiting_for_resource"),
            Some(BuildState::WaitingForResource)
        );
        assert_eq!(BuildState::from_name("cancelled"), None);
        for state in BuildState::ALL {
            assert_eq!(BuildState::from_name(state.as_str()), Some(state));
        }
    }

    #[test]
    fn test_update_options_distinguish_clear_from_unchanged() {
        let unchanged = serde_json::to_value(UpdateMergeRequestOptions::default()).unwrap();
        assert_eq!(unchanged, serde_json::json!({}));

        let cleared = serde_json::to_value(UpdateMergeRequestOptions {
            assignee_ids: Some(vec![]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cleared, serde_json::json!({"assignee_ids": []}));
    }

    #[test]
    fn test_list_options_not_part_of_filters() {
        let mut opts = ListTodosOptions {
            state: Some("done".into()),
            target_type: Some("Issue".into()),
            ..Default::default()
        };
        opts.list_options_mut().page = 3;

        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value, serde_json::json!({"state": "done", "type": "Issue"}));
        assert_eq!(opts.list_options().page, 3);
    }
}
