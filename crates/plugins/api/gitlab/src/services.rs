//! Service trait implementations over the GitLab REST API v4.

use async_trait::async_trait;
use glbridge_core::api::{
    CreateIssueOptions, CreateSnippetOptions, DiscussionsService, DraftNotesService, EpicsService,
    EventsService, IssuesService, JobsService, ListEpicsOptions, ListEventsOptions,
    ListIssuesOptions, ListJobsOptions, ListMergeRequestsOptions, ListSnippetsOptions,
    ListTodosOptions, ListTreeOptions, ListUsersOptions, MergeRequestsService, NewDiscussion,
    Noteable, PipelinesService, RepositoriesService, SetUserStatusOptions, SnippetsService,
    TodosService, UpdateIssueOptions, UpdateMergeRequestOptions, UpdateSnippetOptions,
    UsersService,
};
use glbridge_core::paginate::{ListOptions, Page};
use glbridge_core::types::{
    Approvals, Bridge, Commit, Dependency, Diff, Discussion, DraftNote, Epic, Event, Issue, Job,
    MergeRequest, Note, Pipeline, Reviewer, Snippet, Todo, TreeNode, User, UserStatus,
};
use glbridge_core::{Id, Result};
use serde::Serialize;

use crate::client::{encode_path_components, segment, GitLabClient};

#[derive(Serialize)]
struct NoteBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct ResolveBody {
    resolved: bool,
}

impl GitLabClient {
    /// Discussions endpoint of a note-able resource.
    fn discussions_url(&self, target: &Noteable) -> String {
        match target {
            Noteable::Issue { project, iid } => {
                self.project_url(project, &format!("/issues/{}/discussions", iid))
            }
            Noteable::MergeRequest { project, iid } => {
                self.project_url(project, &format!("/merge_requests/{}/discussions", iid))
            }
            Noteable::Epic { group, epic_id } => {
                self.group_url(group, &format!("/epics/{}/discussions", epic_id))
            }
            Noteable::Snippet {
                project,
                snippet_id,
            } => self.project_url(project, &format!("/snippets/{}/discussions", snippet_id)),
            Noteable::Commit { project, sha } => self.project_url(
                project,
                &format!("/repository/commits/{}/discussions", urlencoding::encode(sha)),
            ),
        }
    }

    fn merge_request_url(&self, project: &Id, iid: u64, endpoint: &str) -> String {
        self.project_url(project, &format!("/merge_requests/{}{}", iid, endpoint))
    }
}

// =============================================================================
// Issues
// =============================================================================

#[async_trait]
impl IssuesService for GitLabClient {
    async fn list_issues(&self, opts: ListIssuesOptions) -> Result<Page<Issue>> {
        let url = self.api_url("/issues");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn list_group_issues(&self, group: &Id, opts: ListIssuesOptions) -> Result<Page<Issue>> {
        let url = self.group_url(group, "/issues");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn list_project_issues(
        &self,
        project: &Id,
        opts: ListIssuesOptions,
    ) -> Result<Page<Issue>> {
        let url = self.project_url(project, "/issues");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn get_issue(&self, project: &Id, iid: u64) -> Result<Issue> {
        self.get(&self.project_url(project, &format!("/issues/{}", iid)))
            .await
    }

    async fn create_issue(&self, project: &Id, opts: CreateIssueOptions) -> Result<Issue> {
        self.post(&self.project_url(project, "/issues"), &opts).await
    }

    async fn update_issue(
        &self,
        project: &Id,
        iid: u64,
        opts: UpdateIssueOptions,
    ) -> Result<Issue> {
        self.put(&self.project_url(project, &format!("/issues/{}", iid)), &opts)
            .await
    }

    async fn list_related_merge_requests(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<MergeRequest>> {
        let url = self.project_url(project, &format!("/issues/{}/related_merge_requests", iid));
        self.get_page(&url, &opts, |r| r).await
    }
}

// =============================================================================
// Merge requests
// =============================================================================

#[async_trait]
impl MergeRequestsService for GitLabClient {
    async fn list_merge_requests(
        &self,
        opts: ListMergeRequestsOptions,
    ) -> Result<Page<MergeRequest>> {
        let url = self.api_url("/merge_requests");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn list_project_merge_requests(
        &self,
        project: &Id,
        opts: ListMergeRequestsOptions,
    ) -> Result<Page<MergeRequest>> {
        let url = self.project_url(project, "/merge_requests");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn list_group_merge_requests(
        &self,
        group: &Id,
        opts: ListMergeRequestsOptions,
    ) -> Result<Page<MergeRequest>> {
        let url = self.group_url(group, "/merge_requests");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn get_merge_request(&self, project: &Id, iid: u64) -> Result<MergeRequest> {
        self.get(&self.merge_request_url(project, iid, "")).await
    }

    async fn get_approvals(&self, project: &Id, iid: u64) -> Result<Approvals> {
        self.get(&self.merge_request_url(project, iid, "/approvals"))
            .await
    }

    async fn list_commits(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Commit>> {
        let url = self.merge_request_url(project, iid, "/commits");
        self.get_page(&url, &opts, |r| r).await
    }

    async fn list_diffs(&self, project: &Id, iid: u64, opts: ListOptions) -> Result<Page<Diff>> {
        let url = self.merge_request_url(project, iid, "/diffs");
        self.get_page(&url, &opts, |r| r).await
    }

    async fn list_participants(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<User>> {
        let url = self.merge_request_url(project, iid, "/participants");
        self.get_page(&url, &opts, |r| r).await
    }

    async fn list_reviewers(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Reviewer>> {
        let url = self.merge_request_url(project, iid, "/reviewers");
        self.get_page(&url, &opts, |r| r).await
    }

    async fn list_closes_issues(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Issue>> {
        let url = self.merge_request_url(project, iid, "/closes_issues");
        self.get_page(&url, &opts, |r| r).await
    }

    async fn list_dependencies(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Dependency>> {
        let url = self.merge_request_url(project, iid, "/blocks");
        self.get_page(&url, &opts, |r| r).await
    }

    async fn update_merge_request(
        &self,
        project: &Id,
        iid: u64,
        opts: UpdateMergeRequestOptions,
    ) -> Result<MergeRequest> {
        self.put(&self.merge_request_url(project, iid, ""), &opts)
            .await
    }
}

// =============================================================================
// Discussions
// =============================================================================

#[async_trait]
impl DiscussionsService for GitLabClient {
    async fn list_discussions(
        &self,
        target: &Noteable,
        opts: ListOptions,
    ) -> Result<Page<Discussion>> {
        let url = self.discussions_url(target);
        self.get_page(&url, &opts, |r| r).await
    }

    async fn create_discussion(
        &self,
        target: &Noteable,
        new: NewDiscussion,
    ) -> Result<Discussion> {
        self.post(&self.discussions_url(target), &new).await
    }

    async fn add_note(&self, target: &Noteable, discussion_id: &str, body: &str) -> Result<Note> {
        let url = format!(
            "{}/{}/notes",
            self.discussions_url(target),
            urlencoding::encode(discussion_id)
        );
        self.post(&url, &NoteBody { body }).await
    }

    async fn update_note(
        &self,
        target: &Noteable,
        discussion_id: &str,
        note_id: u64,
        body: &str,
    ) -> Result<Note> {
        let url = format!(
            "{}/{}/notes/{}",
            self.discussions_url(target),
            urlencoding::encode(discussion_id),
            note_id
        );
        self.put(&url, &NoteBody { body }).await
    }

    async fn delete_note(
        &self,
        target: &Noteable,
        discussion_id: &str,
        note_id: u64,
    ) -> Result<()> {
        let url = format!(
            "{}/{}/notes/{}",
            self.discussions_url(target),
            urlencoding::encode(discussion_id),
            note_id
        );
        self.delete(&url).await
    }

    async fn resolve_discussion(
        &self,
        project: &Id,
        iid: u64,
        discussion_id: &str,
        resolved: bool,
    ) -> Result<Discussion> {
        let url = self.merge_request_url(
            project,
            iid,
            &format!("/discussions/{}", urlencoding::encode(discussion_id)),
        );
        self.put(&url, &ResolveBody { resolved }).await
    }
}

// =============================================================================
// Epics
// =============================================================================

#[async_trait]
impl EpicsService for GitLabClient {
    async fn list_group_epics(&self, group: &Id, opts: ListEpicsOptions) -> Result<Page<Epic>> {
        let url = self.group_url(group, "/epics");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn get_epic(&self, group: &Id, iid: u64) -> Result<Epic> {
        self.get(&self.group_url(group, &format!("/epics/{}", iid)))
            .await
    }

    async fn list_child_epics(
        &self,
        group: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Epic>> {
        let url = self.group_url(group, &format!("/epics/{}/epics", iid));
        self.get_page(&url, &opts, |r| r).await
    }

    async fn list_epic_issues(
        &self,
        group: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Issue>> {
        let url = self.group_url(group, &format!("/epics/{}/issues", iid));
        self.get_page(&url, &opts, |r| r).await
    }
}

// =============================================================================
// Snippets
// =============================================================================

#[async_trait]
impl SnippetsService for GitLabClient {
    async fn list_snippets(&self, opts: ListOptions) -> Result<Page<Snippet>> {
        let url = self.api_url("/snippets");
        self.get_page(&url, &opts, |r| r).await
    }

    async fn list_all_snippets(&self, opts: ListSnippetsOptions) -> Result<Page<Snippet>> {
        let url = self.api_url("/snippets/all");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn get_snippet(&self, id: u64) -> Result<Snippet> {
        self.get(&self.api_url(&format!("/snippets/{}", id))).await
    }

    async fn get_snippet_content(&self, id: u64) -> Result<String> {
        self.get_text(&self.api_url(&format!("/snippets/{}/raw", id)))
            .await
    }

    async fn create_snippet(&self, opts: CreateSnippetOptions) -> Result<Snippet> {
        self.post(&self.api_url("/snippets"), &opts).await
    }

    async fn update_snippet(&self, id: u64, opts: UpdateSnippetOptions) -> Result<Snippet> {
        self.put(&self.api_url(&format!("/snippets/{}", id)), &opts)
            .await
    }

    async fn delete_snippet(&self, id: u64) -> Result<()> {
        self.delete(&self.api_url(&format!("/snippets/{}", id)))
            .await
    }
}

// =============================================================================
// Jobs and pipelines
// =============================================================================

#[async_trait]
impl JobsService for GitLabClient {
    async fn list_pipeline_jobs(
        &self,
        project: &Id,
        pipeline_id: u64,
        opts: ListJobsOptions,
    ) -> Result<Page<Job>> {
        let url = self.project_url(project, &format!("/pipelines/{}/jobs", pipeline_id));
        let scope: Vec<(&str, &str)> = opts.scope.iter().map(|s| ("scope[]", s.as_str())).collect();
        self.get_page(&url, &opts.list, |r| r.query(&opts).query(&scope))
            .await
    }

    async fn list_pipeline_bridges(
        &self,
        project: &Id,
        pipeline_id: u64,
        opts: ListOptions,
    ) -> Result<Page<Bridge>> {
        let url = self.project_url(project, &format!("/pipelines/{}/bridges", pipeline_id));
        self.get_page(&url, &opts, |r| r).await
    }

    async fn get_job(&self, project: &Id, job_id: u64) -> Result<Job> {
        self.get(&self.project_url(project, &format!("/jobs/{}", job_id)))
            .await
    }

    async fn get_artifact_file(&self, project: &Id, job_id: u64, path: &str) -> Result<String> {
        let url = self.project_url(
            project,
            &format!(
                "/jobs/{}/artifacts/{}",
                job_id,
                encode_path_components(path.trim_start_matches('/'))
            ),
        );
        self.get_text(&url).await
    }

    async fn get_job_log(&self, project: &Id, job_id: u64) -> Result<String> {
        self.get_text(&self.project_url(project, &format!("/jobs/{}/trace", job_id)))
            .await
    }

    async fn retry_job(&self, project: &Id, job_id: u64) -> Result<Job> {
        self.post_empty(&self.project_url(project, &format!("/jobs/{}/retry", job_id)))
            .await
    }

    async fn play_job(&self, project: &Id, job_id: u64) -> Result<Job> {
        self.post_empty(&self.project_url(project, &format!("/jobs/{}/play", job_id)))
            .await
    }
}

#[async_trait]
impl PipelinesService for GitLabClient {
    async fn list_merge_request_pipelines(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<Pipeline>> {
        let url = self.merge_request_url(project, iid, "/pipelines");
        self.get_page(&url, &opts, |r| r).await
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UsersService for GitLabClient {
    async fn current_user(&self) -> Result<User> {
        self.get(&self.api_url("/user")).await
    }

    async fn get_user(&self, id: u64) -> Result<User> {
        self.get(&self.api_url(&format!("/users/{}", id))).await
    }

    async fn list_users(&self, opts: ListUsersOptions) -> Result<Page<User>> {
        let url = self.api_url("/users");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn get_user_status(&self, user: &Id) -> Result<UserStatus> {
        self.get(&self.api_url(&format!("/users/{}/status", segment(user))))
            .await
    }

    async fn set_user_status(&self, opts: SetUserStatusOptions) -> Result<UserStatus> {
        self.put(&self.api_url("/user/status"), &opts).await
    }
}

// =============================================================================
// Todos and events
// =============================================================================

#[async_trait]
impl TodosService for GitLabClient {
    async fn list_todos(&self, opts: ListTodosOptions) -> Result<Page<Todo>> {
        let url = self.api_url("/todos");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn mark_todo_done(&self, id: u64) -> Result<Todo> {
        self.post_empty(&self.api_url(&format!("/todos/{}/mark_as_done", id)))
            .await
    }

    async fn mark_all_todos_done(&self) -> Result<()> {
        self.post_discard(&self.api_url("/todos/mark_as_done")).await
    }
}

#[async_trait]
impl EventsService for GitLabClient {
    async fn list_user_events(&self, user: &Id, opts: ListEventsOptions) -> Result<Page<Event>> {
        let url = self.api_url(&format!("/users/{}/events", segment(user)));
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }
}

// =============================================================================
// Repositories
// =============================================================================

#[async_trait]
impl RepositoriesService for GitLabClient {
    async fn list_tree(&self, project: &Id, opts: ListTreeOptions) -> Result<Page<TreeNode>> {
        let url = self.project_url(project, "/repository/tree");
        self.get_page(&url, &opts.list, |r| r.query(&opts)).await
    }

    async fn get_raw_blob(&self, project: &Id, sha: &str) -> Result<String> {
        let url = self.project_url(
            project,
            &format!("/repository/blobs/{}/raw", urlencoding::encode(sha)),
        );
        self.get_text(&url).await
    }

    async fn get_raw_file(
        &self,
        project: &Id,
        file_path: &str,
        git_ref: Option<String>,
    ) -> Result<String> {
        let url = self.project_url(
            project,
            &format!("/repository/files/{}/raw", urlencoding::encode(file_path)),
        );
        self.get_text_with(&url, |r| match &git_ref {
            Some(git_ref) => r.query(&[("ref", git_ref.as_str())]),
            None => r,
        })
        .await
    }
}

// =============================================================================
// Draft notes
// =============================================================================

#[async_trait]
impl DraftNotesService for GitLabClient {
    async fn list_draft_notes(
        &self,
        project: &Id,
        iid: u64,
        opts: ListOptions,
    ) -> Result<Page<DraftNote>> {
        let url = self.merge_request_url(project, iid, "/draft_notes");
        self.get_page(&url, &opts, |r| r).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discussions_url_per_resource() {
        let client = GitLabClient::with_base_url("https://gl.test", "t");
        let project = Id::parse("g/p");

        let cases = [
            (
                Noteable::Issue {
                    project: project.clone(),
                    iid: 3,
                },
                "https://gl.test/api/v4/projects/g%2Fp/issues/3/discussions",
            ),
            (
                Noteable::MergeRequest {
                    project: project.clone(),
                    iid: 4,
                },
                "https://gl.test/api/v4/projects/g%2Fp/merge_requests/4/discussions",
            ),
            (
                Noteable::Epic {
                    group: Id::Int(9),
                    epic_id: 5,
                },
                "https://gl.test/api/v4/groups/9/epics/5/discussions",
            ),
            (
                Noteable::Snippet {
                    project: project.clone(),
                    snippet_id: 6,
                },
                "https://gl.test/api/v4/projects/g%2Fp/snippets/6/discussions",
            ),
            (
                Noteable::Commit {
                    project,
                    sha: "abc123".into(),
                },
                "https://gl.test/api/v4/projects/g%2Fp/repository/commits/abc123/discussions",
            ),
        ];

        for (target, expected) in cases {
            assert_eq!(client.discussions_url(&target), expected);
        }
    }

    mod integration {
        use super::*;
        use glbridge_core::api::BuildState;
        use httpmock::prelude::*;

        fn create_test_client(server: &MockServer) -> GitLabClient {
            GitLabClient::with_base_url(server.base_url(), "test-token")
        }

        #[tokio::test]
        async fn test_list_project_issues_filters() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/projects/123/issues")
                    .query_param("state", "opened")
                    .query_param("confidential", "false")
                    .query_param("per_page", "100")
                    .header("PRIVATE-TOKEN", "test-token");
                then.status(200)
                    .header("X-Next-Page", "2")
                    .json_body(serde_json::json!([
                        {
                            "id": 1,
                            "iid": 42,
                            "project_id": 123,
                            "title": "Test Issue",
                            "state": "opened",
                            "labels": ["bug"],
                            "web_url": "https://gitlab.com/group/project/-/issues/42"
                        }
                    ]));
            });

            let client = create_test_client(&server);
            let page = client
                .list_project_issues(
                    &Id::Int(123),
                    ListIssuesOptions {
                        state: Some("opened".into()),
                        confidential: Some(false),
                        list: ListOptions::max_page(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            mock.assert();
            assert_eq!(page.next_page, 2);
            assert_eq!(page.items[0].iid, 42);
            assert_eq!(page.items[0].extra["labels"], serde_json::json!(["bug"]));
        }

        #[tokio::test]
        async fn test_update_merge_request_clears_assignees() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(PUT)
                    .path("/api/v4/projects/123/merge_requests/50")
                    .body_includes("\"assignee_ids\":[]");
                then.status(200).json_body(serde_json::json!({
                    "id": 1,
                    "iid": 50,
                    "title": "Test MR",
                    "state": "opened"
                }));
            });

            let client = create_test_client(&server);
            let mr = client
                .update_merge_request(
                    &Id::Int(123),
                    50,
                    UpdateMergeRequestOptions {
                        assignee_ids: Some(vec![]),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            mock.assert();
            assert_eq!(mr.iid, 50);
        }

        #[tokio::test]
        async fn test_create_position_discussion() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v4/projects/123/merge_requests/50/discussions")
                    .body_includes("\"position\"")
                    .body_includes("\"base_sha\":\"base_sha_val\"")
                    .body_includes("\"commit_id\":\"abc\"");
                then.status(201).json_body(serde_json::json!({
                    "id": "new-disc",
                    "individual_note": false,
                    "notes": [{"id": 400, "body": "Inline comment"}]
                }));
            });

            let client = create_test_client(&server);
            let discussion = client
                .create_discussion(
                    &Noteable::MergeRequest {
                        project: Id::Int(123),
                        iid: 50,
                    },
                    NewDiscussion {
                        body: "Inline comment".into(),
                        position: Some(glbridge_core::api::Position {
                            position_type: "text".into(),
                            base_sha: "base_sha_val".into(),
                            start_sha: "start".into(),
                            head_sha: "head".into(),
                            new_path: Some("src/lib.rs".into()),
                            new_line: Some(10),
                            ..Default::default()
                        }),
                        commit_id: Some("abc".into()),
                    },
                )
                .await
                .unwrap();

            mock.assert();
            assert_eq!(discussion.id, "new-disc");
            assert_eq!(discussion.notes[0].id, 400);
        }

        #[tokio::test]
        async fn test_add_note_to_epic_discussion() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v4/groups/9/epics/5/discussions/d1/notes")
                    .body_includes("\"body\":\"reply\"");
                then.status(201)
                    .json_body(serde_json::json!({"id": 77, "body": "reply"}));
            });

            let client = create_test_client(&server);
            let note = client
                .add_note(
                    &Noteable::Epic {
                        group: Id::Int(9),
                        epic_id: 5,
                    },
                    "d1",
                    "reply",
                )
                .await
                .unwrap();

            mock.assert();
            assert_eq!(note.id, 77);
        }

        #[tokio::test]
        async fn test_resolve_discussion() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(PUT)
                    .path("/api/v4/projects/1/merge_requests/2/discussions/abc")
                    .body_includes("\"resolved\":true");
                then.status(200)
                    .json_body(serde_json::json!({"id": "abc", "notes": []}));
            });

            let client = create_test_client(&server);
            client
                .resolve_discussion(&Id::Int(1), 2, "abc", true)
                .await
                .unwrap();

            mock.assert();
        }

        #[tokio::test]
        async fn test_delete_note() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(DELETE)
                    .path("/api/v4/projects/1/issues/2/discussions/abc/notes/3");
                then.status(204);
            });

            let client = create_test_client(&server);
            client
                .delete_note(
                    &Noteable::Issue {
                        project: Id::Int(1),
                        iid: 2,
                    },
                    "abc",
                    3,
                )
                .await
                .unwrap();

            mock.assert();
        }

        #[tokio::test]
        async fn test_list_pipeline_jobs_scope() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/projects/1/pipelines/8/jobs")
                    .query_param("scope[]", "failed")
                    .query_param("include_retried", "true");
                then.status(200).json_body(serde_json::json!([
                    {"id": 11, "name": "test", "status": "failed"}
                ]));
            });

            let client = create_test_client(&server);
            let page = client
                .list_pipeline_jobs(
                    &Id::Int(1),
                    8,
                    ListJobsOptions {
                        scope: vec![BuildState::Failed],
                        include_retried: Some(true),
                        list: ListOptions::max_page(),
                    },
                )
                .await
                .unwrap();

            mock.assert();
            assert_eq!(page.items[0].status, "failed");
            assert_eq!(page.next_page, 0);
        }

        #[tokio::test]
        async fn test_list_participants_reads_next_page() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/projects/7/merge_requests/3/participants")
                    .query_param("page", "2")
                    .query_param("per_page", "100");
                then.status(200)
                    .header("X-Next-Page", "3")
                    .json_body(serde_json::json!([
                        {"id": 5, "username": "alice"}
                    ]));
            });

            let client = create_test_client(&server);
            let page = client
                .list_participants(
                    &Id::Int(7),
                    3,
                    ListOptions {
                        page: 2,
                        per_page: 100,
                    },
                )
                .await
                .unwrap();

            mock.assert();
            assert_eq!(page.next_page, 3);
            assert_eq!(page.items[0].username, "alice");
        }

        #[tokio::test]
        async fn test_get_raw_file_with_ref() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path_includes("/raw")
                    .query_param("ref", "main");
                then.status(200).body("fn main() {}\n");
            });

            let client = create_test_client(&server);
            let text = client
                .get_raw_file(&Id::Int(1), "src/main.rs", Some("main".into()))
                .await
                .unwrap();

            mock.assert();
            assert_eq!(text, "fn main() {}\n");
        }

        #[tokio::test]
        async fn test_list_users_by_username() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/users")
                    .query_param("username", "alice");
                then.status(200).json_body(serde_json::json!([
                    {"id": 5, "username": "alice", "name": "Alice"}
                ]));
            });

            let client = create_test_client(&server);
            let page = client
                .list_users(ListUsersOptions {
                    username: Some("alice".into()),
                    ..Default::default()
                })
                .await
                .unwrap();

            mock.assert();
            assert_eq!(page.items[0].id, 5);
        }

        #[tokio::test]
        async fn test_mark_all_todos_done() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST).path("/api/v4/todos/mark_as_done");
                then.status(204);
            });

            let client = create_test_client(&server);
            client.mark_all_todos_done().await.unwrap();

            mock.assert();
        }

        #[tokio::test]
        async fn test_get_job_log() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/api/v4/projects/1/jobs/4/trace");
                then.status(200).body("Running with gitlab-runner\n");
            });

            let client = create_test_client(&server);
            let log = client.get_job_log(&Id::Int(1), 4).await.unwrap();

            assert!(log.starts_with("Running with"));
        }

        #[tokio::test]
        async fn test_unauthorized_error() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/api/v4/user");
                then.status(401).body("{\"message\":\"401 Unauthorized\"}");
            });

            let client = create_test_client(&server);
            let result = client.current_user().await;

            assert!(matches!(
                result.unwrap_err(),
                glbridge_core::Error::Unauthorized(_)
            ));
        }
    }
}
