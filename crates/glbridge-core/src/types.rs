//! GitLab entities as returned by the REST API v4.
//!
//! Each type names the fields the bridge reads and keeps every other field
//! in `extra`, so tool output carries the full upstream payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// User
// =============================================================================

/// GitLab user representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User status message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Issue
// =============================================================================

/// GitLab issue representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub iid: u64,
    #[serde(default)]
    pub project_id: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub confidential: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Merge Request
// =============================================================================

/// GitLab merge request representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: u64,
    pub iid: u64,
    #[serde(default)]
    pub project_id: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub diff_refs: Option<DiffRefs>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// SHA references for code positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffRefs {
    pub base_sha: String,
    pub head_sha: String,
    pub start_sha: String,
}

/// Single file diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub old_path: String,
    pub new_path: String,
    #[serde(default)]
    pub diff: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Commit summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Approval state of a merge request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Approvals {
    #[serde(default)]
    pub approved: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reviewer assignment on a merge request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    pub user: User,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Blocking relation between two merge requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: u64,
    #[serde(default)]
    pub blocking_merge_request: Option<MergeRequest>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pending review comment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftNote {
    pub id: u64,
    #[serde(default)]
    pub note: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Notes and Discussions
// =============================================================================

/// GitLab note (comment) representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    /// Visible to project members only
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// GitLab discussion (thread of notes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    #[serde(default)]
    pub individual_note: bool,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Epics
// =============================================================================

/// Group-level epic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: u64,
    pub iid: u64,
    #[serde(default)]
    pub group_id: u64,
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Snippets
// =============================================================================

/// Personal snippet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// CI
// =============================================================================

/// CI job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Trigger job that starts a downstream pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bridge {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub downstream_pipeline: Option<Pipeline>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// CI pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Todos and events
// =============================================================================

/// To-do item of the current user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    #[serde(default)]
    pub state: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contribution event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub action_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Repository
// =============================================================================

/// Entry of a repository tree listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(default)]
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = json!({
            "id": 1,
            "iid": 42,
            "project_id": 7,
            "title": "Crash on start",
            "state": "opened",
            "confidential": true,
            "labels": ["bug"],
            "web_url": "https://gitlab.com/g/p/-/issues/42"
        });

        let issue: Issue = serde_json::from_value(raw).unwrap();
        assert!(issue.confidential);
        assert_eq!(issue.extra["labels"], json!(["bug"]));

        let out = serde_json::to_value(&issue).unwrap();
        assert_eq!(out["web_url"], "https://gitlab.com/g/p/-/issues/42");
        assert_eq!(out["iid"], 42);
    }

    #[test]
    fn test_note_internal_defaults_false() {
        let note: Note = serde_json::from_value(json!({"id": 3, "body": "hi"})).unwrap();
        assert!(!note.internal);
        assert!(!note.system);
    }

    #[test]
    fn test_tree_node_type_rename() {
        let node: TreeNode = serde_json::from_value(json!({
            "id": "a1b2",
            "name": "src",
            "type": "tree",
            "path": "src",
            "mode": "040000"
        }))
        .unwrap();
        assert_eq!(node.kind, "tree");
        let out = serde_json::to_value(&node).unwrap();
        assert_eq!(out["type"], "tree");
    }
}
