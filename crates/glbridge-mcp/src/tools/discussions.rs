//! Discussion tools, routed through [`DiscussionManager`].

use std::sync::Arc;

use glbridge_core::api::Position;
use glbridge_core::{Error, Id, Result};

use crate::discussions::DiscussionManager;
use crate::encode::ToolOutput;
use crate::parse::non_empty;
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "discussion_list",
            "List the discussions of an issue, merge request, epic, snippet or commit. Internal notes are excluded unless confidential is true.",
            ToolHints::READ_ONLY,
            discussion_list,
        )
        .register(
            "discussion_new",
            "Start a new discussion thread on an issue, merge request, epic, snippet or commit.",
            ToolHints::MUTATING,
            discussion_new,
        )
        .register(
            "discussion_add_note",
            "Reply to an existing discussion thread.",
            ToolHints::MUTATING,
            discussion_add_note,
        )
        .register(
            "discussion_modify_note",
            "Replace the body of a note in a discussion thread.",
            ToolHints::IDEMPOTENT,
            discussion_modify_note,
        )
        .register(
            "discussion_delete_note",
            "Delete a note from a discussion thread.",
            ToolHints::DESTRUCTIVE,
            discussion_delete_note,
        )
        .register(
            "discussion_resolve",
            "Resolve or unresolve a merge request discussion thread.",
            ToolHints::IDEMPOTENT,
            discussion_resolve,
        )
        .register(
            "discussion_new_with_position",
            "Start a discussion anchored to a line of a merge request or commit diff.",
            ToolHints::MUTATING,
            discussion_new_with_position,
        );
}

tool_args! {
    pub struct DiscussionListArgs {
        /// Kind of resource the discussions belong to
        resource_type: String [required, one_of = ["issue", "merge_request", "epic", "snippet", "commit"]],
        /// Project ID or path (group ID or path for epics)
        parent_id: Id [required],
        /// Issue/merge request/epic IID, snippet ID or commit SHA
        resource_id: String [required],
        /// Include internal notes
        confidential: bool,
    }
}

tool_args! {
    pub struct DiscussionNewArgs {
        /// Kind of resource to discuss
        resource_type: String [required, one_of = ["issue", "merge_request", "epic", "snippet", "commit"]],
        /// Project ID or path (group ID or path for epics)
        parent_id: Id [required],
        /// Issue/merge request/epic IID, snippet ID or commit SHA
        resource_id: String [required],
        /// Markdown body of the first note
        body: String [required],
    }
}

tool_args! {
    pub struct DiscussionAddNoteArgs {
        /// Kind of resource the discussion belongs to
        resource_type: String [required, one_of = ["issue", "merge_request", "epic", "snippet", "commit"]],
        /// Project ID or path (group ID or path for epics)
        parent_id: Id [required],
        /// Issue/merge request/epic IID, snippet ID or commit SHA
        resource_id: String [required],
        /// Discussion ID
        discussion_id: String [required],
        /// Markdown body of the reply
        body: String [required],
    }
}

tool_args! {
    pub struct DiscussionModifyNoteArgs {
        /// Kind of resource the discussion belongs to
        resource_type: String [required, one_of = ["issue", "merge_request", "epic", "snippet", "commit"]],
        /// Project ID or path (group ID or path for epics)
        parent_id: Id [required],
        /// Issue/merge request/epic IID, snippet ID or commit SHA
        resource_id: String [required],
        /// Discussion ID
        discussion_id: String [required],
        /// Note ID
        note_id: u64 [required],
        /// New markdown body
        body: String [required],
    }
}

tool_args! {
    pub struct DiscussionDeleteNoteArgs {
        /// Kind of resource the discussion belongs to
        resource_type: String [required, one_of = ["issue", "merge_request", "epic", "snippet", "commit"]],
        /// Project ID or path (group ID or path for epics)
        parent_id: Id [required],
        /// Issue/merge request/epic IID, snippet ID or commit SHA
        resource_id: String [required],
        /// Discussion ID
        discussion_id: String [required],
        /// Note ID
        note_id: u64 [required],
    }
}

tool_args! {
    pub struct DiscussionResolveArgs {
        /// Kind of resource; only merge_request discussions can be resolved
        resource_type: String [required, one_of = ["issue", "merge_request", "epic", "snippet", "commit"]],
        /// Project ID or path
        parent_id: Id [required],
        /// Merge request IID
        resource_id: String [required],
        /// Discussion ID
        discussion_id: String [required],
        /// true to resolve, false to reopen
        resolved: bool,
    }
}

tool_args! {
    pub struct DiscussionNewWithPositionArgs {
        /// Kind of resource; merge_request or commit
        resource_type: String [required, one_of = ["issue", "merge_request", "epic", "snippet", "commit"]],
        /// Project ID or path
        parent_id: Id [required],
        /// Merge request IID or commit SHA
        resource_id: String [required],
        /// Markdown body of the first note
        body: String [required],
        /// Base commit SHA of the diff
        base_sha: String [required],
        /// Start commit SHA of the diff
        start_sha: String [required],
        /// Head commit SHA of the diff
        head_sha: String [required],
        /// File path after the change
        new_path: Option<String>,
        /// File path before the change
        old_path: Option<String>,
        /// Line number after the change, for added or unchanged lines
        new_line: Option<u64>,
        /// Line number before the change, for removed or unchanged lines
        old_line: Option<u64>,
        /// Position type, text by default
        position_type: Option<String>,
        /// SHA of the commit to comment on (merge requests only)
        commit_id: Option<String>,
    }
}

fn manager<'a>(
    ctx: &'a ToolContext,
    resource_type: &str,
    parent_id: Id,
    resource_id: &str,
) -> Result<DiscussionManager<'a>> {
    DiscussionManager::for_resource(
        ctx.client.discussions.as_ref(),
        resource_type,
        parent_id,
        resource_id,
    )
}

async fn discussion_list(ctx: Arc<ToolContext>, args: DiscussionListArgs) -> Result<ToolOutput> {
    let manager = manager(&ctx, &args.resource_type, args.parent_id, &args.resource_id)?;
    let discussions = manager.list(args.confidential).await?;
    ToolOutput::list(discussions)
}

async fn discussion_new(ctx: Arc<ToolContext>, args: DiscussionNewArgs) -> Result<ToolOutput> {
    let manager = manager(&ctx, &args.resource_type, args.parent_id, &args.resource_id)?;
    let discussion = manager.new_discussion(&args.body).await?;
    ToolOutput::json(&discussion)
}

async fn discussion_add_note(ctx: Arc<ToolContext>, args: DiscussionAddNoteArgs) -> Result<ToolOutput> {
    let manager = manager(&ctx, &args.resource_type, args.parent_id, &args.resource_id)?;
    let note = manager.add_note(&args.discussion_id, &args.body).await?;
    ToolOutput::json(&note)
}

async fn discussion_modify_note(
    ctx: Arc<ToolContext>,
    args: DiscussionModifyNoteArgs,
) -> Result<ToolOutput> {
    let manager = manager(&ctx, &args.resource_type, args.parent_id, &args.resource_id)?;
    let note = manager
        .modify_note(&args.discussion_id, args.note_id, &args.body)
        .await?;
    ToolOutput::json(&note)
}

async fn discussion_delete_note(
    ctx: Arc<ToolContext>,
    args: DiscussionDeleteNoteArgs,
) -> Result<ToolOutput> {
    let manager = manager(&ctx, &args.resource_type, args.parent_id, &args.resource_id)?;
    manager.delete_note(&args.discussion_id, args.note_id).await?;
    Ok(ToolOutput::text(format!(
        "Deleted note {} from discussion {}",
        args.note_id, args.discussion_id
    )))
}

async fn discussion_resolve(ctx: Arc<ToolContext>, args: DiscussionResolveArgs) -> Result<ToolOutput> {
    let manager = manager(&ctx, &args.resource_type, args.parent_id, &args.resource_id)?;
    let resolvable = manager.resolvable().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "{} discussions cannot be resolved",
            args.resource_type
        ))
    })?;
    let discussion = resolvable
        .resolve(&args.discussion_id, args.resolved)
        .await?;
    ToolOutput::json(&discussion)
}

async fn discussion_new_with_position(
    ctx: Arc<ToolContext>,
    args: DiscussionNewWithPositionArgs,
) -> Result<ToolOutput> {
    let manager = manager(&ctx, &args.resource_type, args.parent_id, &args.resource_id)?;
    let positioned = manager.positioned().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "{} discussions cannot be anchored to a diff position",
            args.resource_type
        ))
    })?;

    let position = Position {
        position_type: non_empty(args.position_type).unwrap_or_else(|| "text".to_string()),
        base_sha: args.base_sha,
        start_sha: args.start_sha,
        head_sha: args.head_sha,
        old_path: non_empty(args.old_path),
        new_path: non_empty(args.new_path),
        old_line: args.old_line,
        new_line: args.new_line,
    };

    let discussion = positioned
        .new_position_discussion(&args.body, position, non_empty(args.commit_id))
        .await?;
    ToolOutput::json(&discussion)
}

#[cfg(test)]
mod tests {
    use crate::registry::testing::{json_output, Mocks};
    use glbridge_core::types::{Discussion, Note};
    use glbridge_core::{Error, Id, Noteable, Page};
    use serde_json::json;

    fn note(id: u64, internal: bool) -> Note {
        Note {
            id,
            internal,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_hides_internal_only_discussion() {
        let mut mocks = Mocks::default();
        mocks
            .discussions
            .expect_list_discussions()
            .withf(|target, _| {
                *target
                    == Noteable::Issue {
                        project: Id::Int(42),
                        iid: 7,
                    }
            })
            .times(1)
            .returning(|_, _| {
                Ok(Page::last(vec![
                    Discussion {
                        id: "public".into(),
                        notes: vec![note(1, false)],
                        ..Default::default()
                    },
                    Discussion {
                        id: "hidden".into(),
                        notes: vec![note(2, true)],
                        ..Default::default()
                    },
                ]))
            });

        let result = mocks
            .call(
                "discussion_list",
                json!({
                    "resource_type": "issue",
                    "parent_id": "42",
                    "resource_id": "7",
                    "confidential": false
                }),
            )
            .await
            .unwrap();

        let output = json_output(&result);
        assert_eq!(output.as_array().unwrap().len(), 1);
        assert_eq!(output[0]["id"], "public");
    }

    #[tokio::test]
    async fn test_unknown_resource_type_rejected() {
        let err = Mocks::default()
            .call(
                "discussion_new",
                json!({
                    "resource_type": "wiki",
                    "parent_id": "1",
                    "resource_id": "1",
                    "body": "hi"
                }),
            )
            .await
            .unwrap_err();
        assert!(err.is_invalid_params());
    }

    #[tokio::test]
    async fn test_resolve_only_for_merge_requests() {
        let err = Mocks::default()
            .call(
                "discussion_resolve",
                json!({
                    "resource_type": "issue",
                    "parent_id": "1",
                    "resource_id": "3",
                    "discussion_id": "abc",
                    "resolved": true
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_resolve_merge_request_thread() {
        let mut mocks = Mocks::default();
        mocks
            .discussions
            .expect_resolve_discussion()
            .withf(|project, iid, id, resolved| {
                *project == Id::parse("g/p") && *iid == 3 && id == "abc" && *resolved
            })
            .times(1)
            .returning(|_, _, id, _| {
                Ok(Discussion {
                    id: id.to_string(),
                    ..Default::default()
                })
            });

        let result = mocks
            .call(
                "discussion_resolve",
                json!({
                    "resource_type": "merge_request",
                    "parent_id": "g/p",
                    "resource_id": "3",
                    "discussion_id": "abc",
                    "resolved": true
                }),
            )
            .await
            .unwrap();
        assert_eq!(json_output(&result)["id"], "abc");
    }

    #[tokio::test]
    async fn test_position_defaults_to_text() {
        let mut mocks = Mocks::default();
        mocks
            .discussions
            .expect_create_discussion()
            .withf(|_, new| {
                let position = new.position.as_ref().unwrap();
                position.position_type == "text"
                    && position.new_path.as_deref() == Some("src/lib.rs")
                    && position.new_line == Some(12)
                    && position.old_path.is_none()
                    && new.commit_id.as_deref() == Some("c0ffee")
            })
            .times(1)
            .returning(|_, _| Ok(Discussion::default()));

        mocks
            .call(
                "discussion_new_with_position",
                json!({
                    "resource_type": "merge_request",
                    "parent_id": "5",
                    "resource_id": "9",
                    "body": "typo",
                    "base_sha": "a",
                    "start_sha": "b",
                    "head_sha": "c",
                    "new_path": "src/lib.rs",
                    "new_line": 12,
                    "commit_id": "c0ffee"
                }),
            )
            .await
            .unwrap();
    }
}
