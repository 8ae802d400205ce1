//! To-do list tools.

use std::sync::Arc;

use glbridge_core::api::ListTodosOptions;
use glbridge_core::paginate::{paginate, ListOptions};
use glbridge_core::{Result, ResultExt};

use super::{take, TODO_LIMIT};
use crate::encode::ToolOutput;
use crate::parse::non_empty;
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "list_user_todos",
            "List the to-do items of the authenticated user.",
            ToolHints::READ_ONLY,
            list_user_todos,
        )
        .register(
            "complete_todo_item",
            "Mark a to-do item as done.",
            ToolHints::IDEMPOTENT,
            complete_todo_item,
        )
        .register(
            "complete_all_todo_items",
            "Mark every pending to-do item of the authenticated user as done.",
            ToolHints::IDEMPOTENT,
            complete_all_todo_items,
        );
}

tool_args! {
    pub struct ListUserTodosArgs {
        /// Action that created the to-do item
        action: Option<String> [one_of = [
            "assigned",
            "mentioned",
            "build_failed",
            "marked",
            "approval_required",
            "unmergeable",
            "directly_addressed",
            "merge_train_removed",
            "member_access_requested",
        ]],
        /// Only items caused by this user ID
        author_id: Option<u64>,
        /// Only items of this project ID
        project_id: Option<u64>,
        /// Only items of this group ID
        group_id: Option<u64>,
        /// To-do state
        state: Option<String> [one_of = ["pending", "done"]],
        /// Type of the target resource
        target_type: Option<String> [
            rename = "type",
            one_of = [
                "Issue",
                "MergeRequest",
                "Commit",
                "Epic",
                "DesignManagement::Design",
                "AlertManagement::Alert",
            ]
        ],
        /// Maximum number of items to return (default 100)
        limit: i64,
    }
}

tool_args! {
    pub struct TodoArgs {
        /// To-do item ID
        todo_id: u64 [required],
    }
}

tool_args! {
    pub struct NoArgs {}
}

async fn list_user_todos(ctx: Arc<ToolContext>, args: ListUserTodosArgs) -> Result<ToolOutput> {
    let svc = ctx.client.todos.as_ref();
    let opts = ListTodosOptions {
        action: non_empty(args.action),
        author_id: args.author_id,
        project_id: args.project_id,
        group_id: args.group_id,
        state: non_empty(args.state),
        target_type: non_empty(args.target_type),
        list: ListOptions::max_page(),
    };

    let todos = paginate(opts, move |opts| async move { svc.list_todos(opts).await });
    let todos = take(todos, args.limit, TODO_LIMIT)
        .await
        .context("list to-do items")?;
    ToolOutput::list(todos)
}

async fn complete_todo_item(ctx: Arc<ToolContext>, args: TodoArgs) -> Result<ToolOutput> {
    let todo = ctx
        .client
        .todos
        .mark_todo_done(args.todo_id)
        .await
        .with_context(|| format!("mark to-do item {} as done", args.todo_id))?;
    ToolOutput::json(&todo)
}

async fn complete_all_todo_items(ctx: Arc<ToolContext>, _args: NoArgs) -> Result<ToolOutput> {
    ctx.client
        .todos
        .mark_all_todos_done()
        .await
        .context("mark all to-do items as done")?;
    Ok(ToolOutput::text("Marked all to-do items as done"))
}
