//! Personal snippet tools.

use std::sync::Arc;

use glbridge_core::api::{CreateSnippetOptions, ListSnippetsOptions, UpdateSnippetOptions};
use glbridge_core::paginate::{paginate, ListOptions};
use glbridge_core::{Result, ResultExt};

use super::{take, DEFAULT_LIMIT};
use crate::encode::ToolOutput;
use crate::parse::non_empty;
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "list_user_snippets",
            "List the snippets of the authenticated user.",
            ToolHints::READ_ONLY,
            list_user_snippets,
        )
        .register(
            "list_all_snippets",
            "List every snippet the authenticated user can see.",
            ToolHints::READ_ONLY,
            list_all_snippets,
        )
        .register(
            "get_snippet",
            "Get the metadata of a snippet.",
            ToolHints::READ_ONLY,
            get_snippet,
        )
        .register(
            "get_snippet_content",
            "Get the raw content of a snippet.",
            ToolHints::READ_ONLY,
            get_snippet_content,
        )
        .register(
            "create_snippet",
            "Create a personal snippet.",
            ToolHints::MUTATING,
            create_snippet,
        )
        .register(
            "update_snippet",
            "Update a personal snippet.",
            ToolHints::IDEMPOTENT,
            update_snippet,
        )
        .register(
            "delete_snippet",
            "Delete a personal snippet.",
            ToolHints::DESTRUCTIVE,
            delete_snippet,
        );
}

tool_args! {
    pub struct ListUserSnippetsArgs {
        /// Maximum number of snippets to return
        limit: i64,
    }
}

tool_args! {
    pub struct ListAllSnippetsArgs {
        /// Only snippets created on or after this ISO 8601 time
        created_after: Option<String>,
        /// Only snippets created on or before this ISO 8601 time
        created_before: Option<String>,
        /// Maximum number of snippets to return
        limit: i64,
    }
}

tool_args! {
    pub struct SnippetArgs {
        /// Snippet ID
        snippet_id: u64 [required],
    }
}

tool_args! {
    pub struct CreateSnippetArgs {
        /// Snippet title
        title: String [required],
        /// Name of the snippet file
        file_name: String [required],
        /// File content
        content: String [required],
        /// Snippet description
        description: Option<String>,
        /// Visibility level
        visibility: Option<String> [one_of = ["private", "internal", "public"]],
    }
}

tool_args! {
    pub struct UpdateSnippetArgs {
        /// Snippet ID
        snippet_id: u64 [required],
        /// New title
        title: Option<String>,
        /// New file name
        file_name: Option<String>,
        /// New file content
        content: Option<String>,
        /// New description
        description: Option<String>,
        /// New visibility level
        visibility: Option<String> [one_of = ["private", "internal", "public"]],
    }
}

async fn list_user_snippets(ctx: Arc<ToolContext>, args: ListUserSnippetsArgs) -> Result<ToolOutput> {
    let svc = ctx.client.snippets.as_ref();
    let snippets = paginate(ListOptions::max_page(), move |opts| async move {
        svc.list_snippets(opts).await
    });
    let snippets = take(snippets, args.limit, DEFAULT_LIMIT)
        .await
        .context("list snippets of the current user")?;
    ToolOutput::list(snippets)
}

async fn list_all_snippets(ctx: Arc<ToolContext>, args: ListAllSnippetsArgs) -> Result<ToolOutput> {
    let svc = ctx.client.snippets.as_ref();
    let opts = ListSnippetsOptions {
        created_after: non_empty(args.created_after),
        created_before: non_empty(args.created_before),
        list: ListOptions::max_page(),
    };

    let snippets = paginate(opts, move |opts| async move { svc.list_all_snippets(opts).await });
    let snippets = take(snippets, args.limit, DEFAULT_LIMIT)
        .await
        .context("list all snippets")?;
    ToolOutput::list(snippets)
}

async fn get_snippet(ctx: Arc<ToolContext>, args: SnippetArgs) -> Result<ToolOutput> {
    let snippet = ctx
        .client
        .snippets
        .get_snippet(args.snippet_id)
        .await
        .with_context(|| format!("get snippet ${}", args.snippet_id))?;
    ToolOutput::json(&snippet)
}

async fn get_snippet_content(ctx: Arc<ToolContext>, args: SnippetArgs) -> Result<ToolOutput> {
    let content = ctx
        .client
        .snippets
        .get_snippet_content(args.snippet_id)
        .await
        .with_context(|| format!("get content of snippet ${}", args.snippet_id))?;
    Ok(ToolOutput::text(content))
}

async fn create_snippet(ctx: Arc<ToolContext>, args: CreateSnippetArgs) -> Result<ToolOutput> {
    let opts = CreateSnippetOptions {
        title: args.title,
        file_name: args.file_name,
        content: args.content,
        description: non_empty(args.description),
        visibility: non_empty(args.visibility).unwrap_or_else(|| "private".to_string()),
    };

    let title = opts.title.clone();
    let snippet = ctx
        .client
        .snippets
        .create_snippet(opts)
        .await
        .with_context(|| format!("create snippet {:?}", title))?;
    ToolOutput::json(&snippet)
}

async fn update_snippet(ctx: Arc<ToolContext>, args: UpdateSnippetArgs) -> Result<ToolOutput> {
    let opts = UpdateSnippetOptions {
        title: non_empty(args.title),
        file_name: non_empty(args.file_name),
        content: args.content,
        description: args.description,
        visibility: non_empty(args.visibility),
    };

    let snippet = ctx
        .client
        .snippets
        .update_snippet(args.snippet_id, opts)
        .await
        .with_context(|| format!("update snippet ${}", args.snippet_id))?;
    ToolOutput::json(&snippet)
}

async fn delete_snippet(ctx: Arc<ToolContext>, args: SnippetArgs) -> Result<ToolOutput> {
    ctx.client
        .snippets
        .delete_snippet(args.snippet_id)
        .await
        .with_context(|| format!("delete snippet ${}", args.snippet_id))?;
    Ok(ToolOutput::text(format!("Deleted snippet {}", args.snippet_id)))
}
