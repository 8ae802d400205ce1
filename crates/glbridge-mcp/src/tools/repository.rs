//! Repository browsing tools.

use std::sync::Arc;

use glbridge_core::api::ListTreeOptions;
use glbridge_core::paginate::{paginate_scoped, ListOptions};
use glbridge_core::{Id, OptionalBool, Result, ResultExt};

use super::{take, DEFAULT_LIMIT};
use crate::encode::ToolOutput;
use crate::parse::non_empty;
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "list_repository_directory",
            "List the files and directories of a repository path.",
            ToolHints::READ_ONLY,
            list_repository_directory,
        )
        .register(
            "get_repository_file_contents",
            "Get the raw content of a repository file, either by blob SHA or by path.",
            ToolHints::READ_ONLY,
            get_repository_file_contents,
        );
}

tool_args! {
    pub struct ListRepositoryDirectoryArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Directory inside the repository; the root when empty
        path: Option<String>,
        /// Branch, tag or commit; the default branch when empty
        git_ref: Option<String> [rename = "ref"],
        /// Walk subdirectories too
        recursive: OptionalBool,
        /// Maximum number of entries to return
        limit: i64,
    }
}

tool_args! {
    pub struct GetRepositoryFileContentsArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Blob SHA; set either this or file_path
        sha: Option<String>,
        /// File path; set either this or sha
        file_path: Option<String>,
        /// Branch, tag or commit for file_path; the default branch when empty
        git_ref: Option<String> [rename = "ref"],
    }
}

async fn list_repository_directory(
    ctx: Arc<ToolContext>,
    args: ListRepositoryDirectoryArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.repositories.as_ref();
    let opts = ListTreeOptions {
        path: non_empty(args.path),
        git_ref: non_empty(args.git_ref),
        recursive: args.recursive.get(),
        list: ListOptions::max_page(),
    };

    let project = args.project_id;
    let nodes = paginate_scoped(project.clone(), opts, move |project, opts| async move {
        svc.list_tree(&project, opts).await
    });
    let nodes = take(nodes, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list repository tree of {}", project))?;
    ToolOutput::list(nodes)
}

async fn get_repository_file_contents(
    ctx: Arc<ToolContext>,
    args: GetRepositoryFileContentsArgs,
) -> Result<ToolOutput> {
    let svc = ctx.client.repositories.as_ref();
    let project = &args.project_id;

    let content = match (non_empty(args.sha), non_empty(args.file_path)) {
        (Some(sha), None) => svc
            .get_raw_blob(project, &sha)
            .await
            .with_context(|| format!("get blob {} of {}", sha, project))?,
        (None, Some(path)) => svc
            .get_raw_file(project, &path, non_empty(args.git_ref))
            .await
            .with_context(|| format!("get file {} of {}", path, project))?,
        _ => {
            return Ok(ToolOutput::refusal(
                "exactly one of sha and file_path must be set",
            ))
        }
    };
    Ok(ToolOutput::text(content))
}

#[cfg(test)]
mod tests {
    use crate::registry::testing::{json_output, Mocks};
    use glbridge_core::types::TreeNode;
    use glbridge_core::{Id, Page};
    use serde_json::json;

    #[tokio::test]
    async fn test_file_contents_needs_exactly_one_selector() {
        for args in [
            json!({"project_id": "g/p"}),
            json!({"project_id": "g/p", "sha": "abc", "file_path": "README.md"}),
        ] {
            let mut mocks = Mocks::default();
            mocks.repositories.expect_get_raw_blob().never();
            mocks.repositories.expect_get_raw_file().never();

            let result = mocks
                .call("get_repository_file_contents", args)
                .await
                .unwrap();
            assert_eq!(result.is_error, Some(true));
            let message = result.first_text().unwrap();
            assert!(message.contains("sha") && message.contains("file_path"));
        }
    }

    #[tokio::test]
    async fn test_file_contents_by_path_and_ref() {
        let mut mocks = Mocks::default();
        mocks
            .repositories
            .expect_get_raw_file()
            .withf(|project, path, git_ref| {
                *project == Id::parse("g/p")
                    && path == "src/main.rs"
                    && git_ref.as_deref() == Some("v1.0")
            })
            .times(1)
            .returning(|_, _, _| Ok("fn main() {}\n".into()));

        let result = mocks
            .call(
                "get_repository_file_contents",
                json!({"project_id": "g/p", "file_path": "src/main.rs", "ref": "v1.0"}),
            )
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("fn main() {}\n"));
    }

    #[tokio::test]
    async fn test_file_contents_by_sha() {
        let mut mocks = Mocks::default();
        mocks
            .repositories
            .expect_get_raw_blob()
            .withf(|_, sha| sha == "abc123")
            .times(1)
            .returning(|_, _| Ok("blob".into()));

        let result = mocks
            .call(
                "get_repository_file_contents",
                json!({"project_id": "g/p", "sha": "abc123"}),
            )
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("blob"));
    }

    #[tokio::test]
    async fn test_list_directory_options() {
        let mut mocks = Mocks::default();
        mocks
            .repositories
            .expect_list_tree()
            .withf(|_, opts| {
                opts.path.as_deref() == Some("src")
                    && opts.git_ref.as_deref() == Some("main")
                    && opts.recursive == Some(true)
            })
            .times(1)
            .returning(|_, _| {
                Ok(Page::last(vec![TreeNode {
                    name: "lib.rs".into(),
                    kind: "blob".into(),
                    path: "src/lib.rs".into(),
                    ..Default::default()
                }]))
            });

        let result = mocks
            .call(
                "list_repository_directory",
                json!({"project_id": "g/p", "path": "src", "ref": "main", "recursive": true}),
            )
            .await
            .unwrap();
        assert_eq!(json_output(&result)[0]["path"], "src/lib.rs");
    }
}
