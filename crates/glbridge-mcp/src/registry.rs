//! Tool registry: names, schemas and type-erased handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use glbridge_core::types::User;
use glbridge_core::{Client, Error, Result};

use crate::encode::ToolOutput;
use crate::protocol::{ToolAnnotations, ToolCallResult, ToolDefinition};
use crate::reflect::{argument_map, build_schema, ToolArgs};

/// State shared by every tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub client: Client,
    /// Identity the token belongs to, resolved once at startup
    pub current_user: User,
}

impl ToolContext {
    pub fn new(client: Client, current_user: User) -> Self {
        Self {
            client,
            current_user,
        }
    }
}

/// Behaviour hints advertised with a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolHints {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
}

impl ToolHints {
    pub const READ_ONLY: Self = Self {
        read_only: true,
        destructive: false,
        idempotent: true,
    };

    /// Creates something new; repeating the call creates it again.
    pub const MUTATING: Self = Self {
        read_only: false,
        destructive: false,
        idempotent: false,
    };

    /// Sets state to a given value; repeating the call changes nothing.
    pub const IDEMPOTENT: Self = Self {
        read_only: false,
        destructive: false,
        idempotent: true,
    };

    pub const DESTRUCTIVE: Self = Self {
        read_only: false,
        destructive: true,
        idempotent: true,
    };

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations {
            read_only_hint: self.read_only,
            destructive_hint: self.destructive,
            idempotent_hint: self.idempotent,
        }
    }
}

type Handler =
    Arc<dyn Fn(Arc<ToolContext>, Map<String, Value>) -> BoxFuture<'static, Result<ToolOutput>> + Send + Sync>;

struct Tool {
    description: &'static str,
    hints: ToolHints,
    schema: fn() -> Result<Value>,
    handler: Handler,
}

/// Registered tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler taking a decoded argument struct.
    ///
    /// Registering a name twice replaces the earlier tool.
    pub fn register<A, F, Fut>(
        &mut self,
        name: &'static str,
        description: &'static str,
        hints: ToolHints,
        handler: F,
    ) -> &mut Self
    where
        A: ToolArgs + Send + 'static,
        F: Fn(Arc<ToolContext>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: Handler = Arc::new(move |ctx, raw| {
            let handler = handler.clone();
            async move {
                let args = A::decode(&raw)?;
                handler(ctx, args).await
            }
            .boxed()
        });

        self.tools.insert(
            name,
            Tool {
                description,
                hints,
                schema: || build_schema(A::descriptor()),
                handler: erased,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.keys().copied()
    }

    /// Tool definitions for `tools/list`, sorted by name.
    ///
    /// Fails with every descriptor problem of every tool.
    pub fn definitions(&self) -> Result<Vec<ToolDefinition>> {
        let mut definitions = Vec::with_capacity(self.tools.len());
        let mut problems = Vec::new();

        for (name, tool) in &self.tools {
            match (tool.schema)() {
                Ok(input_schema) => definitions.push(ToolDefinition {
                    name: name.to_string(),
                    description: tool.description.to_string(),
                    input_schema,
                    annotations: Some(tool.hints.annotations()),
                }),
                Err(Error::Descriptor(errors)) => {
                    problems.extend(errors.into_iter().map(|e| format!("{}: {}", name, e)))
                }
                Err(e) => problems.push(format!("{}: {}", name, e)),
            }
        }

        if !problems.is_empty() {
            return Err(Error::Descriptor(problems));
        }
        Ok(definitions)
    }

    /// Decode the arguments and run the named tool.
    pub async fn call(
        &self,
        name: &str,
        ctx: Arc<ToolContext>,
        arguments: Option<Value>,
    ) -> Result<ToolCallResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown tool: {}", name)))?;

        let raw = argument_map(arguments)?;
        tracing::debug!(tool = name, "Calling tool");

        let output = (tool.handler)(ctx, raw).await?;
        if output.is_refusal() {
            tracing::info!(tool = name, "Tool refused the call");
        }
        Ok(output.into_result())
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use glbridge_core::api::{
        MockDiscussionsService, MockDraftNotesService, MockEpicsService, MockEventsService,
        MockIssuesService, MockJobsService, MockMergeRequestsService, MockPipelinesService,
        MockRepositoriesService, MockSnippetsService, MockTodosService, MockUsersService,
    };

    /// One mock per upstream service; set expectations, then build a context.
    #[derive(Default)]
    pub struct Mocks {
        pub issues: MockIssuesService,
        pub merge_requests: MockMergeRequestsService,
        pub discussions: MockDiscussionsService,
        pub epics: MockEpicsService,
        pub snippets: MockSnippetsService,
        pub jobs: MockJobsService,
        pub pipelines: MockPipelinesService,
        pub users: MockUsersService,
        pub todos: MockTodosService,
        pub events: MockEventsService,
        pub repositories: MockRepositoriesService,
        pub draft_notes: MockDraftNotesService,
    }

    impl Mocks {
        pub fn context(self) -> Arc<ToolContext> {
            let client = Client {
                issues: Arc::new(self.issues),
                merge_requests: Arc::new(self.merge_requests),
                discussions: Arc::new(self.discussions),
                epics: Arc::new(self.epics),
                snippets: Arc::new(self.snippets),
                jobs: Arc::new(self.jobs),
                pipelines: Arc::new(self.pipelines),
                users: Arc::new(self.users),
                todos: Arc::new(self.todos),
                events: Arc::new(self.events),
                repositories: Arc::new(self.repositories),
                draft_notes: Arc::new(self.draft_notes),
            };
            let current_user = User {
                id: 1,
                username: "current".to_string(),
                ..Default::default()
            };
            Arc::new(ToolContext::new(client, current_user))
        }

        /// Run a catalogue tool against these mocks.
        pub async fn call(self, name: &str, args: Value) -> Result<ToolCallResult> {
            crate::tools::catalogue()
                .call(name, self.context(), Some(args))
                .await
        }
    }

    /// Parse the JSON text of a successful result.
    pub fn json_output(result: &ToolCallResult) -> Value {
        assert_eq!(result.is_error, None, "unexpected error result: {:?}", result);
        serde_json::from_str(result.first_text().unwrap_or_default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Mocks;
    use super::*;
    use crate::tool_args;
    use serde_json::json;

    tool_args! {
        struct EchoArgs {
            /// Text to echo back
            text: String [required],
        }
    }

    tool_args! {
        struct UndocumentedArgs {
            text: String,
        }
    }

    async fn echo(_ctx: Arc<ToolContext>, args: EchoArgs) -> Result<ToolOutput> {
        if args.text == "no" {
            return Ok(ToolOutput::refusal("refused"));
        }
        Ok(ToolOutput::text(args.text))
    }

    async fn undocumented(_ctx: Arc<ToolContext>, _args: UndocumentedArgs) -> Result<ToolOutput> {
        Ok(ToolOutput::text(""))
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register("echo", "Echo text", ToolHints::READ_ONLY, echo);
        registry
    }

    #[test]
    fn test_definitions() {
        let definitions = registry().definitions().unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "echo");
        assert_eq!(definitions[0].input_schema["required"], json!(["text"]));
        assert_eq!(
            definitions[0].annotations,
            Some(ToolAnnotations {
                read_only_hint: true,
                destructive_hint: false,
                idempotent_hint: true,
            })
        );
    }

    #[test]
    fn test_definitions_report_every_problem() {
        let mut registry = registry();
        registry.register("bad", "Bad tool", ToolHints::MUTATING, undocumented);

        let err = registry.definitions().unwrap_err();
        assert!(matches!(err, Error::Descriptor(ref problems) if problems.len() == 1));
        assert!(err.to_string().contains("bad: UndocumentedArgs.text"));
    }

    #[tokio::test]
    async fn test_call_decodes_and_runs() {
        let ctx = Mocks::default().context();
        let result = registry()
            .call("echo", ctx, Some(json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(result, ToolCallResult::text("hi".into()));
    }

    #[tokio::test]
    async fn test_refusal_is_error_result() {
        let ctx = Mocks::default().context();
        let result = registry()
            .call("echo", ctx, Some(json!({"text": "no"})))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_call_errors() {
        let registry = registry();

        let missing = registry
            .call("echo", Mocks::default().context(), None)
            .await
            .unwrap_err();
        assert!(matches!(missing, Error::MissingRequired(_)));

        let unknown = registry
            .call("nope", Mocks::default().context(), None)
            .await
            .unwrap_err();
        assert!(unknown.is_invalid_params());

        let not_object = registry
            .call("echo", Mocks::default().context(), Some(json!("hi")))
            .await
            .unwrap_err();
        assert!(matches!(not_object, Error::InvalidType(_)));
    }
}
