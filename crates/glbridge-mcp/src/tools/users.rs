//! User tools.

use std::sync::Arc;

use glbridge_core::api::{ListUsersOptions, SetUserStatusOptions, UsersService};
use glbridge_core::paginate::ListOptions;
use glbridge_core::types::User;
use glbridge_core::{Error, Id, Result, ResultExt};

use crate::encode::ToolOutput;
use crate::parse::non_empty;
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "get_user",
            "Get a user by ID or username. Defaults to the authenticated user.",
            ToolHints::READ_ONLY,
            get_user,
        )
        .register(
            "get_user_status",
            "Get the status of a user.",
            ToolHints::READ_ONLY,
            get_user_status,
        )
        .register(
            "set_user_status",
            "Set the status of the authenticated user.",
            ToolHints::IDEMPOTENT,
            set_user_status,
        );
}

tool_args! {
    pub struct GetUserArgs {
        /// Numeric user ID, username or @username; the authenticated user when empty
        user_id: String,
    }
}

tool_args! {
    pub struct GetUserStatusArgs {
        /// User ID or username
        user_id: Id [required],
    }
}

tool_args! {
    pub struct SetUserStatusArgs {
        /// Emoji name, e.g. "coffee"
        emoji: Option<String>,
        /// Status message
        message: Option<String>,
        /// Availability
        availability: Option<String> [one_of = ["not_set", "busy"]],
        /// When to clear the status, e.g. "30_minutes", "1_day", "7_days"
        clear_status_after: Option<String>,
    }
}

/// How a `user_id` argument names a user.
#[derive(Debug, PartialEq)]
enum UserRef<'a> {
    Id(u64),
    Username(&'a str),
}

impl<'a> UserRef<'a> {
    fn parse(input: &'a str) -> Self {
        if let Some(username) = input.strip_prefix('@') {
            return UserRef::Username(username);
        }
        match input.parse() {
            Ok(id) => UserRef::Id(id),
            Err(_) => UserRef::Username(input),
        }
    }
}

async fn find_by_username(svc: &dyn UsersService, username: &str) -> Result<User> {
    let opts = ListUsersOptions {
        username: Some(username.to_string()),
        list: ListOptions {
            page: 0,
            per_page: 1,
        },
        ..Default::default()
    };
    let page = svc.list_users(opts).await?;
    page.items
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(format!("no user with username {:?}", username)))
}

async fn get_user(ctx: Arc<ToolContext>, args: GetUserArgs) -> Result<ToolOutput> {
    let input = args.user_id.trim();
    if input.is_empty() {
        return ToolOutput::json(&ctx.current_user);
    }

    let svc = ctx.client.users.as_ref();
    let user = match UserRef::parse(input) {
        UserRef::Id(id) => svc.get_user(id).await,
        UserRef::Username(username) => find_by_username(svc, username).await,
    }
    .with_context(|| format!("get user {}", input))?;
    ToolOutput::json(&user)
}

async fn get_user_status(ctx: Arc<ToolContext>, args: GetUserStatusArgs) -> Result<ToolOutput> {
    let status = ctx
        .client
        .users
        .get_user_status(&args.user_id)
        .await
        .with_context(|| format!("get status of user {}", args.user_id))?;
    ToolOutput::json(&status)
}

async fn set_user_status(ctx: Arc<ToolContext>, args: SetUserStatusArgs) -> Result<ToolOutput> {
    let opts = SetUserStatusOptions {
        emoji: non_empty(args.emoji),
        message: args.message,
        availability: non_empty(args.availability),
        clear_status_after: non_empty(args.clear_status_after),
    };

    let status = ctx
        .client
        .users
        .set_user_status(opts)
        .await
        .context("set status of the current user")?;
    ToolOutput::json(&status)
}
