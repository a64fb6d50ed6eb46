//! Command-line interface for gator.
//!
//! A single invocation runs one named command. Commands are looked up in a
//! [`Commands`] registry; handlers registered as [`Handler::LoggedIn`] are
//! given the current user and fail when nobody is logged in.

pub mod args;
pub mod duration;
pub mod handlers;

pub use args::Cli;
pub use duration::parse_duration;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::config::Config;
use crate::db::{Database, User, UserRepository};
use crate::{GatorError, Result};

/// Everything a handler may read or change.
pub struct State {
    /// Open database.
    pub db: Arc<Database>,
    /// Loaded configuration, including the current user.
    pub config: Config,
    /// Where the configuration is persisted.
    pub config_path: PathBuf,
}

impl State {
    /// Create a new state.
    pub fn new(db: Arc<Database>, config: Config, config_path: PathBuf) -> Self {
        Self {
            db,
            config,
            config_path,
        }
    }

    /// Set (or clear) the logged-in user and persist the choice.
    pub fn set_current_user(&mut self, name: Option<&str>) -> Result<()> {
        self.config.set_user(name, &self.config_path)
    }

    /// Resolve the logged-in user.
    pub async fn current_user(&self) -> Result<User> {
        let name = self.config.current_user_name.as_deref().ok_or_else(|| {
            GatorError::Command("not logged in; run `gator login <name>` first".to_string())
        })?;

        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| {
                GatorError::Command(format!("not logged in: user {name} no longer exists"))
            })
    }
}

/// A parsed command line: the command name and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// Create a new command.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The argument at `index`, or a usage error.
    pub fn arg(&self, index: usize, usage: &str) -> Result<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| GatorError::Command(format!("usage: gator {usage}")))
    }

    /// The argument at `index`, if present.
    pub fn optional_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Future returned by a command handler.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<()>>;

/// Handler that needs no login.
pub type PlainHandler = for<'a> fn(&'a mut State, &'a Command) -> HandlerFuture<'a>;

/// Handler that runs as the logged-in user.
pub type UserHandler = for<'a> fn(&'a mut State, &'a Command, User) -> HandlerFuture<'a>;

/// A registered command handler.
#[derive(Clone, Copy)]
pub enum Handler {
    Plain(PlainHandler),
    LoggedIn(UserHandler),
}

/// Registry mapping command names to handlers.
#[derive(Default)]
pub struct Commands {
    handlers: HashMap<&'static str, Handler>,
}

impl Commands {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&mut self, name: &'static str, handler: Handler) {
        self.handlers.insert(name, handler);
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run the handler registered for `cmd.name`.
    pub async fn run(&self, state: &mut State, cmd: &Command) -> Result<()> {
        let handler = self
            .handlers
            .get(cmd.name.as_str())
            .copied()
            .ok_or_else(|| GatorError::Command(format!("unknown command: {}", cmd.name)))?;

        debug!(command = %cmd.name, args = ?cmd.args, "Running command");

        match handler {
            Handler::Plain(f) => f(state, cmd).await,
            Handler::LoggedIn(f) => {
                let user = state.current_user().await?;
                f(state, cmd, user).await
            }
        }
    }
}

/// Registry with every built-in command.
pub fn default_commands() -> Commands {
    let mut commands = Commands::new();
    commands.register("register", Handler::Plain(handlers::register));
    commands.register("login", Handler::Plain(handlers::login));
    commands.register("reset", Handler::Plain(handlers::reset));
    commands.register("users", Handler::Plain(handlers::users));
    commands.register("feeds", Handler::Plain(handlers::feeds));
    commands.register("agg", Handler::Plain(handlers::agg));
    commands.register("addfeed", Handler::LoggedIn(handlers::add_feed));
    commands.register("follow", Handler::LoggedIn(handlers::follow));
    commands.register("following", Handler::LoggedIn(handlers::following));
    commands.register("unfollow", Handler::LoggedIn(handlers::unfollow));
    commands.register("browse", Handler::LoggedIn(handlers::browse));
    commands
}
