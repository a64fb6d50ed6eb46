//! Test helpers for integration tests.
//!
//! Provides TestEnv for driving commands against an in-memory database and
//! FeedServer for serving RSS documents over local HTTP.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use axum::extract::{Path, State as AxumState};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;

use gator::cli::{default_commands, Command, Commands, State};
use gator::{Config, Database, Result, User, UserRepository};

/// A command environment with its own database and config file.
pub struct TestEnv {
    pub dir: TempDir,
    pub state: State,
    commands: Commands,
}

impl TestEnv {
    /// Create an environment with default configuration.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Create an environment with the given configuration.
    pub async fn with_config(config: Config) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let state = State::new(Arc::new(db), config, dir.path().join("gator.toml"));

        Self {
            dir,
            state,
            commands: default_commands(),
        }
    }

    /// Run a command as the CLI would.
    pub async fn run(&mut self, name: &str, args: &[&str]) -> Result<()> {
        let cmd = Command::new(name, args.iter().map(|a| a.to_string()).collect());
        self.commands.run(&mut self.state, &cmd).await
    }

    /// The open database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Path of the config file commands write to.
    pub fn config_path(&self) -> PathBuf {
        self.state.config_path.clone()
    }

    /// Look up a user by name.
    pub async fn user(&self, name: &str) -> User {
        UserRepository::new(self.db().pool())
            .get_by_name(name)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("user {name} should exist"))
    }
}

type Documents = Arc<RwLock<HashMap<String, (u16, String)>>>;

/// Local HTTP server serving RSS documents by name.
pub struct FeedServer {
    base: String,
    documents: Documents,
}

impl FeedServer {
    /// Start a server on an ephemeral port.
    pub async fn start() -> Self {
        let documents: Documents = Arc::new(RwLock::new(HashMap::new()));
        let app = Router::new()
            .route("/:name", get(serve_document))
            .with_state(documents.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind feed server");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            documents,
        }
    }

    /// URL of the document with the given name.
    pub fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }

    /// Serve `body` with status 200 under `name`.
    pub fn set_feed(&self, name: &str, body: String) {
        self.set_response(name, 200, body);
    }

    /// Serve `body` with the given status under `name`.
    pub fn set_response(&self, name: &str, status: u16, body: String) {
        self.documents
            .write()
            .unwrap()
            .insert(name.to_string(), (status, body));
    }
}

async fn serve_document(
    AxumState(documents): AxumState<Documents>,
    Path(name): Path<String>,
) -> Response {
    let entry = documents.read().unwrap().get(&name).cloned();
    match entry {
        Some((status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, [("content-type", "application/rss+xml")], body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// An item for [`rss_document`]: title, link and raw pubDate.
pub struct Item<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub pub_date: &'a str,
}

/// Build an RSS 2.0 document.
pub fn rss_document(title: &str, items: &[Item<'_>]) -> String {
    let mut body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n\
         <title>{title}</title>\n<link>https://example.com/</link>\n\
         <description>Test feed</description>\n"
    );
    for item in items {
        body.push_str("<item>\n");
        body.push_str(&format!("<title>{}</title>\n", item.title));
        body.push_str(&format!("<link>{}</link>\n", item.link));
        body.push_str(&format!("<description>About {}</description>\n", item.title));
        if !item.pub_date.is_empty() {
            body.push_str(&format!("<pubDate>{}</pubDate>\n", item.pub_date));
        }
        body.push_str("</item>\n");
    }
    body.push_str("</channel>\n</rss>\n");
    body
}
