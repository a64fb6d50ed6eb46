//! Built-in command handlers.
//!
//! Each handler validates its arguments, performs the operation through the
//! repositories or services, and prints a short confirmation to stdout.

use std::sync::Arc;

use tracing::{info, warn};

use super::{parse_duration, Command, HandlerFuture, State};
use crate::datetime::format_utc_datetime;
use crate::db::{NewUser, User, UserRepository};
use crate::feed::{FeedService, FeedWithOwner, FollowedFeed, PostWithFeed};
use crate::scraper::{FeedFetcher, ScrapeOptions, Scraper};
use crate::{GatorError, Result};

/// Posts shown by `browse` when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: u32 = 2;

const POST_SEPARATOR: &str = "=====================================";

/// `register <name>`: create a user and log in as them.
pub fn register<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    Box::pin(async move {
        let name = cmd.arg(0, "register <name>")?;
        let user = UserRepository::new(state.db.pool())
            .create(&NewUser::new(name))
            .await?;
        state.set_current_user(Some(&user.name))?;

        info!(user = %user.name, id = %user.id, "User registered");
        println!("User {} created (id {})", user.name, user.id);
        println!("Logged in as {}", user.name);
        Ok(())
    })
}

/// `login <name>`: switch the current user.
pub fn login<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    Box::pin(async move {
        let name = cmd.arg(0, "login <name>")?;
        let user = UserRepository::new(state.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {name}")))?;
        state.set_current_user(Some(&user.name))?;

        println!("Logged in as {}", user.name);
        Ok(())
    })
}

/// `reset`: delete every user together with their feeds, follows and posts.
pub fn reset<'a>(state: &'a mut State, _cmd: &'a Command) -> HandlerFuture<'a> {
    Box::pin(async move {
        let removed = UserRepository::new(state.db.pool()).delete_all().await?;
        state.set_current_user(None)?;

        warn!(users = removed, "Database reset");
        println!("Reset successful: removed {removed} user(s)");
        Ok(())
    })
}

/// `users`: list users, marking the current one.
pub fn users<'a>(state: &'a mut State, _cmd: &'a Command) -> HandlerFuture<'a> {
    Box::pin(async move {
        let users = UserRepository::new(state.db.pool()).list().await?;
        let current = state.config.current_user_name.as_deref();
        for user in &users {
            println!("{}", format_user_line(user, current));
        }
        Ok(())
    })
}

/// `feeds`: list every feed with the user who added it.
pub fn feeds<'a>(state: &'a mut State, _cmd: &'a Command) -> HandlerFuture<'a> {
    Box::pin(async move {
        let feeds = FeedService::new(&state.db).list_feeds().await?;
        if feeds.is_empty() {
            println!("No feeds yet. Add one with `gator addfeed <name> <url>`.");
        }
        for feed in &feeds {
            println!("{}", format_feed_line(feed, &state.config.display.timezone));
        }
        Ok(())
    })
}

/// `agg <time_between_reqs>`: scrape feeds on an interval until Ctrl-C.
pub fn agg<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    Box::pin(async move {
        let raw = cmd.arg(0, "agg <time_between_reqs>")?;
        let every = parse_duration(raw)?;
        if every.is_zero() {
            return Err(GatorError::Validation(
                "time between requests must be greater than zero".to_string(),
            ));
        }

        let fetcher = FeedFetcher::new(&state.config.scraper)?;
        let scraper = Scraper::new(
            Arc::clone(&state.db),
            Arc::new(fetcher),
            ScrapeOptions::from(&state.config.scraper),
        );

        println!("Collecting feeds every {raw} (Ctrl-C to stop)");
        scraper.run_forever(every, shutdown_signal()).await?;
        println!("Stopped collecting feeds");
        Ok(())
    })
}

/// `addfeed <name> <url>`: register a feed and follow it.
pub fn add_feed<'a>(state: &'a mut State, cmd: &'a Command, user: User) -> HandlerFuture<'a> {
    Box::pin(async move {
        let name = cmd.arg(0, "addfeed <name> <url>")?;
        let url = cmd.arg(1, "addfeed <name> <url>")?;

        let (feed, _) = FeedService::new(&state.db)
            .add_feed(&user, name, url)
            .await?;

        println!("Feed {} added ({})", feed.name, feed.url);
        println!("{} now follows {}", user.name, feed.name);
        Ok(())
    })
}

/// `follow <url>`: follow an existing feed.
pub fn follow<'a>(state: &'a mut State, cmd: &'a Command, user: User) -> HandlerFuture<'a> {
    Box::pin(async move {
        let url = cmd.arg(0, "follow <url>")?;
        let (feed, _) = FeedService::new(&state.db).follow(&user, url).await?;

        println!("{} now follows {}", user.name, feed.name);
        Ok(())
    })
}

/// `following`: list the feeds the current user follows.
pub fn following<'a>(state: &'a mut State, _cmd: &'a Command, user: User) -> HandlerFuture<'a> {
    Box::pin(async move {
        let follows = FeedService::new(&state.db).following(&user).await?;
        if follows.is_empty() {
            println!("{} does not follow any feeds", user.name);
        }
        for follow in &follows {
            println!("{}", format_follow_line(follow));
        }
        Ok(())
    })
}

/// `unfollow <url>`: stop following a feed.
pub fn unfollow<'a>(state: &'a mut State, cmd: &'a Command, user: User) -> HandlerFuture<'a> {
    Box::pin(async move {
        let url = cmd.arg(0, "unfollow <url>")?;
        let feed = FeedService::new(&state.db).unfollow(&user, url).await?;

        println!("{} unfollowed {}", user.name, feed.name);
        Ok(())
    })
}

/// `browse [limit]`: show the newest posts from followed feeds.
pub fn browse<'a>(state: &'a mut State, cmd: &'a Command, user: User) -> HandlerFuture<'a> {
    Box::pin(async move {
        let limit = parse_limit(cmd.optional_arg(0))?;
        let posts = FeedService::new(&state.db).browse(&user, limit).await?;

        if posts.is_empty() {
            println!("No posts yet. Run `gator agg <interval>` to collect some.");
        }
        for post in &posts {
            println!("{}", format_post(post, &state.config.display.timezone));
            println!("{POST_SEPARATOR}");
        }
        Ok(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Parse the optional `browse` limit.
pub fn parse_limit(arg: Option<&str>) -> Result<u32> {
    match arg {
        None => Ok(DEFAULT_BROWSE_LIMIT),
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(GatorError::Validation(format!(
                "limit must be a positive integer, got {raw:?}"
            ))),
            Ok(limit) => Ok(limit),
        },
    }
}

/// One line of `users` output.
pub fn format_user_line(user: &User, current: Option<&str>) -> String {
    if current == Some(user.name.as_str()) {
        format!("* {} (current)", user.name)
    } else {
        format!("* {}", user.name)
    }
}

/// One line of `feeds` output.
pub fn format_feed_line(entry: &FeedWithOwner, timezone: &str) -> String {
    let feed = &entry.feed;
    let status = match feed.last_fetched_at {
        None => "never fetched".to_string(),
        Some(at) => {
            let when = format_utc_datetime(&at, timezone, "%Y/%m/%d %H:%M");
            if feed.last_attempt_failed() {
                format!("last fetch failed {when}")
            } else {
                format!("fetched {when}")
            }
        }
    };
    format!(
        "* {} ({}) added by {} [{}]",
        feed.name, feed.url, entry.owner_name, status
    )
}

/// One line of `following` output.
pub fn format_follow_line(follow: &FollowedFeed) -> String {
    format!("* {} ({})", follow.feed_name, follow.feed_url)
}

/// A post block for `browse` output.
pub fn format_post(entry: &PostWithFeed, timezone: &str) -> String {
    let post = &entry.post;
    let when = match &post.published_at {
        Some(at) => format_utc_datetime(at, timezone, "%a %b %-d %Y %H:%M"),
        None => "undated".to_string(),
    };

    let mut out = format!("{} from {}\n--- {} ---\n", when, entry.feed_name, post.title);
    if let Some(description) = &post.description {
        out.push_str(&format!("    {}\n", description));
    }
    out.push_str(&format!("Link: {}", post.url));
    out
}
