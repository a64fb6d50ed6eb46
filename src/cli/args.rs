//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

use super::Command;

/// Command-line arguments for gator.
///
/// # Examples
///
/// ```sh
/// gator register alice
/// gator addfeed "Hacker News" https://news.ycombinator.com/rss
/// gator agg 1m
/// gator --config ./dev.toml browse 10
/// ```
#[derive(Parser, Debug)]
#[command(name = "gator", author, version, about)]
pub struct Cli {
    /// Path to the config file (defaults to $GATOR_CONFIG, then ~/.gatorconfig.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Command to run: register, login, reset, users, addfeed, feeds,
    /// follow, following, unfollow, browse, agg
    pub command: String,

    /// Arguments for the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// The command and its arguments.
    pub fn to_command(&self) -> Command {
        Command::new(self.command.clone(), self.args.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["gator", "addfeed", "Blog", "https://example.com/feed.xml"]);

        assert!(cli.config.is_none());
        assert_eq!(cli.command, "addfeed");
        assert_eq!(cli.args, vec!["Blog", "https://example.com/feed.xml"]);
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::parse_from(["gator", "-c", "/tmp/gator.toml", "users"]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gator.toml")));
        assert_eq!(cli.command, "users");
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_cli_arguments_kept_verbatim() {
        let cli = Cli::parse_from(["gator", "follow", "https://example.com/rss?page=1&lang=en"]);
        assert_eq!(cli.args, vec!["https://example.com/rss?page=1&lang=en"]);
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["gator"]).is_err());
    }

    #[test]
    fn test_to_command() {
        let cli = Cli::parse_from(["gator", "browse", "5"]);
        assert_eq!(cli.to_command(), Command::new("browse", vec!["5".to_string()]));
    }
}
