pub mod output;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use dotenv::dotenv;
use url::Url;

use crate::utils::cookie;

pub use output::OutputFormat;

pub const SESSION_COOKIE: &str = "__session";

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Base URL of the app serving `/api/trpc`
    #[arg(long, env = "API_URL", default_value = "http://localhost:3000")]
    api_url: Url,
    /// Frontend API of the identity provider
    #[arg(long, env = "IDENTITY_URL")]
    identity_url: Option<Url>,
    /// Your `__session` cookie
    #[arg(long, env = "SESSION")]
    session: Option<String>,
    /// How each frame is printed
    #[arg(short, long, default_value = "markdown")]
    format: OutputFormat,
    /// Retries for transient request failures
    #[arg(long, default_value = "3")]
    retries: u32,
    /// Limit request concurrency
    #[arg(long, default_value = "4")]
    limit: usize,
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Load the home page once and print it
    Render,
    /// Submit one post and print the refreshed page
    Post {
        /// Post content
        content: String,
    },
    /// Interactive home page (default)
    Shell,
}

impl Config {
    /// Parse the configuration from the environment and command line arguments
    pub fn parse() -> Self {
        dotenv().ok();
        <Self as Parser>::parse()
    }
    /// Create a logger with the configured verbosity level
    pub fn init_logger(&self) {
        env_logger::Builder::new()
            .filter_level(self.verbose.log_level_filter())
            .format_target(false)
            .init();
    }
    /// Get the session cookie, if signed in
    pub fn session(&self) -> Option<String> {
        self.session
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| cookie(SESSION_COOKIE, s))
    }
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }
    pub const fn identity_url(&self) -> Option<&Url> {
        self.identity_url.as_ref()
    }
    /// Where the sign-in affordance points
    pub fn sign_in_url(&self) -> String {
        match &self.identity_url {
            Some(url) => format!("{}/sign-in", url.as_str().trim_end_matches('/')),
            None => "/sign-in".to_string(),
        }
    }
    pub const fn format(&self) -> OutputFormat {
        self.format
    }
    pub const fn retries(&self) -> u32 {
        self.retries
    }
    pub const fn limit(&self) -> usize {
        self.limit
    }
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Shell)
    }
}

#[cfg(test)]
impl Config {
    /// Build a config pointing at a test server
    pub fn for_test(api_url: &str, session: Option<&str>) -> Self {
        let mut args = vec!["chirp-home", "--api-url", api_url, "--retries", "0"];
        if let Some(session) = session {
            args.extend(["--session", session]);
        }
        <Self as Parser>::parse_from(args)
    }
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
    pub fn with_identity_url(mut self, url: &str) -> Self {
        self.identity_url = Some(Url::parse(url).unwrap());
        self
    }
}
