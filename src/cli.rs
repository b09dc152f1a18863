//! Command-line interface parsing for memview
//!
//! This module handles parsing of CLI arguments using clap. Connection
//! settings fall back to environment variables (`MEMTIME_API_KEY`,
//! `MEMTIME_API_URL`), which may also come from a `.env` file.

use clap::Parser;
use thiserror::Error;

use crate::data::{EntityId, DEFAULT_BASE_URL};
use crate::hierarchy::DEFAULT_PAGE_SIZE;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No API key on the command line or in the environment
    #[error("MEMTIME_API_KEY environment variable is not set (or pass --api-key)")]
    MissingApiKey,

    /// The base URL is not an http(s) URL
    #[error("Invalid base URL: '{0}'. Expected an http:// or https:// URL")]
    InvalidBaseUrl(String),
}

/// memview - browse Memtime clients, projects, tasks and time entries
#[derive(Parser, Debug)]
#[command(name = "memview")]
#[command(about = "Terminal viewer for the Memtime time-tracking API")]
#[command(version)]
pub struct Cli {
    /// Bearer credential for the API
    #[arg(long, env = "MEMTIME_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API base URL
    #[arg(long, env = "MEMTIME_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Children fetched per expand or "load more" in the hierarchy
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u64).range(1..=100))]
    pub page_size: u64,

    /// Log filter, e.g. "debug" or "memview=trace" (default: $MEMVIEW_LOG or "warn")
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Open the form for a new time entry
    #[arg(long, conflicts_with_all = ["edit", "entries"])]
    pub new: bool,

    /// Open the form for editing an existing time entry
    #[arg(long, value_name = "ID", conflicts_with = "entries")]
    pub edit: Option<EntityId>,

    /// Start on the time entries list instead of the hierarchy
    #[arg(long)]
    pub entries: bool,
}

/// Screen shown once the app starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartScreen {
    #[default]
    Hierarchy,
    TimeEntries,
    NewEntry,
    EditEntry(EntityId),
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub api_key: String,
    /// Base URL without trailing slash
    pub base_url: String,
    pub page_size: u64,
    pub log_level: Option<String>,
    pub start_screen: StartScreen,
}

/// Validates an API base URL
pub fn parse_base_url(s: &str) -> Result<String, CliError> {
    let trimmed = s.trim().trim_end_matches('/');
    let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    let has_host = trimmed.split("://").nth(1).is_some_and(|rest| !rest.is_empty());
    if has_scheme && has_host {
        Ok(trimmed.to_string())
    } else {
        Err(CliError::InvalidBaseUrl(s.to_string()))
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Err(CliError::MissingApiKey)` if no non-empty key was given
    /// * `Err(CliError::InvalidBaseUrl)` if the base URL is not http(s)
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let api_key = cli
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(CliError::MissingApiKey)?
            .to_string();

        let start_screen = match (cli.new, cli.edit, cli.entries) {
            (true, _, _) => StartScreen::NewEntry,
            (_, Some(id), _) => StartScreen::EditEntry(id),
            (_, _, true) => StartScreen::TimeEntries,
            _ => StartScreen::Hierarchy,
        };

        Ok(StartupConfig {
            api_key,
            base_url: parse_base_url(&cli.base_url)?,
            page_size: cli.page_size,
            log_level: cli.log_level.clone(),
            start_screen,
        })
    }
}
