use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlexError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server answered {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("response is not valid XML: {0}")]
    InvalidXml(String),
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },
    #[error("file operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("unparsable configuration file: {0}")]
    Unparsable(String),
    #[error("missing required configuration values: {}", .0.join(", "))]
    MissingValues(Vec<String>),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to connect to the Plex server: {0}")]
    Connection(#[source] PlexError),
    #[error("failed to switch to the managed user: {0}")]
    ManagedUser(#[source] PlexError),
    #[error("failed to resolve library section: {0}")]
    Section(#[source] PlexError),
    #[error("failed to fetch movie details: {0}")]
    Fetch(#[source] PlexError),
    #[error("failed to write output file: {0}")]
    Output(#[source] PlexError),
    #[error("failed to start async runtime: {0}")]
    Runtime(String),
}
