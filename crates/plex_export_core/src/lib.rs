pub mod account;
pub mod client;
pub mod config;
pub mod csv_utils;
pub mod errors;
pub mod export;
pub mod models;
pub mod timestamp;

pub use account::PlexAccount;
pub use client::{
    find_section, ClientOptions, LibrarySection, MovieHandle, PlexServer, SearchOptions,
    DEFAULT_PLEX_TV_URL,
};
pub use config::{load_credentials, parse_credentials, validate_base_url, Credentials};
pub use csv_utils::{write_csv, write_records, FIELDNAMES};
pub use errors::{ConfigError, ExportError, PlexError};
pub use export::{
    establish_session, export_sections, fetch_movie_details, fetch_section_details,
    resolve_sections, run_export, run_export_blocking, ExportOptions, ExportProgress,
    ExportResult, ProgressCallback, DEFAULT_CONFIG_PATH, DEFAULT_MAX_WORKERS,
    DEFAULT_OUTPUT_PATH, DEFAULT_SECTION,
};
pub use models::{MovieMetadata, MovieRecord};
pub use timestamp::{format_rating, format_watched_date};
