use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use futures::stream::{self, StreamExt};
use tokio::runtime::Builder;
use tracing::{debug, info, warn};

use crate::account::PlexAccount;
use crate::client::{
    find_section, ClientOptions, LibrarySection, MovieHandle, PlexServer, SearchOptions,
};
use crate::config::{load_credentials, Credentials};
use crate::csv_utils::write_csv;
use crate::errors::{ExportError, PlexError};
use crate::models::MovieRecord;

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const DEFAULT_SECTION: &str = "Movies";
pub const DEFAULT_CONFIG_PATH: &str = "config.ini";
pub const DEFAULT_OUTPUT_PATH: &str = "letterboxd.csv";

#[derive(Debug, Clone)]
pub struct ExportProgress {
    pub section: String,
    pub current: u64,
    pub total: u64,
    pub record: Option<MovieRecord>,
}

pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct ExportOptions {
    pub config_path: PathBuf,
    pub csv_path: PathBuf,
    pub sections: Vec<String>,
    pub managed_user: Option<String>,
    pub max_workers: usize,
    pub client_options: ClientOptions,
    pub search_options: SearchOptions,
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            csv_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            sections: vec![DEFAULT_SECTION.to_string()],
            managed_user: None,
            max_workers: DEFAULT_MAX_WORKERS,
            client_options: ClientOptions::default(),
            search_options: SearchOptions::default(),
            progress_callback: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub csv_path: PathBuf,
    pub server_name: String,
    pub managed_user: Option<String>,
    pub sections: Vec<String>,
    pub records_written: usize,
}

pub async fn run_export(options: ExportOptions) -> Result<ExportResult, ExportError> {
    let credentials = load_credentials(&options.config_path)?;
    info!(base_url = %credentials.base_url, "loaded configuration");

    let server = establish_session(
        &credentials,
        options.managed_user.as_deref(),
        options.client_options.clone(),
    )
    .await?;
    let sections = resolve_sections(&server, &options.sections).await?;
    let records_written = export_sections(
        &sections,
        &options.csv_path,
        &options.search_options,
        options.max_workers,
        options.progress_callback.as_ref(),
    )
    .await?;

    Ok(ExportResult {
        csv_path: options.csv_path,
        server_name: server.identity().display_name().to_string(),
        managed_user: options.managed_user,
        sections: sections
            .iter()
            .map(|section| section.title().to_string())
            .collect(),
        records_written,
    })
}

pub fn run_export_blocking(options: ExportOptions) -> Result<ExportResult, ExportError> {
    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| ExportError::Runtime(err.to_string()))?;
    rt.block_on(run_export(options))
}

pub async fn establish_session(
    credentials: &Credentials,
    managed_user: Option<&str>,
    client_options: ClientOptions,
) -> Result<PlexServer, ExportError> {
    let server = PlexServer::connect(&credentials.base_url, &credentials.token, client_options)
        .await
        .map_err(ExportError::Connection)?;
    info!(
        server = server.identity().display_name(),
        version = server.identity().version.as_deref().unwrap_or("unknown"),
        "connected to Plex server"
    );

    let Some(name) = managed_user else {
        return Ok(server);
    };
    switch_managed_user(&server, name)
        .await
        .map_err(ExportError::ManagedUser)
}

async fn switch_managed_user(server: &PlexServer, name: &str) -> Result<PlexServer, PlexError> {
    let account = PlexAccount::for_server(server).await?;
    let user = account.user(name).await?;
    let token = account
        .user_token(&user, server.machine_identifier())
        .await?;
    let scoped = server.reconnect(&token).await?;
    info!(user = %user.title, account = %account.info().username, "switched to managed user");
    Ok(scoped)
}

pub async fn resolve_sections(
    server: &PlexServer,
    names: &[String],
) -> Result<Vec<LibrarySection>, ExportError> {
    let available = server.sections().await.map_err(ExportError::Section)?;
    names
        .iter()
        .map(|name| {
            let section = find_section(&available, name).map_err(ExportError::Section)?;
            info!(section = section.title(), key = section.key(), "resolved library section");
            Ok(section.clone())
        })
        .collect()
}

pub async fn fetch_movie_details(movie: &MovieHandle) -> Result<MovieRecord, PlexError> {
    let metadata = movie.fetch_metadata().await?;
    let record = MovieRecord::from_metadata(&metadata, &Local);
    debug!(
        title = %record.title,
        year = ?record.year,
        rating = ?record.rating,
        watched = ?record.watched_date,
        "fetched movie"
    );
    Ok(record)
}

/// Fetches every movie of every section. Sections run one after another,
/// movies within a section run `max_workers` at a time and keep the order
/// in which their requests complete.
pub async fn fetch_section_details(
    sections: &[LibrarySection],
    search: &SearchOptions,
    max_workers: usize,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<MovieRecord>, ExportError> {
    let mut all_records = Vec::new();
    for section in sections {
        if !section.is_movie_section() {
            warn!(
                section = section.title(),
                kind = section.kind(),
                "section is not a movie library"
            );
        }
        let movies = section.search(search).await.map_err(ExportError::Fetch)?;
        let total = movies.len() as u64;
        info!(section = section.title(), movies = total, "fetching movie details");
        report(progress, section, 0, total, None);

        let mut pending = stream::iter(movies.iter())
            .map(|movie| fetch_movie_details(movie))
            .buffer_unordered(max_workers.max(1));
        let mut section_records = Vec::with_capacity(movies.len());
        while let Some(result) = pending.next().await {
            let record = result.map_err(ExportError::Fetch)?;
            report(
                progress,
                section,
                section_records.len() as u64 + 1,
                total,
                Some(&record),
            );
            section_records.push(record);
        }
        all_records.extend(section_records);
    }
    Ok(all_records)
}

// Rows are written only after every section has been fetched.
pub async fn export_sections(
    sections: &[LibrarySection],
    csv_path: &Path,
    search: &SearchOptions,
    max_workers: usize,
    progress: Option<&ProgressCallback>,
) -> Result<usize, ExportError> {
    let records = fetch_section_details(sections, search, max_workers, progress).await?;
    let written = write_csv(csv_path, &records).map_err(ExportError::Output)?;
    info!(path = %csv_path.display(), rows = written, "wrote letterboxd csv");
    Ok(written)
}

fn report(
    progress: Option<&ProgressCallback>,
    section: &LibrarySection,
    current: u64,
    total: u64,
    record: Option<&MovieRecord>,
) {
    if let Some(callback) = progress {
        callback(ExportProgress {
            section: section.title().to_string(),
            current,
            total,
            record: record.cloned(),
        });
    }
}
