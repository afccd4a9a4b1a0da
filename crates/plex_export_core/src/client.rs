use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Client,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::errors::PlexError;
use crate::models::{
    ApiResponse, MetadataItem, MetadataPayload, MovieMetadata, SectionDirectory, SectionsPayload,
    ServerIdentity,
};

pub const DEFAULT_PLEX_TV_URL: &str = "https://plex.tv";
pub const TOKEN_HEADER: &str = "x-plex-token";
pub const MOVIE_SECTION_TYPE: &str = "movie";
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 100;

pub const DEFAULT_HEADERS: [(&str, &str); 3] = [
    ("x-plex-product", "plex2letterboxd"),
    ("x-plex-client-identifier", "plex2letterboxd"),
    ("accept", "application/json"),
];

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Option<Duration>,
    pub plex_tv_url: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            plex_tv_url: DEFAULT_PLEX_TV_URL.to_string(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Transport {
    client: Client,
}

impl Transport {
    pub(crate) fn new(options: &ClientOptions) -> Result<Self, PlexError> {
        let mut headers = HeaderMap::new();
        for (name, value) in DEFAULT_HEADERS.iter() {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(PlexError::Request)?;
        Ok(Self { client })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlexError> {
        let bytes = self.get_bytes(url, token, params, None).await?;
        serde_json::from_slice(&bytes).map_err(|err| PlexError::InvalidJson(err.to_string()))
    }

    pub(crate) async fn get_xml(&self, url: Url, token: &str) -> Result<Vec<u8>, PlexError> {
        self.get_bytes(url, token, &[], Some("application/xml")).await
    }

    async fn get_bytes(
        &self,
        url: Url,
        token: &str,
        params: &[(&str, String)],
        accept: Option<&'static str>,
    ) -> Result<Vec<u8>, PlexError> {
        debug!(url = %url, "GET");
        let mut req = self.client.get(url.clone()).header(TOKEN_HEADER, token);
        if let Some(accept) = accept {
            req = req.header(ACCEPT, accept);
        }
        for (k, v) in params {
            req = req.query(&[(k, v.as_str())]);
        }
        let response = req.send().await.map_err(PlexError::Request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlexError::Status {
                status,
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await.map_err(PlexError::Request)?;
        Ok(bytes.to_vec())
    }
}

pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url, PlexError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|err| PlexError::InvalidUrl(format!("{joined}: {err}")))
}

struct ServerInner {
    transport: Transport,
    base_url: Url,
    token: String,
    identity: ServerIdentity,
    options: ClientOptions,
}

#[derive(Clone)]
pub struct PlexServer {
    inner: Arc<ServerInner>,
}

impl fmt::Debug for PlexServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlexServer")
            .field("base_url", &self.inner.base_url.as_str())
            .field("identity", &self.inner.identity)
            .finish_non_exhaustive()
    }
}

impl PlexServer {
    pub async fn connect(
        base_url: &Url,
        token: &str,
        options: ClientOptions,
    ) -> Result<Self, PlexError> {
        let transport = Transport::new(&options)?;
        let response: ApiResponse<ServerIdentity> = transport
            .get_json(join_url(base_url, "/")?, token, &[])
            .await?;
        Ok(Self {
            inner: Arc::new(ServerInner {
                transport,
                base_url: base_url.clone(),
                token: token.to_string(),
                identity: response.media_container,
                options,
            }),
        })
    }

    pub async fn reconnect(&self, token: &str) -> Result<Self, PlexError> {
        Self::connect(&self.inner.base_url, token, self.inner.options.clone()).await
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.inner.identity
    }

    pub fn machine_identifier(&self) -> &str {
        &self.inner.identity.machine_identifier
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub(crate) fn token(&self) -> &str {
        &self.inner.token
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub async fn sections(&self) -> Result<Vec<LibrarySection>, PlexError> {
        let response: ApiResponse<SectionsPayload> =
            self.get_json("/library/sections", &[]).await?;
        Ok(response
            .media_container
            .directories
            .into_iter()
            .map(|directory| LibrarySection::new(self.clone(), directory))
            .collect())
    }

    pub async fn section(&self, name: &str) -> Result<LibrarySection, PlexError> {
        find_section(&self.sections().await?, name).cloned()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlexError> {
        let url = join_url(&self.inner.base_url, path)?;
        self.inner
            .transport
            .get_json(url, &self.inner.token, params)
            .await
    }
}

// Titles match ignoring case and surrounding whitespace.
pub fn find_section<'a>(
    sections: &'a [LibrarySection],
    name: &str,
) -> Result<&'a LibrarySection, PlexError> {
    let wanted = name.trim().to_lowercase();
    sections
        .iter()
        .find(|section| section.title().trim().to_lowercase() == wanted)
        .ok_or_else(|| PlexError::NotFound {
            kind: "library section",
            name: name.to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub sort: String,
    pub include_unwatched: bool,
    pub page_size: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            sort: "lastViewedAt".to_string(),
            include_unwatched: true,
            page_size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LibrarySection {
    server: PlexServer,
    directory: SectionDirectory,
}

impl LibrarySection {
    fn new(server: PlexServer, directory: SectionDirectory) -> Self {
        Self { server, directory }
    }

    pub fn key(&self) -> &str {
        &self.directory.key
    }

    pub fn title(&self) -> &str {
        &self.directory.title
    }

    pub fn kind(&self) -> &str {
        &self.directory.kind
    }

    pub fn is_movie_section(&self) -> bool {
        self.directory.kind == MOVIE_SECTION_TYPE
    }

    /// Lists every movie in the section, one page at a time. Paging stops on
    /// an empty or short page, once `totalSize` is reached, when the server
    /// answers without `totalSize`, or when its `offset` shows it ignored the
    /// requested start.
    pub async fn search(&self, options: &SearchOptions) -> Result<Vec<MovieHandle>, PlexError> {
        let path = format!("/library/sections/{}/all", self.directory.key);
        let page_size = options.page_size.max(1);
        let mut start: u64 = 0;
        let mut movies = Vec::new();
        loop {
            let mut params = vec![
                ("type", "1".to_string()),
                ("sort", options.sort.clone()),
                ("X-Plex-Container-Start", start.to_string()),
                ("X-Plex-Container-Size", page_size.to_string()),
            ];
            if !options.include_unwatched {
                params.push(("unwatched", "0".to_string()));
            }
            let response: ApiResponse<MetadataPayload> =
                self.server.get_json(&path, &params).await?;
            let payload = response.media_container;
            let fetched = payload.metadata.len() as u64;
            if fetched == 0 || payload.offset.is_some_and(|offset| offset != start) {
                break;
            }
            movies.extend(
                payload
                    .metadata
                    .into_iter()
                    .map(|item| MovieHandle::new(self.server.clone(), item)),
            );
            start += fetched;
            let reached_total = payload.total_size.map_or(true, |total| start >= total);
            if fetched < u64::from(page_size) || reached_total {
                break;
            }
        }
        Ok(movies)
    }
}

#[derive(Debug, Clone)]
pub struct MovieHandle {
    server: PlexServer,
    rating_key: String,
    title: String,
}

impl MovieHandle {
    fn new(server: PlexServer, item: MetadataItem) -> Self {
        Self {
            server,
            rating_key: item.rating_key,
            title: item.title,
        }
    }

    pub fn rating_key(&self) -> &str {
        &self.rating_key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub async fn fetch_metadata(&self) -> Result<MovieMetadata, PlexError> {
        let path = format!("/library/metadata/{}", self.rating_key);
        let response: ApiResponse<MetadataPayload> = self.server.get_json(&path, &[]).await?;
        response
            .media_container
            .metadata
            .into_iter()
            .next()
            .map(MovieMetadata::from)
            .ok_or_else(|| PlexError::NotFound {
                kind: "movie",
                name: self.rating_key.clone(),
            })
    }
}
