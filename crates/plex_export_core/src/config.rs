use std::fs;
use std::path::Path;

use ini::{Ini, Properties};
use url::Url;

use crate::errors::ConfigError;

pub const AUTH_SECTION: &str = "auth";
pub const BASEURL_KEY: &str = "baseurl";
pub const TOKEN_KEY: &str = "token";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: Url,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

pub fn load_credentials(path: &Path) -> Result<Credentials, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_credentials(&content)
}

pub fn parse_credentials(content: &str) -> Result<Credentials, ConfigError> {
    let ini = Ini::load_from_str(content).map_err(|err| ConfigError::Unparsable(err.to_string()))?;
    let auth = ini.section(Some(AUTH_SECTION));

    let base_url = auth.and_then(|props| lookup(props, BASEURL_KEY));
    let token = auth.and_then(|props| lookup(props, TOKEN_KEY));

    let (base_url, token) = match (base_url, token) {
        (Some(base_url), Some(token)) => (base_url, token),
        (base_url, token) => {
            let mut missing = Vec::new();
            if base_url.is_none() {
                missing.push(BASEURL_KEY.to_string());
            }
            if token.is_none() {
                missing.push(TOKEN_KEY.to_string());
            }
            return Err(ConfigError::MissingValues(missing));
        }
    };

    Ok(Credentials {
        base_url: validate_base_url(base_url)?,
        token: token.to_string(),
    })
}

pub fn validate_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|err| ConfigError::InvalidBaseUrl(format!("{raw}: {err}")))?;
    if url.scheme().is_empty() || !url.has_host() {
        return Err(ConfigError::InvalidBaseUrl(format!(
            "{raw}: scheme and host are required"
        )));
    }
    Ok(url)
}

// Keys are matched without regard to case, blank values count as absent.
fn lookup<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props
        .iter()
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(key))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
