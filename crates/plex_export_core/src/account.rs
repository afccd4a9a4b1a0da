use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;
use url::Url;

use crate::client::{join_url, PlexServer, Transport};
use crate::errors::PlexError;
use crate::models::{AccountInfo, AccountUser, SharedServer};

pub struct PlexAccount {
    transport: Transport,
    plex_tv_url: Url,
    token: String,
    info: AccountInfo,
}

impl PlexAccount {
    pub async fn for_server(server: &PlexServer) -> Result<Self, PlexError> {
        let plex_tv_url = Url::parse(&server.options().plex_tv_url)
            .map_err(|err| PlexError::InvalidUrl(format!("plex.tv url: {err}")))?;
        let transport = server.transport().clone();
        let info: AccountInfo = transport
            .get_json(join_url(&plex_tv_url, "/api/v2/user")?, server.token(), &[])
            .await?;
        debug!(account = %info.username, "authenticated against plex.tv");
        Ok(Self {
            transport,
            plex_tv_url,
            token: server.token().to_string(),
            info,
        })
    }

    pub fn info(&self) -> &AccountInfo {
        &self.info
    }

    pub async fn users(&self) -> Result<Vec<AccountUser>, PlexError> {
        let xml = self
            .transport
            .get_xml(join_url(&self.plex_tv_url, "/api/users/")?, &self.token)
            .await?;
        parse_users(&xml)
    }

    pub async fn user(&self, name: &str) -> Result<AccountUser, PlexError> {
        self.users()
            .await?
            .into_iter()
            .find(|user| user.matches(name))
            .ok_or_else(|| PlexError::NotFound {
                kind: "managed user",
                name: name.to_string(),
            })
    }

    pub async fn user_token(
        &self,
        user: &AccountUser,
        machine_identifier: &str,
    ) -> Result<String, PlexError> {
        let path = format!("/api/servers/{machine_identifier}/shared_servers");
        let xml = self
            .transport
            .get_xml(join_url(&self.plex_tv_url, &path)?, &self.token)
            .await?;
        parse_shared_servers(&xml)?
            .into_iter()
            .find(|shared| shared.user_id == user.id && !shared.access_token.is_empty())
            .map(|shared| shared.access_token)
            .ok_or_else(|| PlexError::NotFound {
                kind: "shared server token for user",
                name: user.title.clone(),
            })
    }
}

pub fn parse_users(xml: &[u8]) -> Result<Vec<AccountUser>, PlexError> {
    let mut users = Vec::new();
    for_each_element(xml, "User", |element| {
        let mut user = AccountUser::default();
        for (key, value) in attributes(element)? {
            match key.as_str() {
                "id" => user.id = parse_id(&value)?,
                "title" => user.title = value,
                "username" => user.username = value,
                "email" => user.email = value,
                _ => {}
            }
        }
        users.push(user);
        Ok(())
    })?;
    Ok(users)
}

pub fn parse_shared_servers(xml: &[u8]) -> Result<Vec<SharedServer>, PlexError> {
    let mut servers = Vec::new();
    for_each_element(xml, "SharedServer", |element| {
        let mut shared = SharedServer::default();
        for (key, value) in attributes(element)? {
            match key.as_str() {
                "userID" => shared.user_id = parse_id(&value)?,
                "accessToken" => shared.access_token = value,
                _ => {}
            }
        }
        servers.push(shared);
        Ok(())
    })?;
    Ok(servers)
}

fn for_each_element<F>(xml: &[u8], name: &str, mut visit: F) -> Result<(), PlexError>
where
    F: FnMut(&BytesStart<'_>) -> Result<(), PlexError>,
{
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == name.as_bytes() {
                    visit(&e)?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(PlexError::InvalidXml(e.to_string())),
        }
        buf.clear();
    }
    Ok(())
}

fn attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>, PlexError> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| PlexError::InvalidXml(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|err| PlexError::InvalidXml(err.to_string()))?
                .to_string();
            Ok((key, value))
        })
        .collect()
}

fn parse_id(value: &str) -> Result<i64, PlexError> {
    value
        .trim()
        .parse()
        .map_err(|_| PlexError::InvalidXml(format!("invalid id: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_are_read_from_open_and_empty_elements() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer friendlyName="myPlex" size="2">
  <User id="11" title="Kids" username="" email="">
    <Server id="1" machineIdentifier="abc" name="Home" />
  </User>
  <User id="12" title="Friend" username="friend" email="friend@example.com"/>
</MediaContainer>"#;
        let users = parse_users(xml).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, 11);
        assert_eq!(users[0].title, "Kids");
        assert!(users[1].matches("FRIEND@example.com"));
        assert!(!users[0].matches(""));
    }

    #[test]
    fn shared_servers_carry_tokens() {
        let xml = br#"<MediaContainer>
  <SharedServer id="5" userID="11" accessToken="kid-token" username="Kids"/>
</MediaContainer>"#;
        let servers = parse_shared_servers(xml).unwrap();
        assert_eq!(
            servers,
            vec![SharedServer {
                user_id: 11,
                access_token: "kid-token".to_string(),
            }]
        );
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        let err = parse_users(b"<MediaContainer><User id=\"x\"/></MediaContainer>").unwrap_err();
        assert!(matches!(err, PlexError::InvalidXml(_)));
    }

    #[test]
    fn user_names_match_ignoring_unicode_case() {
        let xml = "<MediaContainer><User id=\"7\" title=\"Élodie\" username=\"ÉLODIE_K\"/></MediaContainer>";
        let users = parse_users(xml.as_bytes()).unwrap();
        assert!(users[0].matches("élodie"));
        assert!(users[0].matches(" élodie_k "));
        assert!(!users[0].matches("elodie"));
    }
}
