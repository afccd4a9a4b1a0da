use std::fs;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use plex_export_core::{
    load_credentials, parse_credentials, write_csv, write_records, ConfigError, MovieMetadata,
    MovieRecord, PlexError,
};
use tempfile::tempdir;

type TestResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn movie(title: &str, rating: Option<f64>, viewed: Option<DateTime<Utc>>) -> MovieMetadata {
    MovieMetadata {
        title: title.to_string(),
        year: Some(2020),
        user_rating: rating,
        last_viewed_at: viewed,
    }
}

#[test]
fn parse_credentials_success() {
    let credentials =
        parse_credentials("[auth]\nbaseurl = http://localhost:32400\ntoken = 12345\n").unwrap();
    assert_eq!(credentials.base_url.as_str(), "http://localhost:32400/");
    assert_eq!(credentials.token, "12345");
}

#[test]
fn parse_credentials_ignores_key_case() {
    let credentials =
        parse_credentials("[auth]\nBaseURL = https://plex.example.com\nTOKEN = abc\n").unwrap();
    assert_eq!(credentials.base_url.host_str(), Some("plex.example.com"));
    assert_eq!(credentials.token, "abc");
}

#[test]
fn debug_output_hides_token() {
    let credentials = parse_credentials("[auth]\nbaseurl = http://localhost\ntoken = secret\n")
        .unwrap();
    assert!(!format!("{credentials:?}").contains("secret"));
}

#[test]
fn missing_baseurl_is_reported() {
    let err = parse_credentials("[auth]\ntoken = test\n").unwrap_err();
    match err {
        ConfigError::MissingValues(missing) => assert_eq!(missing, vec!["baseurl".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn blank_token_counts_as_missing() {
    let err = parse_credentials("[auth]\nbaseurl = http://localhost\ntoken =\n").unwrap_err();
    assert!(matches!(err, ConfigError::MissingValues(ref keys) if keys == &["token"]));
    assert!(err.to_string().contains("token"));
}

#[test]
fn missing_auth_section_reports_both_keys() {
    let err = parse_credentials("[other]\nbaseurl = http://localhost\n").unwrap_err();
    match err {
        ConfigError::MissingValues(missing) => {
            assert_eq!(missing, vec!["baseurl".to_string(), "token".to_string()])
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn base_url_needs_scheme_and_host() {
    for raw in ["invalid", "localhost:32400", "file:///tmp/plex"] {
        let content = format!("[auth]\nbaseurl = {raw}\ntoken = test\n");
        let err = parse_credentials(&content).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidBaseUrl(_)),
            "{raw} should be rejected, got {err}"
        );
    }
}

#[test]
fn broken_ini_syntax_is_unparsable() {
    let err = parse_credentials("[auth\nbaseurl = http://localhost\n").unwrap_err();
    assert!(matches!(err, ConfigError::Unparsable(_)));
}

#[test]
fn load_credentials_reports_unreadable_file() -> TestResult<()> {
    let dir = tempdir()?;
    let err = load_credentials(&dir.path().join("missing.ini")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));

    let path = dir.path().join("config.ini");
    fs::write(&path, "[auth]\nbaseurl=http://127.0.0.1:32400\ntoken=tok\n")?;
    let credentials = load_credentials(&path)?;
    assert_eq!(credentials.token, "tok");
    Ok(())
}

#[test]
fn record_keeps_plain_title() {
    let record = MovieRecord::from_metadata(&movie("Test Movie", Some(7.0), None), &Utc);
    assert_eq!(
        record,
        MovieRecord {
            title: "Test Movie".to_string(),
            year: Some(2020),
            rating: Some("7".to_string()),
            watched_date: None,
        }
    );
}

#[test]
fn record_without_rating_has_no_rating() {
    let record = MovieRecord::from_metadata(&movie("Test Movie", None, None), &Utc);
    assert_eq!(record.rating, None);
    assert_eq!(record.watched_date, None);
}

#[test]
fn record_rating_is_rounded() {
    let record = MovieRecord::from_metadata(&movie("Test Movie", Some(7.6), None), &Utc);
    assert_eq!(record.rating.as_deref(), Some("8"));
    let record = MovieRecord::from_metadata(&movie("Test Movie", Some(10.0), None), &Utc);
    assert_eq!(record.rating.as_deref(), Some("10"));
}

#[test]
fn record_watched_date_uses_given_timezone() {
    let viewed = Utc.with_ymd_and_hms(2020, 12, 31, 20, 0, 0).unwrap();
    let record = MovieRecord::from_metadata(&movie("Test Movie", Some(7.0), Some(viewed)), &Utc);
    assert_eq!(record.watched_date.as_deref(), Some("2020-12-31"));

    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let record = MovieRecord::from_metadata(&movie("Test Movie", Some(7.0), Some(viewed)), &tokyo);
    assert_eq!(record.watched_date.as_deref(), Some("2021-01-01"));
}

#[test]
fn csv_quotes_titles_exactly_once() -> TestResult<()> {
    let viewed = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap();
    let records = vec![
        MovieRecord::from_metadata(&movie("Test Movie", Some(7.0), None), &Utc),
        MovieRecord::from_metadata(&movie("Test, Movie", Some(7.0), Some(viewed)), &Utc),
        MovieRecord::from_metadata(&movie("Say \"Hi\", Movie", None, None), &Utc),
    ];
    let mut buffer = Vec::new();
    let written = write_records(&mut buffer, &records)?;
    assert_eq!(written, 3);
    assert_eq!(
        String::from_utf8(buffer)?,
        "Title,Year,Rating10,WatchedDate\n\
         Test Movie,2020,7,\n\
         \"Test, Movie\",2020,7,2021-01-01\n\
         \"Say \"\"Hi\"\", Movie\",2020,,\n"
    );
    Ok(())
}

#[test]
fn write_csv_replaces_existing_file() -> TestResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("letterboxd.csv");
    fs::write(&path, "stale content that must disappear\n".repeat(10))?;

    let written = write_csv(&path, &[])?;
    assert_eq!(written, 0);
    assert_eq!(fs::read_to_string(&path)?, "Title,Year,Rating10,WatchedDate\n");
    Ok(())
}

#[test]
fn write_csv_fails_when_directory_is_missing() -> TestResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("missing").join("letterboxd.csv");
    let err = write_csv(&path, &[]).unwrap_err();
    assert!(matches!(err, PlexError::Io(_)));
    assert!(!path.exists());
    Ok(())
}
