use chrono::{DateTime, TimeZone, Utc};

const WATCHED_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn from_unix_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

pub fn format_watched_date<Tz>(viewed_at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    viewed_at
        .with_timezone(tz)
        .format(WATCHED_DATE_FORMAT)
        .to_string()
}

pub fn format_rating(rating: f64) -> String {
    format!("{rating:.0}")
}
