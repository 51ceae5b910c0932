use chrono::{DateTime, Utc};

use serde::{Deserialize, Deserializer};

/// The platform's timestamp format, e.g. `Wed Aug 27 13:08:45 +0000 2008`.
const API_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

pub(crate) fn api_datetime<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(de)?;

    DateTime::parse_from_str(&raw, API_TIME_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
