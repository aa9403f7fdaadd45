//! The JSON export (`export/event/<id>.json?detail=sessions`).
//!
//! Only the fields the normalizer reads are modelled. Servers send `null`
//! for many of them and numbers for some ids, so those fields go through
//! lenient deserializers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::{AgendaError, AgendaResult};

/// Top-level export envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub results: Vec<Event>,
}

/// A conference in the JSON export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default)]
    pub start_date: Option<JsonDate>,
    #[serde(default)]
    pub end_date: Option<JsonDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub contributions: Vec<Contribution>,
    #[serde(default, deserialize_with = "nullable")]
    pub sessions: Vec<SessionSlot>,
    #[serde(default, deserialize_with = "nullable")]
    pub folders: Vec<Folder>,
}

/// Date, wall time and IANA zone name, e.g. `2005-01-21`, `09:00:00`, `Europe/Zurich`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonDate {
    pub date: String,
    pub time: String,
    pub tz: String,
}

/// One block of a session in the timetable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSlot {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default)]
    pub start_date: Option<JsonDate>,
    #[serde(default)]
    pub end_date: Option<JsonDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub contributions: Vec<Contribution>,
    /// The session the slot belongs to, carrying session-level material.
    #[serde(default)]
    pub session: Option<SessionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub folders: Vec<Folder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default)]
    pub start_date: Option<JsonDate>,
    #[serde(default)]
    pub end_date: Option<JsonDate>,
    /// Name of the session the contribution was filed under, if any.
    #[serde(default, deserialize_with = "session_name")]
    pub session: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub speakers: Vec<Person>,
    #[serde(default, deserialize_with = "nullable")]
    pub folders: Vec<Folder>,
    #[serde(default, deserialize_with = "nullable")]
    pub sub_contributions: Vec<SubContribution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubContribution {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub speakers: Vec<Person>,
    #[serde(default, deserialize_with = "nullable")]
    pub folders: Vec<Folder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: String,
}

/// A named group of attachments (`Slides`, `Minutes`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Treats `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts ids sent as strings or numbers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Session names arrive as a string, `null`, or occasionally an object with a `title`.
fn session_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("title").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

/// Parses a JSON export and returns its single event.
///
/// # Errors
///
/// [`AgendaErrorCode::MalformedResponse`](crate::AgendaErrorCode::MalformedResponse)
/// when the body is not an export or does not hold exactly one result.
pub fn parse_json(text: &str) -> AgendaResult<Event> {
    let response: ExportResponse = serde_json::from_str(text).map_err(|e| {
        AgendaError::malformed_response(format!("invalid agenda JSON: {}", e)).with_source(e)
    })?;
    trace!(results = response.results.len(), "parsed agenda JSON");

    let mut results = response.results;
    match results.len() {
        1 => Ok(results.remove(0)),
        n => Err(AgendaError::malformed_response(format!(
            "expected exactly one event in the JSON export, found {}",
            n
        ))),
    }
}
