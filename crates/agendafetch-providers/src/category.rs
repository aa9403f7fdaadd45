//! Category listings from the iCalendar feed (`export/categ/<id>.ics`).

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use agendafetch_core::{Location, parse_conference, unset_time};

use crate::error::{AgendaError, AgendaResult};

/// One conference listed in a category feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaSummary {
    pub location: Location,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Parses a category feed into one summary per event that links to a conference.
///
/// # Errors
///
/// [`AgendaErrorCode::MalformedResponse`](crate::AgendaErrorCode::MalformedResponse)
/// when the text is not iCalendar.
pub fn parse_category_feed(ics: &str) -> AgendaResult<Vec<AgendaSummary>> {
    let calendar = ics
        .parse::<Calendar>()
        .map_err(|e| AgendaError::malformed_response(format!("invalid category feed: {}", e)))?;

    Ok(calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => summarize(event),
            _ => None,
        })
        .collect())
}

fn summarize(event: &Event) -> Option<AgendaSummary> {
    let title = event.get_summary().unwrap_or_default().trim().to_string();
    let Some(url) = event.property_value("URL") else {
        warn!(title = %title, "category event without URL skipped");
        return None;
    };
    let location = match parse_conference(url.trim()) {
        Ok(location) => location,
        Err(e) => {
            warn!(url = %url, error = %e, "category event URL is not a conference");
            return None;
        }
    };

    let start = event.get_start().map(resolve).unwrap_or_else(unset_time);
    let end = event.get_end().map(resolve).unwrap_or(start);
    debug!(id = %location.identifier, title = %title, "listed conference");

    Some(AgendaSummary {
        location,
        title,
        start,
        end,
    })
}

fn resolve(value: DatePerhapsTime) -> DateTime<FixedOffset> {
    match value {
        DatePerhapsTime::Date(date) => date.and_time(NaiveTime::MIN).and_utc().fixed_offset(),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt.fixed_offset(),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            Utc.from_utc_datetime(&naive).fixed_offset()
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(tz) => tz
                    .from_local_datetime(&date_time)
                    .earliest()
                    .map(|dt| dt.fixed_offset())
                    .unwrap_or_else(|| Utc.from_utc_datetime(&date_time).fixed_offset()),
                Err(_) => {
                    debug!(tzid = %tzid, "unknown zone, reading time as UTC");
                    Utc.from_utc_datetime(&date_time).fixed_offset()
                }
            }
        }
    }
}
