use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::dates;
use crate::error::{Error, Result, check_status};

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone)]
pub struct MeetingRequest {
    pub title: String,
    /// Wall-clock start in the client's time zone.
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub attendees: Vec<String>,
}

pub struct CalendarClient {
    http: Client,
    base_url: String,
    access_token: String,
    timezone: Tz,
}

impl CalendarClient {
    pub fn new(access_token: impl Into<String>, timezone: Tz) -> Self {
        Self::with_base_url(CALENDAR_API_BASE, access_token, timezone)
    }

    pub fn with_base_url(base_url: &str, access_token: impl Into<String>, timezone: Tz) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            timezone,
        }
    }

    /// Title of the first event blocking `[start, end)`, if any.
    /// Events marked as free (`transparent`) never block.
    pub async fn find_conflict(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Option<String>> {
        let url = format!("{}/calendars/primary/events", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;
        let events: EventList = check_status(response).await?.json().await?;

        let conflict = events
            .items
            .unwrap_or_default()
            .into_iter()
            .find(|event| event.transparency.as_deref() != Some("transparent"))
            .map(|event| event.summary.unwrap_or_else(|| "(sin título)".to_string()));

        if let Some(title) = &conflict {
            warn!(%start, %end, conflict = %title, "calendar slot is busy");
        }
        Ok(conflict)
    }

    /// Create the event after checking the slot is free; returns its link.
    pub async fn create_meeting(&self, request: &MeetingRequest) -> Result<String> {
        if request.duration_minutes == 0 {
            return Err(Error::InvalidInput("duration must be positive".to_string()));
        }
        if request.title.trim().is_empty() {
            return Err(Error::InvalidInput("meeting title must not be empty".to_string()));
        }

        let start = localize(request.start, self.timezone)?;
        let end = start + Duration::minutes(i64::from(request.duration_minutes));

        if let Some(title) = self.find_conflict(start, end).await? {
            return Err(Error::MeetingConflict(title));
        }

        let mut body = serde_json::json!({
            "summary": request.title,
            "start": {
                "dateTime": start.to_rfc3339(),
                "timeZone": self.timezone.name(),
            },
            "end": {
                "dateTime": end.to_rfc3339(),
                "timeZone": self.timezone.name(),
            },
        });
        if !request.attendees.is_empty() {
            body["attendees"] = request
                .attendees
                .iter()
                .map(|email| serde_json::json!({ "email": email }))
                .collect();
        }

        let url = format!("{}/calendars/primary/events", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let created: CreatedEvent = check_status(response).await?.json().await?;

        info!(id = %created.id, %start, "created calendar event");
        Ok(created.html_link.unwrap_or(created.id))
    }
}

/// Pin a wall-clock time to `tz`. DST-ambiguous times take the earlier
/// instant; times skipped by DST are rejected.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::InvalidInput(format!("{} does not exist in {}", naive, tz.name())))
}

/// Parse a meeting start. Values with `Z` or an offset are converted to
/// `tz`; plain values are taken as wall-clock time in `tz`.
pub fn parse_start(raw: &str, tz: Tz) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    let with_offset = raw.replace('Z', "+00:00");

    for candidate in [raw, with_offset.as_str()] {
        if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
            return Ok(dt.with_timezone(&tz).naive_local());
        }
        if let Ok(dt) = DateTime::parse_from_str(candidate, "%Y-%m-%dT%H:%M%:z") {
            return Ok(dt.with_timezone(&tz).naive_local());
        }
    }

    dates::parse_iso_minute(raw)
        .ok_or_else(|| Error::InvalidInput(format!("unrecognized start time: {}", raw)))
}

#[derive(Debug, Deserialize)]
struct EventList {
    items: Option<Vec<EventItem>>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    summary: Option<String>,
    transparency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedEvent {
    id: String,
    html_link: Option<String>,
}
