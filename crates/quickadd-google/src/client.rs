//! Google Calendar API client.
//!
//! A thin HTTP client over the Calendar API v3, limited to the two
//! operations this program performs: listing upcoming events and creating
//! an event from free text via the quickAdd endpoint.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// When an event starts.
///
/// The API reports either a timestamp (`start.dateTime`) or a bare date for
/// all-day events (`start.date`); the distinction is resolved once at parse
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStart {
    /// A timed event.
    DateTime(DateTime<Utc>),
    /// An all-day event.
    Date(NaiveDate),
}

impl fmt::Display for EventStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// A calendar event, reduced to the fields this program reads.
///
/// The rest of the event schema belongs to the remote service and is not
/// validated here.
#[derive(Debug, Clone)]
pub struct Event {
    /// The event title.
    pub summary: String,
    /// When the event starts.
    pub start: EventStart,
    /// Browser link to the event, when the API provides one.
    pub html_link: Option<String>,
}

/// Calendar API client authenticated with a bearer access token.
#[derive(Debug)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl CalendarClient {
    /// Creates a client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
        }
    }

    /// Lists upcoming events on a calendar.
    ///
    /// The lower time bound is the current UTC instant at call time. Only
    /// single (non-recurring-expanded) events are returned, ordered by
    /// ascending start time, at most `max_results` of them, from a single
    /// response page. An empty calendar yields an empty vector, not an
    /// error.
    pub async fn list_upcoming(
        &self,
        calendar_id: &str,
        max_results: usize,
    ) -> Result<Vec<Event>, ApiError> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", Utc::now().to_rfc3339()),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        let body = Self::read_success_body(response).await?;
        let events = parse_event_list(&body, max_results)?;

        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Creates an event from free text via the quickAdd endpoint.
    ///
    /// The text is passed to the server verbatim; the server is responsible
    /// for interpreting it into event fields. This creates a real event on
    /// the calendar - the call is not idempotent and must not be retried.
    pub async fn quick_add(&self, calendar_id: &str, text: &str) -> Result<Event, ApiError> {
        let url = format!(
            "{}/calendars/{}/events/quickAdd",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("text", text)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let body = Self::read_success_body(response).await?;

        let created: ApiEvent = serde_json::from_str(&body)
            .map_err(|e| ApiError::invalid_response(format!("failed to parse response: {}", e)))?;

        debug!("created event on calendar {}", calendar_id);
        convert_event(created)
            .ok_or_else(|| ApiError::invalid_response("created event has no usable start time"))
    }

    /// Maps error statuses to [`ApiError`] and returns the body on success.
    async fn read_success_body(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::authentication("access token expired or invalid")
                .with_status(status.as_u16()));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(
                ApiError::authorization("access denied to calendar").with_status(status.as_u16())
            );
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ApiError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            ))
            .with_status(status.as_u16()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::server(body).with_status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("failed to read response: {}", e)))
    }
}

/// Maps a reqwest transport failure to an [`ApiError`].
fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::network("request timeout")
    } else if e.is_connect() {
        ApiError::network(format!("connection failed: {}", e))
    } else {
        ApiError::network(format!("request failed: {}", e))
    }
}

/// Parses an events.list response body into at most `max_results` events.
fn parse_event_list(body: &str, max_results: usize) -> Result<Vec<Event>, ApiError> {
    let list: EventListResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::invalid_response(format!("failed to parse response: {}", e)))?;

    let mut events: Vec<Event> = list.items.into_iter().filter_map(convert_event).collect();
    events.truncate(max_results);
    Ok(events)
}

/// Converts an API event into [`Event`].
///
/// Cancelled events and events whose start cannot be resolved are dropped.
fn convert_event(event: ApiEvent) -> Option<Event> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let time = event.start?;
    let start = match (time.date_time, time.date) {
        (Some(dt), _) => {
            let parsed = DateTime::parse_from_rfc3339(&dt)
                .map_err(|e| warn!("failed to parse start time {:?}: {}", dt, e))
                .ok()?;
            EventStart::DateTime(parsed.with_timezone(&Utc))
        }
        (None, Some(date)) => {
            let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| warn!("failed to parse start date {:?}: {}", date, e))
                .ok()?;
            EventStart::Date(parsed)
        }
        (None, None) => {
            warn!("event has no start time, skipping");
            return None;
        }
    };

    Some(Event {
        summary: event.summary.unwrap_or_default(),
        start,
        html_link: event.html_link,
    })
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

/// An event resource as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    summary: Option<String>,
    start: Option<ApiEventTime>,
    status: Option<String>,
    html_link: Option<String>,
}

/// Event start/end time from the API: a timestamp or a bare date.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "summary": "Team sync",
                    "start": { "dateTime": "2026-03-15T10:00:00Z" },
                    "end": { "dateTime": "2026-03-15T11:00:00Z" },
                    "status": "confirmed"
                }
            ]
        }"#;

        let list: EventListResponse = serde_json::from_str(json).unwrap();
        let events: Vec<Event> = list.items.into_iter().filter_map(convert_event).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Team sync");
        assert!(matches!(events[0].start, EventStart::DateTime(_)));
    }

    #[test]
    fn parse_empty_list_response() {
        // An empty calendar is an empty vector, not an error.
        let events = parse_event_list(r#"{ "items": [] }"#, 10).unwrap();
        assert!(events.is_empty());

        // The items key may be absent entirely.
        let events = parse_event_list("{}", 10).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn parse_event_list_caps_results() {
        let json = r#"{
            "items": [
                { "summary": "one", "start": { "date": "2026-03-15" } },
                { "summary": "two", "start": { "date": "2026-03-16" } },
                { "summary": "three", "start": { "date": "2026-03-17" } }
            ]
        }"#;

        let events = parse_event_list(json, 2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "one");
        assert_eq!(events[1].summary, "two");
    }

    #[test]
    fn parse_event_list_rejects_malformed_body() {
        let err = parse_event_list("<html>gateway error</html>", 10).unwrap_err();
        assert_eq!(err.kind(), crate::error::ApiErrorKind::InvalidResponse);
    }

    #[test]
    fn parse_all_day_event() {
        let json = r#"{
            "summary": "Conference",
            "start": { "date": "2026-03-15" }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let converted = convert_event(event).unwrap();
        assert_eq!(
            converted.start,
            EventStart::Date(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
        );
    }

    #[test]
    fn date_time_takes_precedence_over_date() {
        let json = r#"{
            "summary": "Both fields",
            "start": { "date": "2026-03-15", "dateTime": "2026-03-15T09:30:00Z" }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            convert_event(event).unwrap().start,
            EventStart::DateTime(_)
        ));
    }

    #[test]
    fn cancelled_event_is_dropped() {
        let json = r#"{
            "summary": "Was cancelled",
            "start": { "dateTime": "2026-03-15T10:00:00Z" },
            "status": "cancelled"
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn event_without_start_is_dropped() {
        let json = r#"{ "summary": "No start" }"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn event_without_summary_gets_empty_title() {
        let json = r#"{ "start": { "date": "2026-03-15" } }"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert_eq!(convert_event(event).unwrap().summary, "");
    }

    #[test]
    fn parse_quick_add_response() {
        // Shape of the quickAdd endpoint response: a single event resource.
        let json = r#"{
            "kind": "calendar#event",
            "summary": "Dinner",
            "start": { "dateTime": "2026-03-16T22:00:00+02:00" },
            "end": { "dateTime": "2026-03-16T23:00:00+02:00" },
            "status": "confirmed",
            "htmlLink": "https://www.google.com/calendar/event?eid=abc"
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let converted = convert_event(event).unwrap();
        assert_eq!(converted.summary, "Dinner");
        assert_eq!(
            converted.html_link.as_deref(),
            Some("https://www.google.com/calendar/event?eid=abc")
        );

        // Offsets normalize to UTC at parse time.
        match converted.start {
            EventStart::DateTime(dt) => assert_eq!(dt.to_rfc3339(), "2026-03-16T20:00:00+00:00"),
            EventStart::Date(_) => panic!("expected a timed start"),
        }
    }

    #[test]
    fn event_start_display() {
        let timed = EventStart::DateTime(
            DateTime::parse_from_rfc3339("2026-03-15T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        assert_eq!(timed.to_string(), "2026-03-15T10:00:00+00:00");

        let all_day = EventStart::Date(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        assert_eq!(all_day.to_string(), "2026-03-15");
    }
}
