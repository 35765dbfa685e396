//! `CalendarClient` conflict checks and event creation against a mock API.

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Europe::Madrid;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mailpilot::Error;
use mailpilot::calendar::{CalendarClient, MeetingRequest, localize};

const EVENTS: &str = "/calendars/primary/events";

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 7, 5)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap()
}

fn request(duration_minutes: u32) -> MeetingRequest {
    MeetingRequest {
        title: "Revisión de presupuesto".into(),
        start: start(),
        duration_minutes,
        attendees: vec!["ana@example.com".into()],
    }
}

#[tokio::test]
async fn transparent_events_do_not_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "summary": "Bloque libre", "transparency": "transparent" }]
        })))
        .mount(&server)
        .await;

    let client = CalendarClient::with_base_url(&server.uri(), "tok", Madrid);
    let from = localize(start(), Madrid).unwrap();
    let to = from + chrono::Duration::minutes(60);

    assert_eq!(client.find_conflict(from, to).await.unwrap(), None);
}

#[tokio::test]
async fn busy_slot_is_reported_and_nothing_is_created() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "summary": "Bloque libre", "transparency": "transparent" },
                { "summary": "Standup", "transparency": "opaque" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EVENTS))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = CalendarClient::with_base_url(&server.uri(), "tok", Madrid);
    let err = client.create_meeting(&request(30)).await.unwrap_err();

    match err {
        Error::MeetingConflict(title) => assert_eq!(title, "Standup"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn untitled_conflict_gets_placeholder_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [{}] })))
        .mount(&server)
        .await;

    let client = CalendarClient::with_base_url(&server.uri(), "tok", Madrid);
    let from = localize(start(), Madrid).unwrap();
    let conflict = client
        .find_conflict(from, from + chrono::Duration::minutes(15))
        .await
        .unwrap();

    assert_eq!(conflict.as_deref(), Some("(sin título)"));
}

#[tokio::test]
async fn free_slot_creates_event_in_local_zone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS))
        .and(query_param("timeMin", "2025-07-05T15:00:00+02:00"))
        .and(query_param("timeMax", "2025-07-05T16:30:00+02:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EVENTS))
        .and(header("Authorization", "Bearer tok"))
        .and(body_partial_json(json!({
            "summary": "Revisión de presupuesto",
            "start": { "dateTime": "2025-07-05T15:00:00+02:00", "timeZone": "Europe/Madrid" },
            "end": { "dateTime": "2025-07-05T16:30:00+02:00", "timeZone": "Europe/Madrid" },
            "attendees": [{ "email": "ana@example.com" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ev1",
            "htmlLink": "https://www.google.com/calendar/event?eid=ev1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CalendarClient::with_base_url(&server.uri(), "tok", Madrid);
    let link = client.create_meeting(&request(90)).await.unwrap();

    assert_eq!(link, "https://www.google.com/calendar/event?eid=ev1");
}

#[tokio::test]
async fn zero_duration_is_rejected_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let client = CalendarClient::with_base_url(&server.uri(), "tok", Madrid);
    let err = client.create_meeting(&request(0)).await.unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn expired_token_asks_for_reauth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = CalendarClient::with_base_url(&server.uri(), "stale", Madrid);
    let err = client.create_meeting(&request(30)).await.unwrap_err();

    assert!(matches!(err, Error::ReauthRequired));
}
