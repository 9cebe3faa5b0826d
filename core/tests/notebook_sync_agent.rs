// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Notebook sync agent tests.

use std::collections::HashMap;
use std::sync::Arc;

use nbsync_caldav::{CalendarResource, ETag, Href, HttpTransport, Reader, Request, Settings};
use nbsync_core::incidence_handler::local_uid;
use nbsync_core::{MemoryStorage, NotebookConfig, NotebookStorage, NotebookSyncAgent, SyncSummary};
use nbsync_ical::{CalDateTime, Incidence};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOTEBOOK: &str = "123456789";
const COLLECTION: &str = "/calendars/alice/work/";

fn request_for(server_address: &str) -> Request {
    let settings = Settings::new(server_address);
    let transport = HttpTransport::new(&settings).expect("Failed to create transport");
    Request::new(Arc::new(settings), Arc::new(transport), CancellationToken::new())
}

fn agent_for(server_address: &str) -> NotebookSyncAgent<MemoryStorage> {
    NotebookSyncAgent::new(
        NotebookConfig::new(NOTEBOOK, "/calendars/alice/work"),
        MemoryStorage::new(),
        request_for(server_address),
    )
}

fn response(href: &str, etag: &str, calendar_data: Option<&str>) -> String {
    let data = calendar_data
        .map(|data| format!("<c:calendar-data>{data}</c:calendar-data>"))
        .unwrap_or_default();
    format!(
        "<d:response>
    <d:href>{href}</d:href>
    <d:propstat>
      <d:prop>
        <d:getetag>{etag}</d:getetag>
        {data}
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>"
    )
}

fn multistatus(responses: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>
<d:multistatus xmlns:d=\"DAV:\" xmlns:c=\"urn:ietf:params:xml:ns:caldav\">
  {}
</d:multistatus>",
        responses.join("\n  ")
    )
}

fn read(body: &str) -> Vec<CalendarResource> {
    let mut reader = Reader::new();
    reader.read(body.as_bytes());
    assert!(!reader.has_error(), "{:?}", reader.error());
    reader.into_results()
}

fn simple_event(uid: &str, summary: &str) -> String {
    format!(
        "BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//nbsync//tests//EN
BEGIN:VEVENT
UID:{uid}
DTSTAMP:20170320T090000Z
DTSTART:20170324T100000Z
DTEND:20170324T110000Z
SUMMARY:{summary}
END:VEVENT
END:VCALENDAR
"
    )
}

fn rid(value: &str) -> CalDateTime {
    CalDateTime::parse(value, None, false).unwrap()
}

#[tokio::test]
async fn test_insert_simple_event() {
    let data = "BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//nbsync//tests//EN
BEGIN:VEVENT
UID:972a7c13-bbd6-4fce-9ebb-03a808111828
DTSTAMP:20170320T090000Z
DTSTART:20170324T100000Z
DTEND:20170324T110000Z
SUMMARY:Test
BEGIN:VALARM
ACTION:DISPLAY
DESCRIPTION:Test
TRIGGER;RELATED=START:-PT15M
END:VALARM
END:VEVENT
END:VCALENDAR
";
    let resources = read(&multistatus(&[response(
        "/calendars/alice/work/972a7c13-bbd6-4fce-9ebb-03a808111828.ics",
        "\"1\"",
        Some(data),
    )]));

    let mut agent = agent_for("http://localhost");
    agent.update_incidences(&resources).await.unwrap();

    let event = agent
        .storage()
        .get("NBUID:123456789:972a7c13-bbd6-4fce-9ebb-03a808111828", None)
        .expect("event not stored");
    assert_eq!(event.summary, "Test");
    assert_eq!(event.alarms.len(), 1);

    let info = agent
        .metadata()
        .get(NOTEBOOK, &event.uid, None)
        .expect("metadata not recorded");
    assert_eq!(
        info.href.as_str(),
        "/calendars/alice/work/972a7c13-bbd6-4fce-9ebb-03a808111828.ics"
    );
    assert_eq!(info.etag, Some(ETag::from("\"1\"")));
}

#[tokio::test]
async fn test_insert_recurring_event() {
    let data = "BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//nbsync//tests//EN
BEGIN:VEVENT
UID:7d145c8e-0f34-45a0-b8ca-d9c86093bc11
DTSTAMP:20121101T090000Z
DTSTART:20121102T100000Z
DTEND:20121102T110000Z
RRULE:FREQ=WEEKLY;COUNT=6
SUMMARY:My Event
END:VEVENT
BEGIN:VEVENT
UID:7d145c8e-0f34-45a0-b8ca-d9c86093bc11
DTSTAMP:20121101T090000Z
RECURRENCE-ID:20121109T100000Z
DTSTART:20121109T140000Z
DTEND:20121109T150000Z
SUMMARY:My Event
END:VEVENT
END:VCALENDAR
";
    let resources = read(&multistatus(&[response(
        "/calendars/alice/work/recurring.ics",
        "\"1\"",
        Some(data),
    )]));

    let mut agent = agent_for("http://localhost");
    agent.update_incidences(&resources).await.unwrap();
    assert_eq!(agent.storage().len(), 2);

    let uid = "NBUID:123456789:7d145c8e-0f34-45a0-b8ca-d9c86093bc11";
    let exception = agent
        .storage()
        .get(uid, Some(&rid("20121109T100000Z")))
        .expect("exception not stored");
    assert_eq!(exception.uid, uid);
    assert_eq!(exception.summary, "My Event");
    assert_eq!(exception.alarms.len(), 0);

    let series = agent.storage().get(uid, None).expect("series not stored");
    assert!(series.recurs());
}

#[tokio::test]
async fn test_insert_and_update_event() {
    let href = "/calendars/alice/work/insert-and-update.ics";
    let uid = "7d145c8e-0f34-45a0-b8ca-d9c86093bc12";
    let resources = read(&multistatus(&[
        response(href, "\"1\"", Some(&simple_event(uid, "My Event"))),
        response(href, "\"2\"", Some(&simple_event(uid, "My Event 2"))),
    ]));

    let mut agent = agent_for("http://localhost");
    agent.update_incidences(&resources).await.unwrap();

    assert_eq!(agent.storage().len(), 1);
    let event = agent
        .storage()
        .get("NBUID:123456789:7d145c8e-0f34-45a0-b8ca-d9c86093bc12", None)
        .expect("event not stored");
    assert_eq!(event.summary, "My Event 2");
    assert_eq!(event.alarms.len(), 0);
    assert_eq!(
        agent.metadata().get(NOTEBOOK, &event.uid, None).unwrap().etag,
        Some(ETag::from("\"2\""))
    );
}

fn local_modification(uri: &str, recurrence_id: &str, description: Option<&str>) -> Incidence {
    let mut event = Incidence::new_event();
    event.recurrence_id = Some(rid(recurrence_id));
    event.comments.push(format!("buteo:caldav:uri:{uri}"));
    if let Some(description) = description {
        event.description = description.to_string();
    }
    event
}

fn remote_resource(uri: &str, recurrence_id: &str) -> CalendarResource {
    let mut remote = Incidence::new_event();
    remote.recurrence_id = Some(rid(recurrence_id));
    remote.comments.push(format!("buteo:caldav:uri:{uri}"));
    CalendarResource::new(Href::from(uri), None, vec![remote])
}

fn fetch_uri(incidence: &Incidence) -> Option<&str> {
    incidence
        .comments
        .iter()
        .find_map(|c| c.strip_prefix("buteo:caldav:uri:"))
}

#[test]
fn test_remove_identical_local_modification() {
    let remote = remote_resource("/bob/calendar/12346789.ics", "20170315T144608Z");
    let mut pending = vec![
        local_modification("/bob/calendar/12346789.ics", "20170315T144608Z", None),
        local_modification("/alice/calendar/147852369.ics", "20170316T051245Z", None),
    ];

    let agent = agent_for("http://localhost");
    agent.remove_possible_local_modification_if_identical(
        &remote.href,
        &[Some(rid("20170315T144608Z"))],
        &remote,
        &HashMap::new(),
        &mut pending,
    );

    assert_eq!(pending.len(), 1);
    assert!(
        pending
            .iter()
            .all(|p| fetch_uri(p) != Some("/bob/calendar/12346789.ics"))
    );
}

#[test]
fn test_keep_genuine_local_modification() {
    let remote = remote_resource("/bob/calendar/12346789.ics", "20170315T144608Z");
    let mut pending = vec![
        local_modification(
            "/bob/calendar/12346789.ics",
            "20170315T144608Z",
            Some("modified description"),
        ),
        local_modification("/alice/calendar/147852369.ics", "20170316T051245Z", None),
    ];

    let agent = agent_for("http://localhost");
    agent.remove_possible_local_modification_if_identical(
        &remote.href,
        &[Some(rid("20170315T144608Z"))],
        &remote,
        &HashMap::new(),
        &mut pending,
    );

    assert_eq!(pending.len(), 2);
    assert!(
        pending
            .iter()
            .any(|p| fetch_uri(p) == Some("/bob/calendar/12346789.ics"))
    );
}

#[test]
fn test_keep_local_exception_occurrence() {
    let remote = remote_resource("/bob/calendar/12346789.ics", "20170315T144608Z");
    let mut pending = vec![local_modification(
        "/bob/calendar/12346789.ics",
        "20170315T144608Z",
        None,
    )];
    let exceptions = HashMap::from([(
        Href::from("/bob/calendar/12346789.ics"),
        vec![Some(rid("20170315T144608Z"))],
    )]);

    let agent = agent_for("http://localhost");
    agent.remove_possible_local_modification_if_identical(
        &remote.href,
        &[Some(rid("20170315T144608Z"))],
        &remote,
        &exceptions,
        &mut pending,
    );
    assert_eq!(pending.len(), 1);
}

/// Mounts the etag listing and the multiget replies of a collection.
async fn mount_remote(server: &MockServer, etags: &[(&str, &str)], events: &[(&str, &str, &str)]) {
    let mut listing = vec![response(COLLECTION, "\"collection\"", None)];
    listing.extend(
        etags
            .iter()
            .map(|(href, etag)| response(href, etag, None)),
    );
    Mock::given(method("REPORT"))
        .and(path(COLLECTION))
        .and(body_string_contains("calendar-query"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&listing)))
        .mount(server)
        .await;

    let fetched: Vec<String> = events
        .iter()
        .map(|(href, etag, data)| response(href, etag, Some(data)))
        .collect();
    Mock::given(method("REPORT"))
        .and(path(COLLECTION))
        .and(body_string_contains("calendar-multiget"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&fetched)))
        .mount(server)
        .await;
}

const HREF_A: &str = "/calendars/alice/work/a.ics";
const HREF_B: &str = "/calendars/alice/work/b.ics";

/// Runs a first pass pulling events `a` and `b`.
async fn initial_pass(server: &MockServer) -> NotebookSyncAgent<MemoryStorage> {
    let a = simple_event("a", "Event A");
    let b = simple_event("b", "Event B");
    mount_remote(
        server,
        &[(HREF_A, "\"a1\""), (HREF_B, "\"b1\"")],
        &[(HREF_A, "\"a1\"", &a), (HREF_B, "\"b1\"", &b)],
    )
    .await;

    let mut agent = agent_for(&server.uri());
    let summary = agent.sync().await.expect("Failed initial sync");
    assert_eq!(
        summary,
        SyncSummary {
            inserted: 2,
            ..SyncSummary::default()
        }
    );
    server.verify().await;
    server.reset().await;
    agent
}

#[tokio::test]
async fn test_sync_pulls_remote_events() {
    let mock_server = MockServer::start().await;
    let agent = initial_pass(&mock_server).await;

    let a = agent
        .storage()
        .get(&local_uid(NOTEBOOK, "a"), None)
        .expect("a not stored");
    assert_eq!(a.summary, "Event A");
    assert_eq!(agent.metadata().len(), 2);
    assert_eq!(
        agent.metadata().get(NOTEBOOK, &a.uid, None).unwrap().etag,
        Some(ETag::from("\"a1\""))
    );
}

#[tokio::test]
async fn test_sync_uploads_local_changes() {
    let mock_server = MockServer::start().await;
    let mut agent = initial_pass(&mock_server).await;

    let mut modified = agent
        .storage()
        .get(&local_uid(NOTEBOOK, "a"), None)
        .unwrap()
        .clone();
    modified.summary = "Event A, edited".to_string();
    agent.storage_mut().local_modify(modified).unwrap();

    let mut created = Incidence::new_event();
    created.uid = local_uid(NOTEBOOK, "new-event");
    created.summary = "Created locally".to_string();
    created.set_dt_start(Some(rid("20170330T100000Z")));
    agent.storage_mut().local_add(created).unwrap();

    agent
        .storage_mut()
        .local_delete(&local_uid(NOTEBOOK, "b"), None)
        .unwrap();

    mount_remote(
        &mock_server,
        &[(HREF_A, "\"a1\""), (HREF_B, "\"b1\"")],
        &[],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path(HREF_A))
        .and(header("If-Match", "\"a1\""))
        .and(body_string_contains("SUMMARY:Event A\\, edited"))
        .and(body_string_contains("UID:a\r\n"))
        .respond_with(ResponseTemplate::new(204).insert_header("ETag", "\"a2\""))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/calendars/alice/work/new-event.ics"))
        .and(header("If-None-Match", "*"))
        .and(body_string_contains("UID:new-event"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"n1\""))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(HREF_B))
        .and(header("If-Match", "\"b1\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = agent.sync().await.expect("Failed to sync");
    assert_eq!(
        summary,
        SyncSummary {
            uploaded: 2,
            deleted_remotely: 1,
            ..SyncSummary::default()
        }
    );

    let metadata = agent.metadata();
    assert_eq!(
        metadata.get(NOTEBOOK, &local_uid(NOTEBOOK, "a"), None).unwrap().etag,
        Some(ETag::from("\"a2\""))
    );
    let created = metadata
        .get(NOTEBOOK, &local_uid(NOTEBOOK, "new-event"), None)
        .unwrap();
    assert_eq!(created.href.as_str(), "/calendars/alice/work/new-event.ics");
    assert_eq!(created.etag, Some(ETag::from("\"n1\"")));
    assert!(metadata.get(NOTEBOOK, &local_uid(NOTEBOOK, "b"), None).is_none());
    assert!(agent.storage().local_changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_drops_echoed_local_edit() {
    let mock_server = MockServer::start().await;
    let mut agent = initial_pass(&mock_server).await;

    // touched locally without a real change
    let same = agent
        .storage()
        .get(&local_uid(NOTEBOOK, "a"), None)
        .unwrap()
        .clone();
    agent.storage_mut().local_modify(same).unwrap();

    let a = simple_event("a", "Event A");
    mount_remote(
        &mock_server,
        &[(HREF_A, "\"a2\""), (HREF_B, "\"b1\"")],
        &[(HREF_A, "\"a2\"", &a)],
    )
    .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let summary = agent.sync().await.expect("Failed to sync");
    assert_eq!(
        summary,
        SyncSummary {
            unchanged: 1,
            ..SyncSummary::default()
        }
    );
    assert_eq!(
        agent
            .metadata()
            .get(NOTEBOOK, &local_uid(NOTEBOOK, "a"), None)
            .unwrap()
            .etag,
        Some(ETag::from("\"a2\""))
    );
}

#[tokio::test]
async fn test_sync_local_edit_wins() {
    let mock_server = MockServer::start().await;
    let mut agent = initial_pass(&mock_server).await;

    let mut edited = agent
        .storage()
        .get(&local_uid(NOTEBOOK, "a"), None)
        .unwrap()
        .clone();
    edited.description = "local change".to_string();
    agent.storage_mut().local_modify(edited).unwrap();

    let a = simple_event("a", "Event A, remote");
    mount_remote(
        &mock_server,
        &[(HREF_A, "\"a2\""), (HREF_B, "\"b1\"")],
        &[(HREF_A, "\"a2\"", &a)],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path(HREF_A))
        .and(header("If-Match", "\"a2\""))
        .and(body_string_contains("DESCRIPTION:local change"))
        .respond_with(ResponseTemplate::new(204).insert_header("ETag", "\"a3\""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = agent.sync().await.expect("Failed to sync");
    assert_eq!(summary.uploaded, 1);
    assert_eq!(summary.updated, 0);

    let a = agent.storage().get(&local_uid(NOTEBOOK, "a"), None).unwrap();
    assert_eq!(a.summary, "Event A");
    assert_eq!(a.description, "local change");
}

#[tokio::test]
async fn test_sync_applies_remote_update_and_deletion() {
    let mock_server = MockServer::start().await;
    let mut agent = initial_pass(&mock_server).await;

    let a = simple_event("a", "Event A, remote");
    mount_remote(&mock_server, &[(HREF_A, "\"a2\"")], &[(HREF_A, "\"a2\"", &a)]).await;

    let summary = agent.sync().await.expect("Failed to sync");
    assert_eq!(
        summary,
        SyncSummary {
            updated: 1,
            deleted_locally: 1,
            ..SyncSummary::default()
        }
    );

    let storage = agent.storage();
    assert_eq!(storage.len(), 1);
    assert_eq!(
        storage.get(&local_uid(NOTEBOOK, "a"), None).unwrap().summary,
        "Event A, remote"
    );
    assert!(storage.get(&local_uid(NOTEBOOK, "b"), None).is_none());
    assert_eq!(agent.metadata().len(), 1);
}

#[tokio::test]
async fn test_sync_with_window_keeps_resources_outside_it() {
    let mock_server = MockServer::start().await;
    let a = simple_event("a", "Event A");
    let b = simple_event("b", "Event B");
    mount_remote(
        &mock_server,
        &[(HREF_A, "\"a1\""), (HREF_B, "\"b1\"")],
        &[(HREF_A, "\"a1\"", &a), (HREF_B, "\"b1\"", &b)],
    )
    .await;

    let config = NotebookConfig::new(NOTEBOOK, COLLECTION).with_window(
        Some("2017-03-01T00:00:00Z".parse().unwrap()),
        Some("2017-04-01T00:00:00Z".parse().unwrap()),
    );
    let mut agent = NotebookSyncAgent::new(config, MemoryStorage::new(), request_for(&mock_server.uri()));
    agent.sync().await.expect("Failed initial sync");
    mock_server.reset().await;

    // b moved out of the window but still exists
    Mock::given(method("REPORT"))
        .and(body_string_contains("calendar-query"))
        .and(body_string_contains("start=\"20170301T000000Z\""))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(multistatus(&[response(HREF_A, "\"a1\"", None)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("REPORT"))
        .and(body_string_contains("calendar-multiget"))
        .and(body_string_contains(HREF_B))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(multistatus(&[response(HREF_B, "\"b2\"", None)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = agent.sync().await.expect("Failed to sync");
    assert_eq!(summary, SyncSummary::default());
    assert_eq!(agent.storage().len(), 2);
}

#[tokio::test]
async fn test_sync_cancelled() {
    let mock_server = MockServer::start().await;
    Mock::given(method("REPORT"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut agent = agent_for(&mock_server.uri());
    agent.cancel_token().cancel();
    assert!(agent.sync().await.is_err());
    assert!(agent.storage().is_empty());
}
