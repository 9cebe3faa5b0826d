// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! PUT and DELETE integration tests with wiremock.

use std::sync::Arc;

use nbsync_caldav::{
    AuthMethod, CalDavError, Delete, ETag, Href, HttpTransport, Put, Request, Settings,
};
use nbsync_ical::{CalDateTime, Incidence};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request_for(server: &MockServer) -> Request {
    let settings = Settings::new(server.uri()).with_auth(AuthMethod::Basic {
        username: "alice".to_string(),
        password: "secret".to_string(),
    });
    let transport = HttpTransport::new(&settings).expect("Failed to create transport");
    Request::new(Arc::new(settings), Arc::new(transport), CancellationToken::new())
}

fn event() -> Incidence {
    let mut event = Incidence::new_event();
    event.uid = "upload-1".to_string();
    event.summary = "Uploaded".to_string();
    event.set_dt_start(Some(
        CalDateTime::parse("20170324T100000Z", None, false).unwrap(),
    ));
    event
}

#[tokio::test]
async fn test_put_creates_resource() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/cal/upload-1.ics"))
        .and(header("If-None-Match", "*"))
        .and(header("Content-Type", "text/calendar; charset=utf-8"))
        .and(header("Authorization", "Basic YWxpY2U6c2VjcmV0"))
        .and(body_string_contains("UID:upload-1"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"new-1\""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let put = Put::new(request_for(&mock_server));
    let etag = put
        .send_incidences(&Href::from("/cal/upload-1.ics"), &[event()], None)
        .await
        .expect("Failed to upload");
    assert_eq!(etag, Some(ETag::from("\"new-1\"")));
}

#[tokio::test]
async fn test_put_updates_with_if_match() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/cal/upload-1.ics"))
        .and(header("If-Match", "\"old\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let put = Put::new(request_for(&mock_server));
    let etag = put
        .send_incidences(
            &Href::from("/cal/upload-1.ics"),
            &[event()],
            Some(&ETag::from("\"old\"")),
        )
        .await
        .expect("Failed to upload");
    assert_eq!(etag, None);
}

#[tokio::test]
async fn test_put_to_read_only_resource_is_no_op() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(405).insert_header("ETag", "\"ignored\""))
        .mount(&mock_server)
        .await;

    let put = Put::new(request_for(&mock_server));
    let etag = put
        .send_incidences(&Href::from("/cal/upload-1.ics"), &[event()], None)
        .await
        .expect("405 is not an error");
    assert_eq!(etag, None);
}

#[tokio::test]
async fn test_put_precondition_failed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&mock_server)
        .await;

    let put = Put::new(request_for(&mock_server));
    let err = put
        .send_incidences(
            &Href::from("/cal/upload-1.ics"),
            &[event()],
            Some(&ETag::from("\"stale\"")),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CalDavError::Status {
            method: "PUT",
            status: 412
        }
    ));
}

#[tokio::test]
async fn test_delete_resource() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/cal/a.ics"))
        .and(header("If-Match", "\"a1\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let delete = Delete::new(request_for(&mock_server));
    delete
        .delete_resource(&Href::from("/cal/a.ics"), Some(&ETag::from("\"a1\"")))
        .await
        .expect("Failed to delete");
}

#[tokio::test]
async fn test_delete_gone_or_read_only_succeeds() {
    for status in [404, 405, 410] {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&mock_server)
            .await;

        let delete = Delete::new(request_for(&mock_server));
        assert!(
            delete
                .delete_resource(&Href::from("/cal/a.ics"), None)
                .await
                .is_ok(),
            "status {status}"
        );
    }
}

#[tokio::test]
async fn test_delete_server_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let delete = Delete::new(request_for(&mock_server));
    let err = delete
        .delete_resource(&Href::from("/cal/a.ics"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CalDavError::Status {
            method: "DELETE",
            status: 500
        }
    ));
}
