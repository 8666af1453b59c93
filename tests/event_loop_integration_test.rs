//! Event loop behaviour against the scripted mock transport, on tokio's
//! paused clock so reconnect delays can be asserted exactly.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{bare_frame, RecordingHandler};
use opencode_events::adapters::mock::{MockHttpClient, MockResponse};
use opencode_events::config::{BaseUrl, EventLoopConfig};
use opencode_events::event_loop::EventLoop;
use opencode_events::traits::HttpError;

const EVENT_URL: &str = "http://localhost:4096/event";

fn base() -> BaseUrl {
    BaseUrl::parse("http://localhost:4096/").unwrap()
}

fn stream_of(kinds: &[&str]) -> MockResponse {
    let frames: Vec<String> = kinds.iter().map(|k| bare_frame(k)).collect();
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    MockResponse::Stream(MockResponse::sse_frames(&frames))
}

fn gaps(client: &MockHttpClient) -> Vec<Duration> {
    client
        .get_requests()
        .windows(2)
        .map(|pair| pair[1].at - pair[0].at)
        .collect()
}

fn assert_gap(gap: Duration, expected: Duration) {
    assert!(
        gap >= expected && gap < expected + Duration::from_millis(50),
        "expected a gap of {:?}, got {:?}",
        expected,
        gap
    );
}

#[tokio::test(start_paused = true)]
async fn test_mixed_outcomes_use_matching_delays() {
    let client = MockHttpClient::new();
    client.push_response(EVENT_URL, stream_of(&["server.connected"]));
    client.push_response(
        EVENT_URL,
        MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
    );
    client.push_response(
        EVENT_URL,
        MockResponse::StreamThenError(
            MockResponse::sse_frames(&["data: {\"type\":\"session.idle\"}\n\n"]),
            HttpError::Io("reset".to_string()),
        ),
    );
    client.set_default_response(MockResponse::StreamPending(Vec::new()));

    let recorder = Arc::new(RecordingHandler::new());
    let events = EventLoop::new(
        Arc::new(client.clone()),
        recorder.clone(),
        EventLoopConfig::default(),
    );

    events.start(base());
    tokio::time::sleep(Duration::from_secs(20)).await;

    // ended cleanly -> 3s, connect refused -> 5s, body reset -> 5s, then pending
    let gaps = gaps(&client);
    assert_eq!(gaps.len(), 3);
    assert_gap(gaps[0], Duration::from_secs(3));
    assert_gap(gaps[1], Duration::from_secs(5));
    assert_gap(gaps[2], Duration::from_secs(5));

    assert_eq!(recorder.kinds(), vec!["server.connected", "session.idle"]);
    assert!(events.is_active());
    assert!(events.state().is_streaming());
    events.stop();
}

#[tokio::test(start_paused = true)]
async fn test_nothing_is_replayed_across_reconnects() {
    let client = MockHttpClient::new();
    client.push_response(EVENT_URL, stream_of(&["file.edited", "todo.updated"]));
    client.push_response(EVENT_URL, stream_of(&["session.updated"]));
    client.set_default_response(MockResponse::StreamPending(Vec::new()));

    let recorder = Arc::new(RecordingHandler::new());
    let events = EventLoop::new(
        Arc::new(client.clone()),
        recorder.clone(),
        EventLoopConfig::default(),
    );

    events.start(base());
    tokio::time::sleep(Duration::from_secs(10)).await;
    events.stop();

    assert_eq!(
        recorder.kinds(),
        vec!["file.edited", "todo.updated", "session.updated"]
    );
    assert_eq!(client.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_wait_issues_no_more_requests() {
    let client = MockHttpClient::new();
    client.set_default_response(stream_of(&["server.connected"]));

    let recorder = Arc::new(RecordingHandler::new());
    let events = EventLoop::new(
        Arc::new(client.clone()),
        recorder.clone(),
        EventLoopConfig::default(),
    );

    events.start(base());
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(client.request_count(), 2);

    events.stop();
    let seen = recorder.len();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(client.request_count(), 2);
    assert_eq!(recorder.len(), seen);
}

#[tokio::test(start_paused = true)]
async fn test_independent_loops_do_not_share_running_state() {
    let first = MockHttpClient::new();
    first.set_default_response(MockResponse::StreamPending(Vec::new()));
    let second = MockHttpClient::new();
    second.set_default_response(MockResponse::StreamPending(Vec::new()));

    let a = EventLoop::new(
        Arc::new(first.clone()),
        Arc::new(RecordingHandler::new()),
        EventLoopConfig::default(),
    );
    let b = EventLoop::new(
        Arc::new(second.clone()),
        Arc::new(RecordingHandler::new()),
        EventLoopConfig::default(),
    );

    assert!(a.start(base()));
    assert!(b.start(base()));
    tokio::time::sleep(Duration::from_millis(10)).await;

    a.stop();
    assert!(!a.is_active());
    assert!(b.is_active());
    assert_eq!(first.request_count(), 1);
    assert_eq!(second.request_count(), 1);
    b.stop();
}

#[tokio::test(start_paused = true)]
async fn test_connection_that_stays_open_delivers_its_first_event() {
    let client = MockHttpClient::new();
    let frames = [bare_frame("server.connected"), bare_frame("session.idle")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    client.set_default_response(MockResponse::StreamPending(MockResponse::sse_frames(&frames)));

    let recorder = Arc::new(RecordingHandler::new());
    let events = EventLoop::new(
        Arc::new(client.clone()),
        recorder.clone(),
        EventLoopConfig::default(),
    );

    events.start(base());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(recorder.kinds(), vec!["server.connected", "session.idle"]);
    assert_eq!(client.request_count(), 1);
    events.stop();
}
