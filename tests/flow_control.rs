// tests/flow_control.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{assert_no_event, connect_pair, recv_event, HandlerEvent, RecordingHandler};
use native_link::{
    // ---
    Error,
    Message,
    NativeConnector,
    Result,
    Transport,
    TransportHandler,
};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

/// Handler whose message processing takes a while, for exercising the
/// detach-waits-for-in-flight-delivery contract.
struct SlowHandler {
    events: mpsc::UnboundedSender<HandlerEvent>,
    delay: Duration,
}

impl SlowHandler {
    fn new(delay: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<HandlerEvent>) {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events: tx, delay }), rx)
    }
}

#[async_trait::async_trait]
impl TransportHandler for SlowHandler {
    async fn on_message(&self, message: Message) -> Result<()> {
        // ---
        sleep(self.delay).await;
        let _ = self
            .events
            .send(HandlerEvent::Message(message.into_payload().to_vec()));
        Ok(())
    }

    async fn on_detach(&self) {
        let _ = self.events.send(HandlerEvent::Detach);
    }
}

/// Register a flow callback that reports each invocation on a channel.
fn flow_probe() -> (native_link::FlowHandler, mpsc::UnboundedReceiver<()>) {
    // ---
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: native_link::FlowHandler = Box::new(move || {
        let _ = tx.send(());
    });
    (callback, rx)
}

async fn recv_signal(rx: &mut mpsc::UnboundedReceiver<()>) {
    // ---
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("timed out waiting for flow signal")
        .expect("flow signal channel closed unexpectedly");
}

#[tokio::test]
async fn pause_gates_local_delivery_and_signals_peer() {
    // ---
    // Arrange
    // ---
    let connector = NativeConnector::new();
    let (server, component) = connect_pair(&connector, "flow-basic").await;

    let (server_handler, mut server_events) = RecordingHandler::new();
    server.attach(server_handler).await.expect("attach failed");

    let (component_handler, mut component_events) = RecordingHandler::new();
    component
        .attach(component_handler)
        .await
        .expect("attach failed");

    let (pause_cb, mut paused) = flow_probe();
    let (resume_cb, mut resumed) = flow_probe();
    server.set_pause_handler(Some(pause_cb));
    server.set_resume_handler(Some(resume_cb));

    // ---
    // Act: the component applies backpressure, then the server sends.
    // ---
    component.pause();
    recv_signal(&mut paused).await;
    assert_eq!(recv_event(&mut server_events).await, HandlerEvent::Pause);

    server.send(Message::from("while-paused")).expect("send failed");

    // ---
    // Assert: nothing reaches the paused side until it resumes.
    // ---
    assert_no_event(&mut component_events, Duration::from_millis(80)).await;

    component.resume();
    recv_signal(&mut resumed).await;
    assert_eq!(recv_event(&mut server_events).await, HandlerEvent::Resume);

    assert_eq!(
        recv_event(&mut component_events).await,
        HandlerEvent::Message(b"while-paused".to_vec())
    );
}

#[tokio::test]
async fn pause_and_resume_are_idempotent() {
    // ---
    let connector = NativeConnector::new();
    let (server, component) = connect_pair(&connector, "flow-idempotent").await;

    let (server_handler, mut server_events) = RecordingHandler::new();
    server.attach(server_handler).await.expect("attach failed");

    component.pause();
    component.pause();
    component.resume();
    component.resume();

    // Exactly one signal each direction-change, no echoes of the repeats.
    assert_eq!(recv_event(&mut server_events).await, HandlerEvent::Pause);
    assert_eq!(recv_event(&mut server_events).await, HandlerEvent::Resume);
    assert_no_event(&mut server_events, Duration::from_millis(50)).await;
}

#[tokio::test]
async fn cleared_flow_handler_is_not_invoked() {
    // ---
    // Arrange: register, then clear.
    // ---
    let connector = NativeConnector::new();
    let (server, component) = connect_pair(&connector, "flow-cleared").await;

    let (server_handler, mut server_events) = RecordingHandler::new();
    server.attach(server_handler).await.expect("attach failed");

    let (pause_cb, mut paused) = flow_probe();
    server.set_pause_handler(Some(pause_cb));
    server.set_pause_handler(None);

    // ---
    // Act
    // ---
    component.pause();

    // ---
    // Assert: the signal still reaches the handler, but the cleared
    // callback stays silent.
    // ---
    assert_eq!(recv_event(&mut server_events).await, HandlerEvent::Pause);

    // Clearing dropped the callback (and with it the probe's sender), so the
    // probe channel must be empty-and-closed or silent, never signalled.
    let outcome = timeout(Duration::from_millis(50), paused.recv()).await;
    assert!(
        matches!(outcome, Ok(None) | Err(_)),
        "cleared callback must not be invoked"
    );
}

#[tokio::test]
async fn flow_handlers_may_be_registered_before_connect() {
    // ---
    let connector = NativeConnector::new();

    let server = native_link::create_native_transport(
        native_link::LinkConfig::server("flow-preregistered"),
        connector.clone(),
    )
    .await
    .expect("failed to create server transport");

    // Registration while still disconnected is legal.
    let (pause_cb, mut paused) = flow_probe();
    server.set_pause_handler(Some(pause_cb));

    let component = native_link::create_native_transport(
        native_link::LinkConfig::component("flow-preregistered"),
        connector.clone(),
    )
    .await
    .expect("failed to create component transport");

    let (server_result, component_result) = tokio::join!(server.connect(), component.connect());
    server_result.expect("server connect failed");
    component_result.expect("component connect failed");

    component.pause();
    recv_signal(&mut paused).await;
}

#[tokio::test]
async fn attach_while_attached_fails_and_first_handler_survives() {
    // ---
    // Arrange
    // ---
    let connector = NativeConnector::new();
    let (server, component) = connect_pair(&connector, "attach-twice").await;

    let (first, mut first_events) = RecordingHandler::new();
    let (second, mut second_events) = RecordingHandler::new();
    component.attach(first).await.expect("first attach failed");

    // ---
    // Act
    // ---
    let err = component
        .attach(second)
        .await
        .expect_err("second attach must fail");

    // ---
    // Assert
    // ---
    assert!(matches!(err, Error::AlreadyAttached));
    assert!(component.has_handler());

    server.send(Message::from("still-first")).expect("send failed");
    assert_eq!(
        recv_event(&mut first_events).await,
        HandlerEvent::Message(b"still-first".to_vec())
    );
    assert_no_event(&mut second_events, Duration::from_millis(50)).await;
}

#[tokio::test]
async fn detach_stops_delivery_and_preserves_backlog() {
    // ---
    // Arrange
    // ---
    let connector = NativeConnector::new();
    let (server, component) = connect_pair(&connector, "detach-backlog").await;

    let (first, mut first_events) = RecordingHandler::new();
    component.attach(first).await.expect("attach failed");

    server.send(Message::from("before")).expect("send failed");
    assert_eq!(
        recv_event(&mut first_events).await,
        HandlerEvent::Message(b"before".to_vec())
    );

    // ---
    // Act
    // ---
    component.detach().await.expect("detach failed");
    assert!(!component.has_handler());
    assert_eq!(recv_event(&mut first_events).await, HandlerEvent::Detach);

    server.send(Message::from("held-0")).expect("send failed");
    server.send(Message::from("held-1")).expect("send failed");

    // ---
    // Assert: the detached handler sees nothing; a replacement drains the
    // backlog in order.
    // ---
    assert_no_event(&mut first_events, Duration::from_millis(50)).await;

    let (second, mut second_events) = RecordingHandler::new();
    component.attach(second).await.expect("re-attach failed");

    assert_eq!(
        recv_event(&mut second_events).await,
        HandlerEvent::Message(b"held-0".to_vec())
    );
    assert_eq!(
        recv_event(&mut second_events).await,
        HandlerEvent::Message(b"held-1".to_vec())
    );
}

#[tokio::test]
async fn detach_is_idempotent() {
    // ---
    let connector = NativeConnector::new();
    let (_server, component) = connect_pair(&connector, "detach-twice").await;

    let (handler, mut events) = RecordingHandler::new();
    component.attach(handler).await.expect("attach failed");

    component.detach().await.expect("first detach failed");
    assert_eq!(recv_event(&mut events).await, HandlerEvent::Detach);

    component.detach().await.expect("second detach must be a no-op");
    assert_no_event(&mut events, Duration::from_millis(50)).await;
}

#[tokio::test]
async fn detach_waits_for_in_flight_delivery() {
    // ---
    // Arrange: a handler that takes 100ms per message, with two queued.
    // ---
    let connector = NativeConnector::new();
    let (server, component) = connect_pair(&connector, "detach-inflight").await;

    let (slow, mut events) = SlowHandler::new(Duration::from_millis(100));
    component.attach(slow).await.expect("attach failed");

    server.send(Message::from("in-flight")).expect("send failed");
    server.send(Message::from("never-seen")).expect("send failed");

    // Let the first delivery enter the handler.
    sleep(Duration::from_millis(30)).await;

    // ---
    // Act: detach must block until the in-flight delivery returns.
    // ---
    component.detach().await.expect("detach failed");

    // ---
    // Assert: the first message completed, the second was never delivered,
    // and nothing reaches the handler after detach returned.
    // ---
    assert_eq!(
        recv_event(&mut events).await,
        HandlerEvent::Message(b"in-flight".to_vec())
    );
    assert_eq!(recv_event(&mut events).await, HandlerEvent::Detach);
    assert_no_event(&mut events, Duration::from_millis(200)).await;

    // The undelivered message is still queued for a successor.
    let (replacement, mut replacement_events) = RecordingHandler::new();
    component.attach(replacement).await.expect("re-attach failed");
    assert_eq!(
        recv_event(&mut replacement_events).await,
        HandlerEvent::Message(b"never-seen".to_vec())
    );
}
