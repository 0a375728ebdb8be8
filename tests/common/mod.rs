// tests/common/mod.rs

//! Shared helpers for the integration test suite.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use native_link::{
    // ---
    create_native_transport,
    HandlerPtr,
    LinkConfig,
    Message,
    NativeConnector,
    Result,
    Transport,
    TransportHandler,
    TransportPtr,
};

/// Everything a handler observes, in observation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerEvent {
    Message(Vec<u8>),
    Pause,
    Resume,
    Detach,
}

/// Test handler that forwards every callback into an unbounded channel.
pub struct RecordingHandler {
    events: mpsc::UnboundedSender<HandlerEvent>,
}

impl RecordingHandler {
    pub fn new() -> (HandlerPtr, mpsc::UnboundedReceiver<HandlerEvent>) {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events: tx }), rx)
    }
}

#[async_trait::async_trait]
impl TransportHandler for RecordingHandler {
    async fn on_message(&self, message: Message) -> Result<()> {
        // ---
        let _ = self
            .events
            .send(HandlerEvent::Message(message.into_payload().to_vec()));
        Ok(())
    }

    async fn on_pause(&self) {
        let _ = self.events.send(HandlerEvent::Pause);
    }

    async fn on_resume(&self) {
        let _ = self.events.send(HandlerEvent::Resume);
    }

    async fn on_detach(&self) {
        let _ = self.events.send(HandlerEvent::Detach);
    }
}

/// Create a server/component transport pair and connect both through the
/// given connector under the given identity.
pub async fn connect_pair(
    connector: &Arc<NativeConnector>,
    identity: &str,
) -> (TransportPtr, TransportPtr) {
    // ---
    let server = create_native_transport(LinkConfig::server(identity), connector.clone())
        .await
        .expect("failed to create server transport");
    let component = create_native_transport(LinkConfig::component(identity), connector.clone())
        .await
        .expect("failed to create component transport");

    let (server_result, component_result) = tokio::join!(server.connect(), component.connect());
    server_result.expect("server connect failed");
    component_result.expect("component connect failed");

    (server, component)
}

/// Receive the next handler event, failing the test after 500ms.
pub async fn recv_event(rx: &mut mpsc::UnboundedReceiver<HandlerEvent>) -> HandlerEvent {
    // ---
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("timed out waiting for handler event")
        .expect("handler event channel closed unexpectedly")
}

/// Assert that no handler event arrives within the given window.
pub async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<HandlerEvent>, window: Duration) {
    // ---
    // A timeout (`Err`) means nothing arrived; a closed channel (`Ok(None)`,
    // e.g. after the handler was dropped on detach) is likewise the absence of
    // any event. Only an actual delivered event (`Ok(Some(_))`) is a failure.
    let outcome = timeout(window, rx.recv()).await;
    assert!(
        !matches!(outcome, Ok(Some(_))),
        "expected no handler event, got {:?}",
        outcome.unwrap()
    );
}
