//! Paired-link demo: a server-side and a component-side transport exchange
//! messages through one connector.
//!
//! Run with: `cargo run --example echo_link`

use std::sync::Arc;

use native_link::{
    // ---
    create_native_transport,
    LinkConfig,
    Message,
    NativeConnector,
    Result,
    Transport,
    TransportHandler,
    TransportPtr,
};

/// Router-side handler that echoes every message back to the component.
struct EchoHandler {
    back: TransportPtr,
}

#[async_trait::async_trait]
impl TransportHandler for EchoHandler {
    async fn on_message(&self, message: Message) -> Result<()> {
        // ---
        println!("router received {} byte(s), echoing", message.len());
        self.back.send(message)
    }
}

/// Component-side handler that prints whatever comes back.
struct PrintHandler;

#[async_trait::async_trait]
impl TransportHandler for PrintHandler {
    async fn on_message(&self, message: Message) -> Result<()> {
        // ---
        println!(
            "component received: {}",
            String::from_utf8_lossy(message.payload())
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let connector = NativeConnector::new();

    let server =
        create_native_transport(LinkConfig::server("demo/echo"), Arc::clone(&connector)).await?;
    let component =
        create_native_transport(LinkConfig::component("demo/echo"), Arc::clone(&connector)).await?;

    let (server_connected, component_connected) =
        tokio::join!(server.connect(), component.connect());
    server_connected?;
    component_connected?;

    server
        .attach(Arc::new(EchoHandler {
            back: server.clone(),
        }))
        .await?;
    component.attach(Arc::new(PrintHandler)).await?;

    for line in ["CALL:ping", "PUBLISH:topic.demo hello", "CALL:goodbye"] {
        component.send(Message::from(line))?;
    }

    // Give the pumps a turn to finish both directions.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    component.disconnect().await?;
    server.disconnect().await?;
    Ok(())
}
