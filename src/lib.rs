//! In-process transport layer for a message-oriented RPC/pub-sub router.
//!
//! This library provides the native transport: the abstraction that carries
//! protocol messages between a router-side endpoint and a component-side
//! endpoint without a network socket underneath. It offers the same external
//! contract a socket transport would — asynchronous connect/disconnect,
//! ordered delivery, pause/resume backpressure, dynamic handler attachment —
//! running entirely on in-memory queues.
//!

// Import all sub modules once...
mod domain;
mod error;
mod link_config;
mod transport;

// Re-export main types
pub use error::{Error, Result};
pub use link_config::LinkConfig;

pub use transport::{
    //
    create_native_transport,
    EndpointPair,
    NativeConnector,
    NativeEndpoint,
};

// --- public re-exports
pub use domain::{
    //
    ConnectionState,
    EndpointRole,
    FlowHandler,
    HandlerPtr,
    Message,
    Transport,
    TransportHandler,
    TransportPtr,
};
