// src/domain/mod.rs

//! Domain-level abstractions shared by all transport implementations.

mod message;
mod transport;

pub use message::Message;
pub use transport::{
    //
    ConnectionState,
    EndpointRole,
    FlowHandler,
    HandlerPtr,
    Transport,
    TransportHandler,
    TransportPtr,
};
