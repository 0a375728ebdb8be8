//! Transport implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Transport` trait, exposed only through constructor functions.
//!
//! Domain code must not depend on transport-specific types beyond the
//! connector and endpoint handles re-exported here.

mod native;

pub use native::create_transport as create_native_transport;
pub use native::{EndpointPair, NativeConnector, NativeEndpoint};
