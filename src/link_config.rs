// src/link_config.rs

//! Public, implementation-agnostic link configuration.
//!
//! This type intentionally contains no queueing or scheduling concepts.
//! Transport factories are responsible for interpreting this config into a
//! concrete endpoint registration.

use crate::EndpointRole;
use uuid::Uuid;

/// Configuration for creating a native transport.
///
/// A link identity names the rendezvous point two transports connect
/// through: one [`EndpointRole::Server`] and one [`EndpointRole::Component`]
/// transport connecting with the same identity are paired by the connector.
///
/// # Example
///
/// ```
/// use native_link::LinkConfig;
///
/// let server = LinkConfig::server("realm1/session-42");
/// let component = LinkConfig::component("realm1/session-42").with_link_id("worker-a");
/// assert_eq!(server.identity, component.identity);
/// ```
#[derive(Debug, Clone)]
pub struct LinkConfig {
    // ---
    /// Rendezvous identity shared by both sides of the link.
    pub identity: String,

    /// Which side of the pair this transport takes.
    pub role: EndpointRole,

    /// Unique identifier for this transport instance, used for logging.
    pub link_id: String,
}

impl LinkConfig {
    /// Create a server-side (router) link configuration.
    pub fn server(identity: impl Into<String>) -> Self {
        Self::new(identity, EndpointRole::Server)
    }

    /// Create a component-side (client) link configuration.
    pub fn component(identity: impl Into<String>) -> Self {
        Self::new(identity, EndpointRole::Component)
    }

    fn new(identity: impl Into<String>, role: EndpointRole) -> Self {
        // ---
        Self {
            identity: identity.into(),
            role,
            link_id: format!("{role}-{}", Uuid::new_v4()),
        }
    }

    /// Override the generated link id with a fixed one.
    pub fn with_link_id(mut self, link_id: impl Into<String>) -> Self {
        self.link_id = link_id.into();
        self
    }
}
