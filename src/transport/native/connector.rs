// src/transport/native/connector.rs

//! Native connector: the registry that pairs endpoints.
//!
//! The connector maps a link identity to a pending or established endpoint
//! pair. Pairing is a symmetric rendezvous: the first side to arrive (either
//! role) parks a pending registration; the opposite role completes both
//! sides' deferred results atomically.
//!
//! The connector is an explicitly constructed object with its own lifetime,
//! shared by every transport that connects through it. Typical deployments
//! create exactly one per process and pass it to each transport factory.
//! All registry mutations happen under a single mutex, so concurrent
//! connect/disconnect calls from different transports never observe a
//! half-paired link.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;

use crate::transport::native::endpoint::NativeEndpoint;
use crate::transport::native::lock_ignore_poison;
use crate::{EndpointRole, Error, Result};

/// Both endpoints of an established link.
///
/// Created atomically by the connector; the two references are always
/// present or absent together.
#[derive(Clone, Debug)]
pub struct EndpointPair {
    // ---
    pub server: Arc<NativeEndpoint>,
    pub component: Arc<NativeEndpoint>,
}

impl EndpointPair {
    /// The endpoint owned by the given role.
    pub fn side(&self, role: EndpointRole) -> &Arc<NativeEndpoint> {
        // ---
        match role {
            EndpointRole::Server => &self.server,
            EndpointRole::Component => &self.component,
        }
    }

    /// The endpoint owned by the given role's peer.
    pub fn peer_of(&self, role: EndpointRole) -> &Arc<NativeEndpoint> {
        self.side(role.peer())
    }
}

enum LinkEntry {
    // ---
    /// One side has arrived and is waiting for its counterpart.
    Pending {
        role: EndpointRole,
        endpoint: Arc<NativeEndpoint>,
        waiter: oneshot::Sender<Result<EndpointPair>>,
    },

    /// Both sides are paired. `released` tracks which roles have already
    /// disconnected; the entry is removed once both have.
    Established {
        pair: EndpointPair,
        released_server: bool,
        released_component: bool,
    },
}

/// Registry pairing component endpoints with server endpoints on request.
///
/// Outlives individual transports; shared by all transports that connect
/// through it.
pub struct NativeConnector {
    // ---
    registry: Mutex<HashMap<String, LinkEntry>>,
}

impl NativeConnector {
    pub fn new() -> Arc<Self> {
        // ---
        Arc::new(Self {
            registry: Mutex::new(HashMap::new()),
        })
    }

    /// Register an endpoint for pairing under its link identity.
    ///
    /// The returned receiver resolves exactly once:
    ///
    /// - `Ok(pair)` when the opposite role arrives (or already arrived)
    /// - `Err(PeerUnavailable)` when the identity already carries a pending
    ///   registration of the same role, or an established pair that has not
    ///   fully torn down
    /// - `Err(ConnectionAborted)` when [`abort`](Self::abort) cancels the
    ///   pending registration
    pub fn establish(
        &self,
        endpoint: Arc<NativeEndpoint>,
    ) -> oneshot::Receiver<Result<EndpointPair>> {
        // ---
        let (tx, rx) = oneshot::channel();
        let identity = endpoint.identity().to_owned();
        let role = endpoint.role();

        let mut registry = lock_ignore_poison(&self.registry);

        match registry.remove(&identity) {
            None => {
                // ---
                debug!("connector: '{identity}' pending, waiting for {} side", role.peer());
                registry.insert(
                    identity,
                    LinkEntry::Pending {
                        role,
                        endpoint,
                        waiter: tx,
                    },
                );
            }
            Some(LinkEntry::Pending {
                role: pending,
                endpoint: parked,
                waiter,
            }) if pending != role => {
                // ---
                // Counterpart is waiting; pair up and complete both sides.
                let pair = match role {
                    EndpointRole::Server => EndpointPair {
                        server: endpoint,
                        component: parked,
                    },
                    EndpointRole::Component => EndpointPair {
                        server: parked,
                        component: endpoint,
                    },
                };

                registry.insert(
                    identity.clone(),
                    LinkEntry::Established {
                        pair: pair.clone(),
                        released_server: false,
                        released_component: false,
                    },
                );

                debug!("connector: '{identity}' paired");

                // A dropped waiter means the parked side abandoned its
                // connect; its transport never commits the pair.
                let _ = waiter.send(Ok(pair.clone()));
                let _ = tx.send(Ok(pair));
            }
            Some(occupied) => {
                // ---
                // Same-role collision, or the identity is still occupied by
                // an established pair. Leave the existing entry untouched.
                registry.insert(identity.clone(), occupied);
                debug!("connector: '{identity}' unavailable for {role} side");
                let _ = tx.send(Err(Error::PeerUnavailable(identity)));
            }
        }

        rx
    }

    /// Cancel a pending registration, failing its deferred result.
    ///
    /// No-op if the identity has no pending registration of the given role
    /// (it may have paired or torn down in the meantime).
    pub fn abort(&self, identity: &str, role: EndpointRole) {
        // ---
        let mut registry = lock_ignore_poison(&self.registry);

        let pending_ours = matches!(
            registry.get(identity),
            Some(LinkEntry::Pending { role: pending, .. }) if *pending == role
        );

        if pending_ours {
            if let Some(LinkEntry::Pending { waiter, endpoint, .. }) = registry.remove(identity) {
                debug!("connector: '{identity}' pending {role} side aborted");
                endpoint.close_queue();
                let _ = waiter.send(Err(Error::ConnectionAborted));
            }
        }
    }

    /// Release one side of an established pair.
    ///
    /// Closes the releasing side's inbound queue, so the peer's subsequent
    /// sends fail with `QueueClosed`. The registry entry (and with it the
    /// link identity) is freed only once both sides have released.
    pub fn release(&self, endpoint: &NativeEndpoint) {
        // ---
        let identity = endpoint.identity();
        let mut registry = lock_ignore_poison(&self.registry);

        let Some(LinkEntry::Established {
            released_server,
            released_component,
            ..
        }) = registry.get_mut(identity)
        else {
            return;
        };

        endpoint.close_queue();
        match endpoint.role() {
            EndpointRole::Server => *released_server = true,
            EndpointRole::Component => *released_component = true,
        }

        if *released_server && *released_component {
            debug!("connector: '{identity}' fully released");
            registry.remove(identity);
        } else {
            debug!("connector: '{identity}' half released ({} side)", endpoint.role());
        }
    }

    /// Number of identities currently pending or established.
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.registry).len()
    }

    /// Whether the registry has no pending or established links.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
