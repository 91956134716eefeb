/// Router — decides what happens to one decoded frame.
///
/// For every inbound frame: learn the sender's username binding, mirror
/// chat/reaction activity to the external delegate, then forward the frame
/// (broadcast to everyone but the sender, unicast to one bound user, or
/// silently drop). Delivery is best-effort by design; no error ever flows
/// back to the sender.
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, warn};

use super::codec::Outbound;
use super::delegate::Delegate;
use super::frame::{Frame, FrameKind};
use super::registry::{SharedRegistry, BROADCAST_NAME};

pub struct Router {
    registry: SharedRegistry,
    delegate: Arc<dyn Delegate>,
}

impl Router {
    pub fn new(registry: SharedRegistry, delegate: Arc<dyn Delegate>) -> Self {
        Self { registry, delegate }
    }

    /// Route one frame received from `from`.
    pub async fn route(&self, from: SocketAddr, frame: Frame) {
        let route = frame.route();

        // Opportunistic address learning: any frame naming a sender
        // refreshes that user's binding. No explicit login step exists.
        if let Some(sender) = &route.sender {
            if sender != BROADCAST_NAME {
                self.registry.write().await.bind_username(sender, from);
            }
        }

        // Delegate dispatch. Fire-and-forget: the call runs on its own task
        // and a failure never stalls or aborts forwarding.
        match frame.classify() {
            FrameKind::Chat {
                sender,
                receiver,
                body,
                correlation_id,
            } => {
                let delegate = Arc::clone(&self.delegate);
                tokio::spawn(async move {
                    if let Err(e) = delegate
                        .send_message(&sender, &receiver, &body, correlation_id.as_deref())
                        .await
                    {
                        warn!("message delegate failed: {e}");
                    }
                });
            }
            FrameKind::Reaction { message_id, count } => {
                let delegate = Arc::clone(&self.delegate);
                tokio::spawn(async move {
                    if let Err(e) = delegate.update_reaction_count(&message_id, &count).await {
                        warn!("reaction delegate failed: {e}");
                    }
                });
            }
            FrameKind::Malformed => {
                // The frame named a command whose required fields are
                // missing. No sender-facing error channel exists, so drop
                // the whole frame.
                warn!(%from, code = frame.code, payload = %frame.payload, "malformed payload, dropping frame");
                return;
            }
            _ => {}
        }

        self.forward(from, frame).await;
    }

    /// Forwarding decision, independent of delegate dispatch.
    async fn forward(&self, from: SocketAddr, frame: Frame) {
        let route = frame.route();
        let reg = self.registry.read().await;

        match route.receiver.as_deref() {
            Some(BROADCAST_NAME) => {
                for handle in reg.handles() {
                    if handle.addr != from {
                        // A dead receiver is an unroutable peer, not an error.
                        let _ = handle.tx.send(Outbound::relay(frame.clone()));
                    }
                }
            }
            Some(receiver) => {
                let target = reg
                    .resolve_username(receiver)
                    .and_then(|addr| reg.connection(addr));
                match target {
                    Some(handle) => {
                        let _ = handle.tx.send(Outbound::relay(frame));
                    }
                    None => {
                        debug!(%from, receiver, "unroutable receiver, dropping frame");
                    }
                }
            }
            None => {
                debug!(%from, "payload names no receiver, dropping frame");
            }
        }
    }
}
