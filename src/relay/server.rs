/// Connection supervisor — accept loop, per-connection read tasks, cleanup.
///
/// One task per connection. Each task owns its socket end-to-end: inbound
/// frames come off the framed stream, outbound frames arrive over the
/// connection's `mpsc` handle and are written here. A fault in one
/// connection's task never touches another task or the accept loop.
use std::net::SocketAddr;
use std::sync::Arc;

use futures::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use super::codec::RelayCodec;
use super::delegate::Delegate;
use super::presence;
use super::registry::{self, ConnectionHandle, SharedRegistry};
use super::router::Router;

/// A bound relay server, ready to accept connections.
pub struct Relay {
    listener: TcpListener,
    registry: SharedRegistry,
    router: Arc<Router>,
}

impl Relay {
    /// Bind the listening socket and wire up the registry and router.
    pub async fn bind(addr: &str, delegate: Arc<dyn Delegate>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let registry = registry::shared();
        let router = Arc::new(Router::new(Arc::clone(&registry), delegate));
        Ok(Self {
            listener,
            registry,
            router,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the listener fails or the future is dropped;
    /// dropping it closes the listening socket without draining in-flight
    /// connections.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (socket, addr) = self.listener.accept().await?;
            debug!(%addr, "new connection");
            let registry = Arc::clone(&self.registry);
            let router = Arc::clone(&self.router);
            tokio::spawn(async move {
                if let Err(e) = handle_client(socket, addr, &registry, router).await {
                    // Transport aborts are expected peer behavior.
                    debug!(%addr, "connection ended: {e}");
                }
                cleanup(addr, &registry).await;
                info!(%addr, "disconnected");
            });
        }
    }
}

/// Read loop for one connection: register, announce presence, then relay
/// frames until the peer hangs up or the transport fails.
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    registry: &SharedRegistry,
    router: Arc<Router>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut framed = Framed::new(socket, RelayCodec);
    let (tx, mut rx) = mpsc::unbounded_channel();

    registry
        .write()
        .await
        .register(ConnectionHandle { addr, tx });
    presence::announce(registry).await;

    loop {
        tokio::select! {
            // Inbound frame from the client's TCP stream.
            inbound = framed.next() => {
                let frame = match inbound {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        debug!(%addr, "read error: {e}");
                        break;
                    }
                    None => break, // Connection closed.
                };

                // An empty payload is the client's way of hanging up,
                // not an error.
                if frame.payload.is_empty() {
                    break;
                }

                debug!(%addr, code = frame.code, payload = %frame.payload, "frame");
                router.route(addr, frame).await;
            }

            // Outbound frame from other connections' routing decisions.
            Some(out) = rx.recv() => {
                framed.send(out).await?;
            }
        }
    }

    Ok(())
}

/// Registry cleanup plus presence update for the survivors. Idempotent.
async fn cleanup(addr: SocketAddr, registry: &SharedRegistry) {
    registry.write().await.unregister(addr);
    presence::announce(registry).await;
}
