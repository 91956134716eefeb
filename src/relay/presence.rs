/// Presence notifier — announces connection-count changes to all peers.
///
/// A specialized instance of the broadcast path: a server-authored `CONN_NB`
/// frame carrying the current total, sent on every registration and every
/// cleanup-after-disconnect.
use tracing::debug;

use super::codec::Outbound;
use super::command::Command;
use super::registry::SharedRegistry;

/// Broadcast the current connection count to every registered connection.
pub async fn announce(registry: &SharedRegistry) {
    let reg = registry.read().await;
    let count = reg.len();
    for handle in reg.handles() {
        let _ = handle
            .tx
            .send(Outbound::server(Command::ConnNb, count.to_string()));
    }
    debug!(count, "announced connection count");
}
