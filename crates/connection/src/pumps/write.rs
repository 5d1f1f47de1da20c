//! WebSocket write pump: serialises outbound frames.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::ws_client::{SocketEvent, SocketSignal, forward};

/// Writes queued frames to the WebSocket until cancelled, then sends a
/// close frame.
///
/// A write failure is reported to the manager as [`SocketEvent::Error`].
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    generation: u64,
    events_tx: mpsc::Sender<SocketSignal>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = write_rx.recv() => {
                match msg {
                    Some(m) => {
                        if let Err(e) = write.send(m).await {
                            warn!(generation, "WebSocket write error: {e}");
                            forward(&events_tx, generation, SocketEvent::Error(e.into())).await;
                            return;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}
