//! WebSocket read pump: forwards inbound frames to the manager.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::ws_client::{SocketEvent, SocketSignal, forward};

/// Reads frames from the WebSocket until the socket closes, fails, or the
/// pump is cancelled.
///
/// Every inbound frame is reported: text frames as [`SocketEvent::Text`],
/// everything else (and text above `max_message_size`) as
/// [`SocketEvent::Traffic`], so the manager can track liveness. The pump
/// exits after reporting exactly one of `Closed` or `Error`; cancellation
/// exits silently.
pub(crate) async fn read_pump<S>(
    mut read: S,
    generation: u64,
    max_message_size: usize,
    events_tx: mpsc::Sender<SocketSignal>,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => return,
            msg = read.next() => msg,
        };

        let event = match msg {
            Some(Ok(tungstenite::Message::Text(text))) => {
                if text.len() > max_message_size {
                    warn!(generation, "message too large ({} bytes), dropping", text.len());
                    SocketEvent::Traffic
                } else {
                    SocketEvent::Text(String::from(&*text))
                }
            }
            Some(Ok(tungstenite::Message::Ping(data))) => {
                trace!(generation, "received ping, sending pong");
                let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                SocketEvent::Traffic
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                let code = frame.as_ref().map(|f| u16::from(f.code));
                debug!(generation, ?code, "received close frame");
                forward(&events_tx, generation, SocketEvent::Closed { code }).await;
                return;
            }
            Some(Ok(_)) => SocketEvent::Traffic,
            Some(Err(e)) => {
                warn!(generation, "WebSocket read error: {e}");
                forward(&events_tx, generation, SocketEvent::Error(e.into())).await;
                return;
            }
            None => {
                debug!(generation, "WebSocket stream ended");
                forward(&events_tx, generation, SocketEvent::Closed { code: None }).await;
                return;
            }
        };

        if !forward(&events_tx, generation, event).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    type Item = Result<tungstenite::Message, tungstenite::Error>;

    async fn run(items: Vec<Item>, max: usize) -> (Vec<SocketSignal>, Vec<tungstenite::Message>) {
        let (events_tx, mut events_rx) = mpsc::channel(32);
        let (write_tx, mut write_rx) = mpsc::channel(32);
        read_pump(
            stream::iter(items),
            4,
            max,
            events_tx,
            write_tx,
            CancellationToken::new(),
        )
        .await;

        let mut events = Vec::new();
        while let Ok(signal) = events_rx.try_recv() {
            events.push(signal);
        }
        let mut written = Vec::new();
        while let Ok(msg) = write_rx.try_recv() {
            written.push(msg);
        }
        (events, written)
    }

    #[tokio::test]
    async fn end_of_stream_reports_close() {
        let (events, _) = run(vec![], 1024).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].generation, 4);
        assert!(matches!(events[0].event, SocketEvent::Closed { code: None }));
    }

    #[tokio::test]
    async fn text_frames_are_forwarded() {
        let (events, _) = run(vec![Ok(tungstenite::Message::Text("hello".into()))], 1024).await;
        assert!(matches!(&events[0].event, SocketEvent::Text(t) if t == "hello"));
        assert!(matches!(events[1].event, SocketEvent::Closed { .. }));
    }

    #[tokio::test]
    async fn oversized_text_counts_only_as_traffic() {
        let big = "x".repeat(64);
        let (events, _) = run(vec![Ok(tungstenite::Message::Text(big.into()))], 16).await;
        assert!(matches!(events[0].event, SocketEvent::Traffic));
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let (events, written) = run(
            vec![Ok(tungstenite::Message::Ping(vec![1, 2, 3].into()))],
            1024,
        )
        .await;
        assert!(matches!(events[0].event, SocketEvent::Traffic));
        assert_eq!(written, vec![tungstenite::Message::Pong(vec![1, 2, 3].into())]);
    }

    #[tokio::test]
    async fn binary_and_pong_are_traffic() {
        let (events, _) = run(
            vec![
                Ok(tungstenite::Message::Binary(vec![0u8; 4].into())),
                Ok(tungstenite::Message::Pong(Vec::new().into())),
            ],
            1024,
        )
        .await;
        assert!(matches!(events[0].event, SocketEvent::Traffic));
        assert!(matches!(events[1].event, SocketEvent::Traffic));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn close_frame_carries_code_and_stops() {
        let close = tungstenite::Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "bye".into(),
        }));
        let (events, _) = run(
            vec![Ok(close), Ok(tungstenite::Message::Text("late".into()))],
            1024,
        )
        .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, SocketEvent::Closed { code: Some(1001) }));
    }

    #[tokio::test]
    async fn read_error_is_reported() {
        let (events, _) = run(vec![Err(tungstenite::Error::ConnectionClosed)], 1024).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, SocketEvent::Error(_)));
    }

    #[tokio::test]
    async fn cancel_exits_without_event() {
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (write_tx, _write_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        read_pump(stream::pending::<Item>(), 1, 1024, events_tx, write_tx, cancel).await;
        assert!(events_rx.try_recv().is_err());
    }
}
