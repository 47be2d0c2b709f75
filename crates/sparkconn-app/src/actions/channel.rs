//! Channel open and inbound forwarding task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn, Instrument};

use sparkconn_comm::{write_queued, CommAction, CommChannel, CommTransport};
use sparkconn_core::{ChannelEvent, DocumentId};

use crate::message::Message;
use crate::session_registry::OpenTicket;

/// Open a channel with the `open` handshake, start its writer, hand it to the
/// event loop, then forward its inbound events until either side closes it.
///
/// `ChannelOpened` is posted before any forwarded message, so the session is
/// registered before its first backend message is dispatched.
pub async fn open_and_forward<T>(
    transport: Arc<T>,
    document: DocumentId,
    ticket: OpenTicket,
    target: String,
    open_timeout: Duration,
    msg_tx: mpsc::Sender<Message>,
) where
    T: CommTransport + Sync + 'static,
{
    let opened = tokio::time::timeout(
        open_timeout,
        transport.open_channel(&document, &target, CommAction::Open),
    )
    .await;

    let channel = match opened {
        Ok(Ok(channel)) => channel,
        Ok(Err(e)) => {
            warn!("Opening '{}' for {} failed: {}", target, document, e);
            let _ = msg_tx
                .send(Message::ChannelOpenFailed {
                    document,
                    ticket,
                    error: e.to_string(),
                })
                .await;
            return;
        }
        Err(_) => {
            warn!(
                "Opening '{}' for {} timed out after {:?}",
                target, document, open_timeout
            );
            let _ = msg_tx
                .send(Message::ChannelOpenFailed {
                    document,
                    ticket,
                    error: format!("channel open timed out after {:?}", open_timeout),
                })
                .await;
            return;
        }
    };

    let CommChannel {
        handle,
        mut events,
        mut shutdown_rx,
        queued,
    } = channel;
    let channel_id = handle.id();
    info!("Channel #{} open for {}", channel_id, document);

    tokio::spawn(write_queued(handle.sender(), queued, shutdown_rx.clone()).in_current_span());

    if msg_tx
        .send(Message::ChannelOpened {
            document: document.clone(),
            ticket,
            channel: handle,
        })
        .await
        .is_err()
    {
        // Event loop gone; the handle was dropped with the message
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(ChannelEvent::Message(message)) => {
                        if msg_tx
                            .send(Message::ChannelMessage {
                                document: document.clone(),
                                channel_id,
                                message,
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(ChannelEvent::Closed) | None => {
                        let _ = msg_tx
                            .send(Message::ChannelClosed {
                                document: document.clone(),
                                channel_id,
                            })
                            .await;
                        break;
                    }
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("Forwarding for channel #{} stopped", channel_id);
                    break;
                }
            }
        }
    }
}
