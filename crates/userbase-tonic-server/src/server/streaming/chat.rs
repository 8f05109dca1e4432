use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use userbase::unix_millis;
use userbase_tonic_core::{Error, messages, proto};

fn server_line(text: String) -> proto::ChatMessage {
    proto::ChatMessage {
        sender_id: messages::SERVER_SENDER_ID,
        text,
        timestamp: unix_millis(),
    }
}

/// Echoes every inbound chat message, then says goodbye.
///
/// Each echo is handed to `resp_tx` before the next inbound message is
/// read, so replies keep the inbound order. A clean end of input sends the
/// farewell line. An inbound error is logged and ends the relay with no
/// farewell. Returns the number of messages echoed.
pub async fn relay_chat<I>(
    inbound: I,
    resp_tx: mpsc::Sender<Result<proto::ChatMessage, Status>>,
    cancel: CancellationToken,
) -> userbase_tonic_core::Result<usize>
where
    I: Stream<Item = Result<proto::ChatMessage, Status>>,
{
    let mut inbound = core::pin::pin!(inbound);
    let mut echoed = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = resp_tx.send(Err(Error::ServiceShutdown.into())).await;
                return Err(Error::ServiceShutdown);
            }
            next = inbound.next() => next,
        };

        match next {
            Some(Ok(msg)) => {
                tracing::debug!(sender_id = msg.sender_id, "chat message");
                resp_tx
                    .send(Ok(server_line(messages::echo(&msg.text))))
                    .await
                    .map_err(|_| Error::RequestCancelled)?;
                echoed += 1;
            }
            Some(Err(status)) => {
                tracing::error!(echoed, "chat inbound stream failed: {}", status.message());
                return Err(Error::ChannelError {
                    context: status.message().to_string(),
                });
            }
            None => {
                resp_tx
                    .send(Ok(server_line(messages::FAREWELL.to_string())))
                    .await
                    .map_err(|_| Error::RequestCancelled)?;
                return Ok(echoed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> Result<proto::ChatMessage, Status> {
        Ok(proto::ChatMessage {
            sender_id: 7,
            text: text.into(),
            timestamp: 1,
        })
    }

    async fn collect(
        mut rx: mpsc::Receiver<Result<proto::ChatMessage, Status>>,
    ) -> Vec<Result<proto::ChatMessage, Status>> {
        let mut out = Vec::new();
        while let Some(item) = rx.recv().await {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn echoes_in_order_then_says_goodbye() {
        let (tx, rx) = mpsc::channel(8);
        let echoed = relay_chat(
            tokio_stream::iter(vec![msg("a"), msg("b"), msg("c")]),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(echoed, 3);

        let texts: Vec<String> = collect(rx)
            .await
            .into_iter()
            .map(|m| {
                let m = m.unwrap();
                assert_eq!(m.sender_id, 0);
                m.text
            })
            .collect();
        assert_eq!(
            texts,
            [
                "server received: a",
                "server received: b",
                "server received: c",
                "chat session ended, goodbye",
            ]
        );
    }

    #[tokio::test]
    async fn empty_chat_gets_only_the_farewell() {
        let (tx, rx) = mpsc::channel(1);
        relay_chat(tokio_stream::empty(), tx, CancellationToken::new())
            .await
            .unwrap();
        let lines = collect(rx).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref().unwrap().text, messages::FAREWELL);
    }

    #[tokio::test]
    async fn inbound_error_stops_without_farewell() {
        let (tx, rx) = mpsc::channel(8);
        let result = relay_chat(
            tokio_stream::iter(vec![msg("a"), Err(Status::aborted("reset")), msg("b")]),
            tx,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(Error::ChannelError { .. })));

        let lines = collect(rx).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref().unwrap().text, "server received: a");
    }

    #[tokio::test]
    async fn one_slot_channel_still_preserves_order() {
        let (tx, mut rx) = mpsc::channel(1);
        let inbound = tokio_stream::iter((0..20).map(|i| msg(&i.to_string())));
        let relay = tokio::spawn(relay_chat(inbound, tx, CancellationToken::new()));

        for i in 0..20 {
            let line = rx.recv().await.unwrap().unwrap();
            assert_eq!(line.text, format!("server received: {i}"));
        }
        assert_eq!(rx.recv().await.unwrap().unwrap().text, messages::FAREWELL);
        assert!(rx.recv().await.is_none());
        assert_eq!(relay.await.unwrap().unwrap(), 20);
    }
}
