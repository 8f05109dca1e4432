use crate::server::blocking::with_store;
use core::time::Duration;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use userbase::RecordStore;
use userbase_tonic_core::{Error, proto};

/// Streams every record in the store to `resp_tx`, one message per record.
///
/// The store is read in pages of `page_size` records keyed on the last id
/// sent, so each record that exists for the whole call is sent exactly once
/// even if other calls write concurrently.
///
/// # Behavior
///
/// - Records go out in ascending id order, optionally `pacing` apart.
/// - A store failure sends `Err(Status)` after whatever was already sent and
///   returns the error. Sent records are not retracted.
/// - Cancellation of `cancel` sends an `UNAVAILABLE` status and stops.
/// - A closed `resp_tx` (client gone) stops the feed early.
///
/// Returns the number of records sent.
pub async fn feed_records<S: RecordStore>(
    store: Arc<S>,
    page_size: usize,
    pacing: Duration,
    resp_tx: mpsc::Sender<Result<proto::User, Status>>,
    cancel: CancellationToken,
) -> userbase_tonic_core::Result<usize> {
    let mut sent = 0;
    let mut after = None;

    loop {
        let page = match with_store(&store, move |s| s.list_page(after, page_size)).await {
            Ok(page) => page,
            Err(e) => {
                // Best effort: the client may already be gone.
                if let Err(_e) = resp_tx.send(Err(e.clone().into())).await {
                    tracing::warn!("Failed to forward list error: {_e}");
                }
                return Err(e);
            }
        };
        let last_page = page.len() < page_size;

        for record in page {
            if cancel.is_cancelled() {
                let _ = resp_tx.send(Err(Error::ServiceShutdown.into())).await;
                return Err(Error::ServiceShutdown);
            }

            after = Some(record.id);
            if resp_tx.send(Ok(record.into())).await.is_err() {
                return Err(Error::RequestCancelled);
            }
            sent += 1;

            if !pacing.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(pacing) => {}
                }
            }
        }

        if last_page {
            return Ok(sent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;
    use userbase::{MemoryStore, NewUser, StoreError, UserPatch, UserRecord};

    fn seeded(n: usize) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        for i in 0..n {
            store
                .create(NewUser::new(format!("u{i}"), format!("u{i}@example.com"), 1))
                .unwrap();
        }
        Arc::new(store)
    }

    async fn drain(
        mut rx: mpsc::Receiver<Result<proto::User, Status>>,
    ) -> Vec<Result<proto::User, Status>> {
        let mut out = Vec::new();
        while let Some(item) = rx.recv().await {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn streams_every_record_once_across_pages() {
        let store = seeded(23);
        let (tx, rx) = mpsc::channel(4);
        let feed = tokio::spawn(feed_records(
            Arc::clone(&store),
            5,
            Duration::ZERO,
            tx,
            CancellationToken::new(),
        ));

        let items = drain(rx).await;
        assert_eq!(feed.await.unwrap().unwrap(), 23);

        let ids: Vec<u64> = items.into_iter().map(|r| r.unwrap().id).collect();
        let expected: Vec<u64> = store.list_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn empty_store_completes_without_messages() {
        let (tx, rx) = mpsc::channel(1);
        let sent = feed_records(seeded(0), 10, Duration::ZERO, tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert!(drain(rx).await.is_empty());
    }

    /// Serves the first page, then fails.
    struct FailsAfterFirstPage(MemoryStore);

    impl RecordStore for FailsAfterFirstPage {
        fn create(&self, user: NewUser) -> userbase::Result<UserRecord> {
            self.0.create(user)
        }
        fn get_by_id(&self, id: u64) -> userbase::Result<UserRecord> {
            self.0.get_by_id(id)
        }
        fn get_by_username(&self, username: &str) -> userbase::Result<UserRecord> {
            self.0.get_by_username(username)
        }
        fn get_by_email(&self, email: &str) -> userbase::Result<UserRecord> {
            self.0.get_by_email(email)
        }
        fn update(&self, id: u64, patch: UserPatch) -> userbase::Result<UserRecord> {
            self.0.update(id, patch)
        }
        fn delete(&self, id: u64) -> userbase::Result<()> {
            self.0.delete(id)
        }
        fn list_page(&self, after: Option<u64>, limit: usize) -> userbase::Result<Vec<UserRecord>> {
            match after {
                None => self.0.list_page(None, limit),
                Some(_) => Err(StoreError::Internal("connection reset".into())),
            }
        }
    }

    #[tokio::test]
    async fn store_failure_mid_stream_is_an_explicit_error_after_partial_output() {
        let store = FailsAfterFirstPage(MemoryStore::new());
        for i in 0..6 {
            store
                .create(NewUser::new(format!("u{i}"), format!("u{i}@example.com"), 1))
                .unwrap();
        }
        let (tx, rx) = mpsc::channel(16);
        let result = feed_records(
            Arc::new(store),
            3,
            Duration::ZERO,
            tx,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(Error::Store(StoreError::Internal(_)))));

        let items = drain(rx).await;
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(Result::is_ok));
        let status = items[3].as_ref().unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn cancellation_ends_the_stream_with_unavailable() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, rx) = mpsc::channel(4);
        let result = feed_records(seeded(3), 10, Duration::ZERO, tx, cancel).await;
        assert!(matches!(result, Err(Error::ServiceShutdown)));

        let items = drain(rx).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap_err().code(), Code::Unavailable);
    }

    #[tokio::test]
    async fn closed_receiver_stops_the_feed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result =
            feed_records(seeded(3), 10, Duration::ZERO, tx, CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::RequestCancelled)));
    }
}
