use crate::server::{service::replies, telemetry::record_batch_item};
use futures::StreamExt;
use std::sync::Arc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use userbase::{NewUser, RecordStore};
use userbase_tonic_core::{Error, messages, proto};

/// Running result of a batch call, owned by the task driving it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchTally {
    fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        record_batch_item(succeeded);
    }
}

/// Creates one record per inbound message and answers once.
///
/// Each create is checked against the store as it stands when that message
/// arrives, so a later item colliding with an earlier one in the same batch
/// is a per-item failure. Invalid fields, conflicts and store failures only
/// move the failure counter.
///
/// An inbound stream error, or shutdown while items are still arriving,
/// produces a single `success = false` reply instead of the tally.
pub async fn tally_batch<S, I>(
    store: Arc<S>,
    inbound: I,
    cancel: CancellationToken,
) -> proto::CreateUserResponse
where
    S: RecordStore,
    I: Stream<Item = Result<proto::CreateUserRequest, Status>>,
{
    let mut inbound = core::pin::pin!(inbound);
    let mut tally = BatchTally::default();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!(?tally, "batch interrupted by shutdown");
                return proto::CreateUserResponse::failure(messages::batch_failed(
                    Error::ServiceShutdown,
                ));
            }
            next = inbound.next() => next,
        };

        match next {
            Some(Ok(req)) => {
                let reply = replies::create(&store, NewUser::from(req)).await;
                if !reply.success {
                    tracing::debug!(message = %reply.message, "batch item rejected");
                }
                tally.record(reply.success);
            }
            Some(Err(status)) => {
                tracing::error!(?tally, "batch inbound stream failed: {}", status.message());
                return proto::CreateUserResponse::failure(messages::batch_failed(
                    status.message(),
                ));
            }
            None => {
                tracing::info!(succeeded = tally.succeeded, failed = tally.failed, "batch completed");
                return proto::CreateUserResponse {
                    success: true,
                    message: messages::batch_completed(tally.succeeded, tally.failed),
                    user: None,
                };
            }
        }
    }
}
