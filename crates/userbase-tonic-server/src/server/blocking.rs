//! Runs synchronous [`RecordStore`] calls off the async workers.
//!
//! A store call that panics is reported as [`Error::Internal`] instead of
//! tearing down the call, so every call shape can still answer with a
//! failure reply or an explicit stream error.

use std::{any::Any, sync::Arc};
use userbase::RecordStore;
use userbase_tonic_core::Error;

pub async fn with_store<S, T, F>(store: &Arc<S>, f: F) -> Result<T, Error>
where
    S: RecordStore,
    T: Send + 'static,
    F: FnOnce(&S) -> userbase::Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    match tokio::task::spawn_blocking(move || f(&store)).await {
        Ok(result) => result.map_err(Error::from),
        Err(e) if e.is_panic() => Err(Error::Internal(format!(
            "store call panicked: {}",
            panic_message(e.into_panic().as_ref())
        ))),
        Err(e) => Err(Error::Internal(format!("store call aborted: {e}"))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
