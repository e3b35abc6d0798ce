//! Blocking filesystem work, moved off the async runtime.

use crate::error::{ClientError, ClientResult};

/// Run `f` on the blocking pool and wait for it.
pub(crate) async fn run<T, F>(f: F) -> ClientResult<T>
where
    F: FnOnce() -> ClientResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?
}
