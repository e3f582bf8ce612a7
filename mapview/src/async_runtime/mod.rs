use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Spawns a future on the given runtime, or on the runtime of the current context.
///
/// Returns `None` if there is no runtime to run the future on.
pub(crate) fn spawn<T>(handle: Option<&Handle>, future: T) -> Option<JoinHandle<T::Output>>
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    match handle {
        Some(handle) => Some(handle.spawn(future)),
        None => match Handle::try_current() {
            Ok(handle) => Some(handle.spawn(future)),
            Err(_) => {
                log::warn!("No async runtime available, the task is dropped");
                None
            }
        },
    }
}
