use crate::error::AppError;
use std::future::Future;
use tokio::sync::oneshot;

/// Receiving end of one background operation
pub struct OperationHandle<T> {
    name: &'static str,
    receiver: oneshot::Receiver<Result<T, AppError>>,
}

impl<T> OperationHandle<T> {
    /// Waits for the single outcome of the operation.
    ///
    /// A task that panicked, was cancelled, or vanished with its runtime is
    /// reported as [`AppError::Worker`].
    pub async fn outcome(self) -> Result<T, AppError> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::error!("Operation '{}' ended without reporting", self.name);
                Err(AppError::Worker(format!("{} was dropped", self.name)))
            }
        }
    }
}

/// Runs `operation` on its own tokio task.
///
/// The outcome is sent exactly once through the returned handle. Must be
/// called from within a tokio runtime.
pub fn spawn_operation<T, F>(name: &'static str, operation: F) -> OperationHandle<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    log::debug!("Starting operation '{}'", name);

    let task = tokio::spawn(operation);
    tokio::spawn(async move {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                log::error!("Operation '{}' panicked", name);
                Err(AppError::Worker(format!("{} panicked", name)))
            }
            Err(e) => {
                log::error!("Operation '{}' was cancelled: {}", name, e);
                Err(AppError::Worker(format!("{} was cancelled", name)))
            }
        };

        match &outcome {
            Ok(_) => log::debug!("Operation '{}' finished", name),
            Err(e) => log::warn!("Operation '{}' failed: {}", name, e),
        }
        if sender.send(outcome).is_err() {
            log::warn!("Nobody is waiting for operation '{}'", name);
        }
    });

    OperationHandle { name, receiver }
}
