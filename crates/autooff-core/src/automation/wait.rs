use std::future::Future;
use std::time::Duration;

/// Which side of a race finished first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Observed(T),
    TimedOut,
}

/// Race a condition against a timeout.
///
/// `condition` is polled every `poll` until it reports a signal; the whole
/// race is bounded by `timeout`. Dropping the returned future cancels it.
pub async fn until<T, F, Fut>(
    timeout: Duration,
    poll: Duration,
    mut condition: F,
) -> WaitOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let poll = poll.max(Duration::from_millis(1));
    let watch = async {
        loop {
            if let Some(signal) = condition().await {
                return signal;
            }
            tokio::time::sleep(poll).await;
        }
    };

    match tokio::time::timeout(timeout, watch).await {
        Ok(signal) => WaitOutcome::Observed(signal),
        Err(_) => WaitOutcome::TimedOut,
    }
}
