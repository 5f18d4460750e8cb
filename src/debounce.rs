use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Forwards a value only once `delay` has passed without a newer one arriving.
///
/// When the input closes, a pending value is flushed immediately. Values already
/// forwarded are never recalled, so a slow consumer can still act on a term the
/// user has since replaced.
pub fn debounce<T: Send + 'static>(
    mut input: mpsc::Receiver<T>,
    delay: Duration,
) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut pending: Option<(T, Instant)> = None;
        loop {
            match pending.take() {
                None => match input.recv().await {
                    Some(value) => pending = Some((value, Instant::now() + delay)),
                    None => break,
                },
                Some((value, deadline)) => {
                    tokio::select! {
                        next = input.recv() => match next {
                            Some(newer) => pending = Some((newer, Instant::now() + delay)),
                            None => {
                                let _ = tx.send(value).await;
                                break;
                            }
                        },
                        _ = sleep_until(deadline) => {
                            if tx.send(value).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    });
    rx
}
