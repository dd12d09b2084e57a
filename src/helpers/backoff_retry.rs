use std::fmt::Display;
use std::time::Duration;

use backoff::{retry_notify, Error, ExponentialBackoff};

/// Retry `fn_to_try` with exponential backoff until it succeeds or returns a permanent error.
///
/// Waits between attempts are capped at `max_interval`. There is no overall deadline.
pub fn backoff_retry<F, T, E>(fn_to_try: F, max_interval: Duration) -> Result<T, Error<E>>
where
    F: FnMut() -> Result<T, Error<E>>,
    E: Display,
{
    let notify = |err, dur: Duration| {
        log::error!(
            "Temporary error, retrying in {:.1}s: {}",
            dur.as_secs_f32(),
            err
        );
    };

    let policy = ExponentialBackoff {
        initial_interval: max_interval.min(Duration::from_millis(500)),
        max_interval,
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    };

    retry_notify(policy, fn_to_try, notify)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_until_success() {
        let mut attempts = 0;
        let res: Result<u8, Error<String>> = backoff_retry(
            || {
                attempts += 1;
                if attempts < 3 {
                    Err(Error::transient("not yet".to_string()))
                } else {
                    Ok(7)
                }
            },
            Duration::from_millis(5),
        );
        assert_eq!(res.unwrap(), 7);
        assert_eq!(attempts, 3);
    }

    #[test]
    fn permanent_error_stops_retrying() {
        let mut attempts = 0;
        let res: Result<u8, Error<String>> = backoff_retry(
            || {
                attempts += 1;
                Err(Error::permanent("stop".to_string()))
            },
            Duration::from_millis(5),
        );
        assert!(matches!(res, Err(Error::Permanent(_))));
        assert_eq!(attempts, 1);
    }
}
