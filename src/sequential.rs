//! Ordered async iteration.

use std::future::Future;

/// Apply `f` to each item in order, awaiting each call before starting the
/// next one, and collect the results in input order.
///
/// Stops at the first error; items after it are never started.
pub async fn map_sequential<I, F, Fut, T, E>(items: I, mut f: F) -> Result<Vec<T>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let iter = items.into_iter();
    let mut outputs = Vec::with_capacity(iter.size_hint().0);
    for item in iter {
        outputs.push(f(item).await?);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_preserves_order() {
        let result: Result<Vec<usize>, ()> =
            map_sequential(vec![3, 1, 2], |n| async move { Ok(n * 10) }).await;
        assert_eq!(result, Ok(vec![30, 10, 20]));
    }

    #[tokio::test]
    async fn test_no_overlap() {
        let in_flight = AtomicUsize::new(0);
        let log = Mutex::new(Vec::new());

        let result: Result<Vec<()>, ()> = map_sequential(0..4u64, |n| {
            let in_flight = &in_flight;
            let log = &log;
            async move {
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                log.lock().unwrap().push(format!("start {}", n));
                // Later items sleep less, so any overlap would reorder the log.
                tokio::time::sleep(Duration::from_millis(8 - 2 * n)).await;
                log.lock().unwrap().push(format!("end {}", n));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        let log = log.into_inner().unwrap();
        assert_eq!(
            log,
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2", "start 3", "end 3"]
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_error() {
        let started = AtomicUsize::new(0);
        let result = map_sequential(vec!["a", "bad", "c"], |s| {
            started.fetch_add(1, Ordering::SeqCst);
            async move {
                if s == "bad" {
                    Err(format!("failed on {}", s))
                } else {
                    Ok(s.len())
                }
            }
        })
        .await;

        assert_eq!(result, Err("failed on bad".to_string()));
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result: Result<Vec<u8>, ()> =
            map_sequential(Vec::<u8>::new(), |n| async move { Ok(n) }).await;
        assert_eq!(result, Ok(vec![]));
    }
}
