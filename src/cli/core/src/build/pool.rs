/* src/cli/core/src/build/pool.rs */

// Bounded worker pool for per-entry build and render calls.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run `job` over every item with at most `workers` in flight. Results come
/// back in input order. A panicking job is reported through `on_panic`.
pub(crate) async fn run_bounded<T, R, F, Fut>(
  items: Vec<T>,
  workers: usize,
  job: F,
  on_panic: impl Fn(String) -> R,
) -> Vec<R>
where
  T: Send + 'static,
  R: Send + 'static,
  F: Fn(T) -> Fut,
  Fut: Future<Output = R> + Send + 'static,
{
  let semaphore = Arc::new(Semaphore::new(workers.max(1)));
  let mut set = JoinSet::new();
  let total = items.len();
  for (index, item) in items.into_iter().enumerate() {
    let semaphore = semaphore.clone();
    let fut = job(item);
    set.spawn(async move {
      // never closed
      let _permit = semaphore.acquire_owned().await.ok();
      (index, fut.await)
    });
  }

  let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
  let mut panics = Vec::new();
  while let Some(joined) = set.join_next().await {
    match joined {
      Ok((index, result)) => slots[index] = Some(result),
      Err(e) => panics.push(e.to_string()),
    }
  }
  let mut panics = panics.into_iter();
  slots
    .into_iter()
    .map(|slot| match slot {
      Some(result) => result,
      None => on_panic(panics.next().unwrap_or_else(|| "worker task failed".to_string())),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn keeps_input_order_and_bounds_concurrency() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let results = run_bounded(
      (0..8u64).collect(),
      2,
      |n| {
        let active = active.clone();
        let peak = peak.clone();
        async move {
          let now = active.fetch_add(1, Ordering::SeqCst) + 1;
          peak.fetch_max(now, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(10 * (8 - n))).await;
          active.fetch_sub(1, Ordering::SeqCst);
          n * 10
        }
      },
      |_| 0,
    )
    .await;
    assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    assert!(peak.load(Ordering::SeqCst) <= 2);
  }
}
