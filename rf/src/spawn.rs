//! Spawning tasks that each own their index
//!
//! The task body receives the loop index as a by-value argument. Nothing in
//! the spawned future refers back to the loop's control variable.

use std::future::Future;

use tokio::task::{JoinError, JoinSet};
use tracing::debug;

/// Spawn `n` tasks, calling `task(i)` with `i` in `0..n`
///
/// Each result comes back tagged with the index the task was given.
pub fn spawn_indexed<F, Fut, R>(n: usize, task: F) -> JoinSet<(usize, R)>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    debug!(n, "spawn_indexed: called");
    let mut set = JoinSet::new();
    for index in 0..n {
        let fut = task(index);
        set.spawn(async move { (index, fut.await) });
    }
    set
}

/// Wait for every task in the set, in completion order
pub async fn join_indexed<R: Send + 'static>(mut set: JoinSet<(usize, R)>) -> Result<Vec<(usize, R)>, JoinError> {
    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        results.push(joined?);
    }
    debug!(count = results.len(), "join_indexed: all tasks joined");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_each_index_reported_once() {
        let set = spawn_indexed(5, |i| async move { i * 10 });
        let mut results = join_indexed(set).await.unwrap();
        results.sort_unstable();
        assert_eq!(results, vec![(0, 0), (1, 10), (2, 20), (3, 30), (4, 40)]);
    }

    #[tokio::test]
    async fn test_zero_tasks() {
        let set = spawn_indexed(0, |i| async move { i });
        assert!(join_indexed(set).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_task_surfaces_join_error() {
        let set = spawn_indexed(2, |i| async move {
            if i == 1 {
                panic!("task {} failed", i);
            }
            i
        });
        assert!(join_indexed(set).await.is_err());
    }
}
