//! Loop-capture scenario: every task reports the index it was handed

use eyre::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::spawn::{join_indexed, spawn_indexed};

/// Indices reported by the spawned tasks, in completion order
#[derive(Debug, Clone, Serialize)]
pub struct LoopCaptureReport {
    pub tasks: usize,
    pub reported: Vec<usize>,
}

impl LoopCaptureReport {
    /// Each index in `0..tasks` was reported exactly once
    pub fn is_complete(&self) -> bool {
        let mut sorted = self.reported.clone();
        sorted.sort_unstable();
        sorted == (0..self.tasks).collect::<Vec<_>>()
    }
}

/// Spawn `tasks` tasks; each reports the index passed to it by value
pub async fn run(tasks: usize) -> Result<LoopCaptureReport> {
    let set = spawn_indexed(tasks, |index| async move {
        debug!(index, "loop_capture: task reporting");
        index
    });

    let reported = join_indexed(set).await?.into_iter().map(|(_, reported)| reported).collect();
    let report = LoopCaptureReport { tasks, reported };
    info!(complete = report.is_complete(), "Loop-capture scenario finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_five_tasks_each_index_once() {
        let report = run(5).await.unwrap();
        assert_eq!(report.reported.len(), 5);
        assert!(report.is_complete());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_tasks_multi_thread() {
        let report = run(200).await.unwrap();
        assert!(report.is_complete());
    }

    #[test]
    fn test_duplicate_index_is_incomplete() {
        let report = LoopCaptureReport {
            tasks: 3,
            reported: vec![2, 2, 0],
        };
        assert!(!report.is_complete());
    }
}
