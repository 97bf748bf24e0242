//! Registry scenario: a writer and readers sharing one guarded map

use std::sync::Arc;

use eyre::Result;
use serde::Serialize;
use tracing::info;

use crate::registry::GuardedRegistry;

/// What the readers observed
#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    pub key: u64,
    pub value: String,

    /// Read racing the write: either nothing or the full value
    pub racing_read: Option<String>,

    /// Reads started after the write completed
    pub reads: Vec<Option<String>>,
}

impl RegistryReport {
    /// Every read saw either nothing or the complete value, and every read
    /// after the write saw the value
    pub fn is_consistent(&self) -> bool {
        let racing_ok = self.racing_read.as_ref().is_none_or(|v| *v == self.value);
        racing_ok && self.reads.iter().all(|r| r.as_deref() == Some(self.value.as_str()))
    }
}

/// Race one writer against one reader, then read back from `readers` tasks
pub async fn run(key: u64, value: &str, readers: usize) -> Result<RegistryReport> {
    let registry = Arc::new(GuardedRegistry::new());

    let writer = {
        let registry = registry.clone();
        let value = value.to_string();
        tokio::spawn(async move { registry.set(key, value) })
    };
    let racer = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.get(&key) })
    };
    writer.await?;
    let racing_read = racer.await?;

    let mut handles = Vec::with_capacity(readers);
    for _ in 0..readers {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move { registry.get(&key) }));
    }
    let mut reads = Vec::with_capacity(readers);
    for handle in handles {
        reads.push(handle.await?);
    }

    let report = RegistryReport {
        key,
        value: value.to_string(),
        racing_read,
        reads,
    };
    info!(consistent = report.is_consistent(), "Registry scenario finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_two_readers_see_value() {
        let report = run(1, "A", 2).await.unwrap();
        assert_eq!(report.reads, vec![Some("A".to_string()), Some("A".to_string())]);
        assert!(report.is_consistent());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_read_never_torn() {
        for _ in 0..50 {
            let report = run(1, "Liu Bei", 1).await.unwrap();
            assert!(report.is_consistent(), "inconsistent report: {:?}", report);
        }
    }

    #[test]
    fn test_inconsistent_report_detected() {
        let report = RegistryReport {
            key: 1,
            value: "A".to_string(),
            racing_read: Some("B".to_string()),
            reads: vec![Some("A".to_string())],
        };
        assert!(!report.is_consistent());
    }
}
