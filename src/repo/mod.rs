/// Repository layer for the in-memory flight history
use crate::domain::FlightRecord;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only history of every fetched record.
///
/// Unbounded unless a capacity is given, in which case the oldest records
/// are evicted first.
#[derive(Clone, Default)]
pub struct HistoryRepo {
    records: Arc<RwLock<VecDeque<FlightRecord>>>,
    capacity: Option<usize>,
}

impl HistoryRepo {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            records: Arc::new(RwLock::new(VecDeque::new())),
            capacity,
        }
    }

    /// Append one fetch worth of records under a single write lock
    pub async fn append(&self, batch: &[FlightRecord]) -> usize {
        let mut records = self.records.write().await;
        records.extend(batch.iter().cloned());
        if let Some(cap) = self.capacity {
            let excess = records.len().saturating_sub(cap);
            records.drain(..excess);
        }
        records.len()
    }

    /// Copy of the whole history, oldest first
    pub async fn snapshot(&self) -> Vec<FlightRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::record;

    #[tokio::test]
    async fn test_append_keeps_duplicates() {
        let repo = HistoryRepo::new(None);
        let batch = vec![record("AE1", "2024-01-01T10:00", None, "Delayed")];

        repo.append(&batch).await;
        let len = repo.append(&batch).await;

        assert_eq!(len, 2);
        assert_eq!(repo.snapshot().await, vec![batch[0].clone(), batch[0].clone()]);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let repo = HistoryRepo::new(Some(3));
        repo.append(&[
            record("AE1", "2024-01-01T10:00", None, ""),
            record("AE2", "2024-01-01T10:00", None, ""),
        ])
        .await;
        repo.append(&[
            record("AE3", "2024-01-01T10:00", None, ""),
            record("AE4", "2024-01-01T10:00", None, ""),
        ])
        .await;

        let numbers: Vec<String> = repo
            .snapshot()
            .await
            .into_iter()
            .map(|r| r.flight_number)
            .collect();
        assert_eq!(numbers, vec!["AE2", "AE3", "AE4"]);
    }

    #[tokio::test]
    async fn test_concurrent_batches_stay_contiguous() {
        let repo = HistoryRepo::new(None);
        let a: Vec<_> = (0..50)
            .map(|i| record(&format!("A{i}"), "2024-01-01T10:00", None, ""))
            .collect();
        let b: Vec<_> = (0..50)
            .map(|i| record(&format!("B{i}"), "2024-01-01T10:00", None, ""))
            .collect();

        let (r1, r2) = (repo.clone(), repo.clone());
        let (a2, b2) = (a.clone(), b.clone());
        let t1 = tokio::spawn(async move { r1.append(&a2).await });
        let t2 = tokio::spawn(async move { r2.append(&b2).await });
        t1.await.unwrap();
        t2.await.unwrap();

        let snapshot = repo.snapshot().await;
        assert_eq!(snapshot.len(), 100);
        let first = snapshot[0].flight_number.chars().next().unwrap();
        assert!(snapshot[..50]
            .iter()
            .all(|r| r.flight_number.starts_with(first)));
    }
}
