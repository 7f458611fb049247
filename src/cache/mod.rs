/// On-disk cache of the last fetched arrival board
use crate::domain::{FlightRecord, FlightRecordSet};
use crate::errors::{ApiError, ApiResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Column order of the cache file, matching the serialized `FlightRecord`
const HEADER: [&str; 12] = [
    "FlightNumber",
    "AirlineID",
    "DepartureAirportID",
    "ArrivalAirportID",
    "FlightDate",
    "ScheduleArrivalTime",
    "ActualArrivalTime",
    "ArrivalRemark",
    "DepartureLatitude",
    "DepartureLongitude",
    "ArrivalLatitude",
    "ArrivalLongitude",
];

/// Single-slot CSV cache at a fixed path
#[derive(Clone, Debug)]
pub struct FileCache {
    path: PathBuf,
    ttl: Option<Duration>,
}

impl FileCache {
    pub fn new(path: PathBuf, ttl: Option<Duration>) -> Self {
        Self { path, ttl }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached record set, if the file exists and is still fresh
    pub async fn load(&self) -> ApiResult<Option<FlightRecordSet>> {
        let cache = self.clone();
        tokio::task::spawn_blocking(move || cache.load_blocking()).await?
    }

    /// Replace the cached record set
    pub async fn store(&self, records: &[FlightRecord]) -> ApiResult<()> {
        let cache = self.clone();
        let records = records.to_vec();
        tokio::task::spawn_blocking(move || cache.store_blocking(&records)).await?
    }

    fn load_blocking(&self) -> ApiResult<Option<FlightRecordSet>> {
        if !self.path.exists() {
            return Ok(None);
        }

        if let Some(ttl) = self.ttl {
            let modified = std::fs::metadata(&self.path)?.modified()?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO);
            if age > ttl {
                warn!(
                    "Cache {} is {}s old (ttl {}s), ignoring",
                    self.path.display(),
                    age.as_secs(),
                    ttl.as_secs()
                );
                return Ok(None);
            }
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize::<FlightRecord>()
            .collect::<Result<FlightRecordSet, csv::Error>>()?;
        debug!(
            "Loaded {} records from cache {}",
            records.len(),
            self.path.display()
        );
        Ok(Some(records))
    }

    /// Write a sibling temp file, then rename it over the cache path
    fn store_blocking(&self, records: &[FlightRecord]) -> ApiResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            // serialize() only emits headers alongside the first row
            if records.is_empty() {
                writer.write_record(HEADER)?;
            }
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.persist(&self.path)
            .map_err(|e| ApiError::CacheIo(e.error))?;

        debug!(
            "Cached {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::record;

    fn sample() -> FlightRecordSet {
        let mut with_coords = record(
            "B78690",
            "2024-01-01T11:00",
            Some("2024-01-01T11:20"),
            "Delayed",
        );
        with_coords.departure_latitude = Some(23.5697);
        with_coords.departure_longitude = Some(119.63);
        with_coords.flight_date = Some("2024-01-01".to_string());
        vec![
            record("AE7931", "2024-01-01T10:00", None, "On Time"),
            with_coords,
        ]
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache.csv"), None);
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_writes_header_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");
        let cache = FileCache::new(path.clone(), None);

        cache.store(&sample()).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("FlightNumber,AirlineID,DepartureAirportID"));
        assert_eq!(text.lines().count(), 3);

        assert_eq!(cache.load().await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn test_store_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache.csv"), None);

        cache.store(&sample()).await.unwrap();
        cache.store(&sample()[..1]).await.unwrap();

        assert_eq!(cache.load().await.unwrap().unwrap().len(), 1);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_ttl_expired_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");
        FileCache::new(path.clone(), None).store(&sample()).await.unwrap();

        let fresh = FileCache::new(path.clone(), Some(Duration::from_secs(3600)));
        assert!(fresh.load().await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let expired = FileCache::new(path, Some(Duration::ZERO));
        assert!(expired.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");
        let cache = FileCache::new(path, None);
        cache.store(&sample()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_store_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");
        let cache = FileCache::new(path.clone(), None);

        cache.store(&[]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text.trim_end(), HEADER.join(","));
        assert_eq!(cache.load().await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_header_matches_serialized_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");
        FileCache::new(path.clone(), None)
            .store(&sample())
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), HEADER.join(","));
    }
}
