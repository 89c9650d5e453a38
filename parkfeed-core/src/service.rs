//! Ingestion pipeline: fetch and normalize, fall back on failure, always persist.

use std::sync::Arc;

use futures::future::join_all;

use crate::model::{DatasetId, DatasetPayload, SourceStatus};
use crate::plugin::SourceRegistry;
use crate::ports::{DatasetStore, SourcePort};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of one pipeline run for one source.
pub struct RunReport {
    /// Dataset that was written.
    pub dataset_id: DatasetId,
    /// `Live` when the upstream fetch succeeded, `Fallback` otherwise.
    pub status: SourceStatus,
    /// Number of records in the written payload.
    pub record_count: usize,
    /// Whether the store accepted the payload.
    pub persisted: bool,
}

/// Runs every registered source through the pipeline.
pub struct IngestService {
    registry: Arc<SourceRegistry>,
    store: Arc<dyn DatasetStore>,
}

impl IngestService {
    /// Create a new service bound to the provided registry and store.
    #[must_use]
    pub fn new(registry: Arc<SourceRegistry>, store: Arc<dyn DatasetStore>) -> Self {
        Self { registry, store }
    }

    /// Registry the service draws sources from.
    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Run one source: fetch and normalize, degrade to the fallback copy on any upstream
    /// failure, then write the payload. Never fails; a storage error is logged and
    /// reported through [`RunReport::persisted`].
    pub async fn run_source(&self, source: &dyn SourcePort) -> RunReport {
        let dataset_id = &source.source().dataset_id;

        let (records, status) = match source.fetch_and_normalize().await {
            Ok(records) => {
                let over_capacity = records
                    .iter()
                    .filter(|record| record.is_over_capacity())
                    .count();
                if over_capacity > 0 {
                    log::debug!(
                        "{dataset_id}: {over_capacity} records report more available than total spaces"
                    );
                }
                (records, SourceStatus::Live)
            }
            Err(err) => {
                log::warn!("{dataset_id}: upstream failed, serving fallback copy: {err}");
                (self.store.load_fallback(dataset_id), SourceStatus::Fallback)
            }
        };

        let payload = DatasetPayload::new(dataset_id.clone(), records);

        let persisted = match self.store.write(dataset_id, &payload) {
            Ok(()) => true,
            Err(err) => {
                log::error!("{dataset_id}: failed to persist dataset: {err}");
                false
            }
        };

        log::info!(
            "{dataset_id}: wrote {} {status} records",
            payload.records.len()
        );

        RunReport {
            dataset_id: payload.dataset_id,
            status,
            record_count: payload.records.len(),
            persisted,
        }
    }

    /// Run the source feeding `dataset_id`, `None` when no such source is registered.
    pub async fn run_dataset(&self, dataset_id: &DatasetId) -> Option<RunReport> {
        let source = Arc::clone(self.registry.source(dataset_id)?);
        Some(self.run_source(source.as_ref()).await)
    }

    /// Run every source one after another, in registration order.
    pub async fn run_all(&self) -> Vec<RunReport> {
        let mut reports = Vec::with_capacity(self.registry.len());
        for source in self.registry.sources() {
            reports.push(self.run_source(source.as_ref()).await);
        }
        reports
    }

    /// Run every source concurrently. Reports keep registration order.
    pub async fn run_all_concurrent(&self) -> Vec<RunReport> {
        join_all(
            self.registry
                .sources()
                .iter()
                .map(|source| self.run_source(source.as_ref())),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::model::{CityId, CityMeta, ParkingKind, ParkingRecord, SourceMeta, now_utc};
    use crate::plugin::CityPlugin;
    use crate::ports::UpstreamError;
    use crate::store::{FileStore, MemoryStore};

    struct StubSource {
        meta: SourceMeta,
        names: Option<Vec<&'static str>>,
    }

    impl StubSource {
        fn live(kind: ParkingKind, names: Vec<&'static str>) -> Self {
            Self {
                meta: meta(kind),
                names: Some(names),
            }
        }

        fn failing(kind: ParkingKind) -> Self {
            Self {
                meta: meta(kind),
                names: None,
            }
        }
    }

    #[async_trait]
    impl SourcePort for StubSource {
        fn source(&self) -> &SourceMeta {
            &self.meta
        }

        async fn fetch_and_normalize(&self) -> Result<Vec<ParkingRecord>, UpstreamError> {
            let names = self.names.as_ref().ok_or_else(|| UpstreamError::InvalidField {
                field: "availableCar",
                value: "n/a".to_owned(),
            })?;
            let observed = now_utc();
            Ok(names
                .iter()
                .map(|name| {
                    ParkingRecord::live(&self.meta, *name, 25.03, 121.56, observed)
                        .with_spaces(None, Some(7))
                })
                .collect())
        }
    }

    fn meta(kind: ParkingKind) -> SourceMeta {
        SourceMeta::new(
            CityMeta {
                id: CityId("taipei".to_owned()),
                name: "Taipei".to_owned(),
            },
            kind,
        )
    }

    fn service(sources: Vec<StubSource>, store: Arc<dyn DatasetStore>) -> IngestService {
        let plugin = CityPlugin {
            meta: meta(ParkingKind::OnStreet).city,
            sources: sources
                .into_iter()
                .map(|source| Arc::new(source) as Arc<dyn SourcePort>)
                .collect(),
        };
        IngestService::new(Arc::new(SourceRegistry::new(vec![plugin])), store)
    }

    #[tokio::test]
    async fn live_run_persists_live_records() {
        let store = Arc::new(MemoryStore::new());
        let ingest = service(
            vec![StubSource::live(ParkingKind::OnStreet, vec!["A1", "A2"])],
            Arc::clone(&store) as Arc<dyn DatasetStore>,
        );

        let started = now_utc();
        let reports = ingest.run_all().await;
        let finished = now_utc();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, SourceStatus::Live);
        assert_eq!(reports[0].record_count, 2);
        assert!(reports[0].persisted);

        let written = store.primary(&reports[0].dataset_id).unwrap();
        assert!(written.records.iter().all(|record| {
            record.source_status == SourceStatus::Live
                && record.last_update_utc >= started
                && record.last_update_utc <= finished
        }));
    }

    #[tokio::test]
    async fn failed_fetch_serves_previous_fallback() {
        let store = Arc::new(MemoryStore::new());
        let previous = StubSource::live(ParkingKind::OffStreet, vec!["P1", "P2"])
            .fetch_and_normalize()
            .await
            .unwrap();
        let dataset_id = meta(ParkingKind::OffStreet).dataset_id;
        store
            .seed_fallback(DatasetPayload::new(dataset_id.clone(), previous.clone()))
            .unwrap();

        let ingest = service(
            vec![StubSource::failing(ParkingKind::OffStreet)],
            Arc::clone(&store) as Arc<dyn DatasetStore>,
        );
        let report = ingest.run_dataset(&dataset_id).await.unwrap();

        assert_eq!(report.status, SourceStatus::Fallback);
        let written = store.primary(&dataset_id).unwrap();
        let expected: Vec<_> = previous.into_iter().map(ParkingRecord::into_fallback).collect();
        assert_eq!(written.records, expected);
    }

    #[tokio::test]
    async fn failed_fetch_without_fallback_writes_empty_dataset() {
        let store = Arc::new(MemoryStore::new());
        let ingest = service(
            vec![StubSource::failing(ParkingKind::OnStreet)],
            Arc::clone(&store) as Arc<dyn DatasetStore>,
        );

        let reports = ingest.run_all().await;

        assert_eq!(reports[0].record_count, 0);
        assert!(reports[0].persisted);
        let written = store.primary(&reports[0].dataset_id).unwrap();
        assert!(written.records.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        let ingest = service(
            vec![StubSource::live(ParkingKind::OnStreet, vec!["A1"])],
            Arc::new(FileStore::new(&blocker)),
        );

        let reports = ingest.run_all().await;

        assert_eq!(reports[0].status, SourceStatus::Live);
        assert!(!reports[0].persisted);
    }

    #[tokio::test]
    async fn fallback_survives_consecutive_failures_on_disk() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn DatasetStore> = Arc::new(FileStore::new(dir.path()));

        let live = service(
            vec![StubSource::live(ParkingKind::OnStreet, vec!["A1"])],
            Arc::clone(&store),
        );
        live.run_all().await;

        let down = service(vec![StubSource::failing(ParkingKind::OnStreet)], Arc::clone(&store));
        let first = down.run_all().await;
        let second = down.run_all().await;

        assert_eq!(first, second);
        assert_eq!(second[0].status, SourceStatus::Fallback);
        assert_eq!(second[0].record_count, 1);
        let records = store.load_fallback(&second[0].dataset_id);
        assert_eq!(records[0].name, "A1");
    }

    #[tokio::test]
    async fn concurrent_run_matches_sequential_order() {
        let store = Arc::new(MemoryStore::new());
        let ingest = service(
            vec![
                StubSource::live(ParkingKind::OnStreet, vec!["A1"]),
                StubSource::failing(ParkingKind::OffStreet),
            ],
            Arc::clone(&store) as Arc<dyn DatasetStore>,
        );

        let reports = ingest.run_all_concurrent().await;

        let ids: Vec<_> = reports.iter().map(|report| report.dataset_id.as_str()).collect();
        assert_eq!(ids, ["taipei_onstreet", "taipei_offstreet"]);
        assert_eq!(reports[0].status, SourceStatus::Live);
        assert_eq!(reports[1].status, SourceStatus::Fallback);
        assert!(store.primary(&reports[1].dataset_id).is_some());
    }

    #[tokio::test]
    async fn unknown_dataset_is_skipped() {
        let ingest = service(Vec::new(), Arc::new(MemoryStore::new()));
        assert!(ingest.registry().is_empty());
        assert!(
            ingest
                .run_dataset(&DatasetId("nowhere_onstreet".to_owned()))
                .await
                .is_none()
        );
    }
}
