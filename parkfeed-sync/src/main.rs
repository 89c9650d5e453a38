//! Refreshes every parkfeed dataset once and exits. Scheduling is left to cron or a
//! similar job runner.

mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use parkfeed_core::{
    fetch::HttpFetcher,
    model::SourceStatus,
    plugin::SourceRegistry,
    ports::DatasetStore,
    service::{IngestService, RunReport},
    store::FileStore,
};
use parkfeed_provider_taipei as taipei;
use reqwest::Client;

use crate::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    // HTTP + service setup
    let client = Client::builder().user_agent(args.user_agent.as_str()).build()?;
    let fetcher = HttpFetcher::new(client).with_timeout(args.timeout());

    let plugins = vec![taipei::plugin(fetcher)];
    let registry = Arc::new(SourceRegistry::new(plugins));
    let file_store = FileStore::new(&args.data_dir);
    log::info!(
        "Refreshing {} sources into {}",
        registry.len(),
        file_store.root().display()
    );
    if registry.is_empty() {
        log::warn!("No sources registered, nothing to refresh");
    }

    let store: Arc<dyn DatasetStore> = Arc::new(file_store);
    let service = IngestService::new(registry, store);

    let reports = run(&service, &args).await;
    let summary = Summary::from_reports(&reports);
    log::info!(
        "Update complete: {} datasets, {} live, {} fallback, {} not persisted",
        summary.datasets,
        summary.live,
        summary.fallback,
        summary.unpersisted
    );

    Ok(())
}

async fn run(service: &IngestService, args: &Args) -> Vec<RunReport> {
    let selected = args.selected_datasets();
    if selected.is_empty() {
        return if args.concurrent {
            service.run_all_concurrent().await
        } else {
            service.run_all().await
        };
    }

    let mut reports = Vec::with_capacity(selected.len());
    for dataset_id in &selected {
        match service.run_dataset(dataset_id).await {
            Some(report) => reports.push(report),
            None => {
                let known: Vec<_> = service
                    .registry()
                    .sources()
                    .iter()
                    .map(|source| source.source().dataset_id.to_string())
                    .collect();
                log::warn!(
                    "No source registered for dataset {dataset_id} (known: {})",
                    known.join(", ")
                );
            }
        }
    }
    reports
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    datasets: usize,
    live: usize,
    fallback: usize,
    unpersisted: usize,
}

impl Summary {
    fn from_reports(reports: &[RunReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            summary.datasets += 1;
            match report.status {
                SourceStatus::Live => summary.live += 1,
                SourceStatus::Fallback => summary.fallback += 1,
            }
            if !report.persisted {
                summary.unpersisted += 1;
            }
            summary
        })
    }
}

#[cfg(test)]
mod tests {
    use parkfeed_core::model::DatasetId;

    use super::*;

    fn report(status: SourceStatus, persisted: bool) -> RunReport {
        RunReport {
            dataset_id: DatasetId("taipei_onstreet".to_owned()),
            status,
            record_count: 3,
            persisted,
        }
    }

    #[test]
    fn summary_counts_statuses() {
        let summary = Summary::from_reports(&[
            report(SourceStatus::Live, true),
            report(SourceStatus::Fallback, true),
            report(SourceStatus::Fallback, false),
        ]);
        assert_eq!(
            summary,
            Summary {
                datasets: 3,
                live: 1,
                fallback: 2,
                unpersisted: 1,
            }
        );
    }

    #[test]
    fn empty_run_summarizes_to_zero() {
        assert_eq!(Summary::from_reports(&[]), Summary::default());
    }
}
