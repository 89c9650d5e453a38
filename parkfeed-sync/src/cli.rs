use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use parkfeed_core::model::DatasetId;

/// Refresh parking availability datasets from every registered provider.
#[derive(Debug, Parser)]
#[command(name = "parkfeed-sync", version)]
pub(crate) struct Args {
    /// Directory receiving `<dataset>.json` and `<dataset>.fallback.json`.
    #[arg(long, env = "PARKFEED_DATA_DIR", default_value = "data")]
    pub(crate) data_dir: PathBuf,

    /// Per-request timeout for provider endpoints, in seconds.
    #[arg(long, env = "PARKFEED_TIMEOUT_SECS", default_value_t = 15)]
    pub(crate) timeout_secs: u64,

    /// Refresh all sources concurrently instead of one after another.
    #[arg(long, env = "PARKFEED_CONCURRENT")]
    pub(crate) concurrent: bool,

    /// User agent sent to providers.
    #[arg(long, default_value = concat!("parkfeed/", env!("CARGO_PKG_VERSION")))]
    pub(crate) user_agent: String,

    /// Only refresh the given dataset (repeatable), e.g. `taipei_onstreet`.
    #[arg(long = "dataset", value_name = "ID")]
    pub(crate) datasets: Vec<String>,
}

impl Args {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn selected_datasets(&self) -> Vec<DatasetId> {
        self.datasets
            .iter()
            .map(|id| DatasetId(id.trim().to_owned()))
            .collect()
    }
}
