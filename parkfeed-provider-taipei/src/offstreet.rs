//! Lots and garages from `TCMSV_alldata.json`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use parkfeed_core::{
    fetch::HttpFetcher,
    model::{ParkingKind, ParkingRecord, SourceMeta, now_utc},
    normalize::LooseNumber,
    ports::{SourcePort, UpstreamError},
};

use crate::source_meta;

/// Default endpoint for off-street facilities.
pub const OFFSTREET_URL: &str =
    "https://tcgbusfs.blob.core.windows.net/blobtcmsv/TCMSV_alldata.json";

#[derive(Debug, Deserialize)]
struct OffStreetResponse {
    data: OffStreetData,
}

#[derive(Debug, Deserialize)]
struct OffStreetData {
    park: Vec<OffStreetFacility>,
}

/// Single facility from `data.park`. Coordinates use the feed's Chinese keys.
#[derive(Debug, Deserialize)]
struct OffStreetFacility {
    #[serde(rename = "parkName")]
    park_name: String,
    #[serde(rename = "纬度")]
    latitude: LooseNumber,
    #[serde(rename = "经度")]
    longitude: LooseNumber,
    #[serde(rename = "totalCar")]
    total_car: LooseNumber,
    #[serde(rename = "availableCar")]
    available_car: LooseNumber,
    #[serde(default)]
    address: Option<String>,
}

/// Off-street facility source for Taipei.
pub struct TaipeiOffStreetSource {
    fetcher: HttpFetcher,
    url: String,
    meta: SourceMeta,
}

impl TaipeiOffStreetSource {
    /// Create a source reading [`OFFSTREET_URL`] through the given fetcher.
    #[must_use]
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            url: OFFSTREET_URL.to_owned(),
            meta: source_meta(ParkingKind::OffStreet),
        }
    }

    /// Read from a different endpoint serving the same schema.
    #[must_use]
    pub fn with_url<U: Into<String>>(mut self, url: U) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl SourcePort for TaipeiOffStreetSource {
    fn source(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch_and_normalize(&self) -> Result<Vec<ParkingRecord>, UpstreamError> {
        let response = self.fetcher.get_json::<OffStreetResponse>(&self.url).await?;
        log::debug!(
            "{}: received {} facilities",
            self.meta.dataset_id,
            response.data.park.len()
        );
        normalize(&self.meta, response, now_utc())
    }
}

fn normalize(
    meta: &SourceMeta,
    response: OffStreetResponse,
    observed_at: DateTime<Utc>,
) -> Result<Vec<ParkingRecord>, UpstreamError> {
    response
        .data
        .park
        .into_iter()
        .map(|facility| {
            let lat = facility.latitude.to_f64("纬度")?;
            let lng = facility.longitude.to_f64("经度")?;
            let total = facility.total_car.to_count("totalCar")?;
            let available = facility.available_car.to_count("availableCar")?;

            Ok(
                ParkingRecord::live(meta, facility.park_name, lat, lng, observed_at)
                    .with_spaces(total, available)
                    .with_address(facility.address.unwrap_or_default()),
            )
        })
        .collect()
}
