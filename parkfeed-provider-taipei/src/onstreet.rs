//! Curbside parking segments from `TCMSV_allavailable.json`.

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

/// Default endpoint for on-street availability.
pub const ONSTREET_URL: &str =
    "https://tcgbusfs.blob.core.windows.net/blobtcmsv/TCMSV_allavailable.json";

#[derive(Debug, Deserialize)]
struct OnStreetResponse {
    data: OnStreetData,
}

#[derive(Debug, Deserialize)]
struct OnStreetData {
    car: Vec<OnStreetArea>,
}

/// Single area entry from `data.car`. The feed reports free units only, no capacity.
#[derive(Debug, Deserialize)]
struct OnStreetArea {
    #[serde(rename = "areaName")]
    area_name: String,
    latitude: LooseNumber,
    longitude: LooseNumber,
    #[serde(rename = "availableCar")]
    available_car: LooseNumber,
}

/// On-street availability source for Taipei.
pub struct TaipeiOnStreetSource {
    fetcher: HttpFetcher,
    url: String,
    meta: SourceMeta,
}

impl TaipeiOnStreetSource {
    /// Create a source reading [`ONSTREET_URL`] through the given fetcher.
    #[must_use]
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            url: ONSTREET_URL.to_owned(),
            meta: source_meta(ParkingKind::OnStreet),
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
impl SourcePort for TaipeiOnStreetSource {
    fn source(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch_and_normalize(&self) -> Result<Vec<ParkingRecord>, UpstreamError> {
        let response = self.fetcher.get_json::<OnStreetResponse>(&self.url).await?;
        log::debug!("{}: received {} areas", self.meta.dataset_id, response.data.car.len());
        normalize(&self.meta, response, now_utc())
    }
}

fn normalize(
    meta: &SourceMeta,
    response: OnStreetResponse,
    observed_at: DateTime<Utc>,
) -> Result<Vec<ParkingRecord>, UpstreamError> {
    response
        .data
        .car
        .into_iter()
        .map(|area| {
            let lat = area.latitude.to_f64("latitude")?;
            let lng = area.longitude.to_f64("longitude")?;
            let available = area.available_car.to_count("availableCar")?;

            Ok(ParkingRecord::live(meta, area.area_name, lat, lng, observed_at)
                .with_spaces(None, available))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use parkfeed_core::model::SourceStatus;

    use super::*;

    fn parse(raw: &str) -> Result<Vec<ParkingRecord>, UpstreamError> {
        let response: OnStreetResponse = serde_json::from_str(raw)?;
        normalize(&source_meta(ParkingKind::OnStreet), response, now_utc())
    }

    #[test]
    fn maps_area_into_record_without_capacity() {
        let records = parse(
            r#"{"data":{"car":[{"areaName":"A1","latitude":"25.03","longitude":"121.56","availableCar":"7"}]}}"#,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind, ParkingKind::OnStreet);
        assert_eq!(record.city, "Taipei");
        assert_eq!(record.name, "A1");
        assert!((record.lat - 25.03).abs() < f64::EPSILON);
        assert!((record.lng - 121.56).abs() < f64::EPSILON);
        assert_eq!(record.total_spaces, None);
        assert_eq!(record.available_spaces, Some(7));
        assert_eq!(record.address, "");
        assert_eq!(record.source_status, SourceStatus::Live);
    }

    #[test]
    fn keeps_emission_order() {
        let records = parse(
            r#"{"data":{"car":[
                {"areaName":"B","latitude":25.1,"longitude":121.5,"availableCar":0},
                {"areaName":"A","latitude":25.2,"longitude":121.6,"availableCar":-9}
            ]}}"#,
        )
        .unwrap();

        let names: Vec<_> = records.iter().map(|record| record.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(records[0].available_spaces, Some(0));
        assert_eq!(records[1].available_spaces, None);
    }

    #[test]
    fn bad_coordinate_fails_the_whole_batch() {
        let result = parse(
            r#"{"data":{"car":[
                {"areaName":"A1","latitude":"25.03","longitude":"121.56","availableCar":"7"},
                {"areaName":"A2","latitude":"","longitude":"121.56","availableCar":"7"}
            ]}}"#,
        );
        assert!(matches!(
            result,
            Err(UpstreamError::InvalidField { field: "latitude", .. })
        ));
    }

    #[test]
    fn missing_array_is_a_decode_error() {
        assert!(matches!(
            parse(r#"{"data":{"park":[]}}"#),
            Err(UpstreamError::Decode(_))
        ));
    }
}
