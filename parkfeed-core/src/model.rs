//! Domain data structures for cities, parking records, and persisted datasets.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Built-in cities supported by the application.
pub enum Cities {
    /// Taipei, Taiwan.
    Taipei,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a city known to parkfeed.
pub struct CityId(pub String);

impl fmt::Display for Cities {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Cities::Taipei => "taipei",
        };
        write!(formatter, "{slug}")
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<Cities> for CityId {
    fn from(city: Cities) -> Self {
        CityId(city.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a city and the name written into its records.
pub struct CityMeta {
    /// Unique identifier.
    pub id: CityId,
    /// Display name, stored in every record's `city` field.
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Kind of parking a record describes.
pub enum ParkingKind {
    /// Curbside segments, usually reported without a fixed capacity.
    OnStreet,
    /// Lots and garages reporting both capacity and availability.
    OffStreet,
}

impl fmt::Display for ParkingKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            ParkingKind::OnStreet => "onstreet",
            ParkingKind::OffStreet => "offstreet",
        };
        formatter.write_str(slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Where a record's values came from in the current run.
pub enum SourceStatus {
    /// Derived from a fresh fetch in this run.
    Live,
    /// Recovered from the last persisted fallback copy.
    Fallback,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            SourceStatus::Live => "live",
            SourceStatus::Fallback => "fallback",
        };
        formatter.write_str(slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Key naming one persisted dataset, e.g. `taipei_onstreet`.
pub struct DatasetId(pub String);

impl DatasetId {
    /// Conventional id for a city's dataset of the given kind.
    #[must_use]
    pub fn for_source(city: &CityId, kind: ParkingKind) -> Self {
        DatasetId(format!("{city}_{kind}"))
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
/// Static description of one upstream source.
pub struct SourceMeta {
    /// Dataset the source's records are persisted under.
    pub dataset_id: DatasetId,
    /// City the source reports on.
    pub city: CityMeta,
    /// Kind of parking the source reports.
    pub kind: ParkingKind,
}

impl SourceMeta {
    /// Describe a source, deriving its dataset id from the city and kind.
    #[must_use]
    pub fn new(city: CityMeta, kind: ParkingKind) -> Self {
        Self {
            dataset_id: DatasetId::for_source(&city.id, kind),
            city,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One normalized parking facility or segment observation.
pub struct ParkingRecord {
    /// Display name of the municipality.
    pub city: String,
    /// Parking kind.
    #[serde(rename = "type")]
    pub kind: ParkingKind,
    /// Display name of the facility or segment.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Capacity, absent when the provider does not report it.
    #[serde(default, deserialize_with = "stored_count")]
    pub total_spaces: Option<u32>,
    /// Free spaces, absent when the provider does not report it.
    #[serde(default, deserialize_with = "stored_count")]
    pub available_spaces: Option<u32>,
    /// Street address, may be empty.
    #[serde(default)]
    pub address: String,
    /// When the record was normalized.
    #[serde(with = "utc_seconds")]
    pub last_update_utc: DateTime<Utc>,
    /// Live or recovered from the fallback copy.
    pub source_status: SourceStatus,
}

impl ParkingRecord {
    /// Start a live record for the given source, without space counts or address.
    #[must_use]
    pub fn live<N: Into<String>>(
        source: &SourceMeta,
        name: N,
        lat: f64,
        lng: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            city: source.city.name.clone(),
            kind: source.kind,
            name: name.into(),
            lat,
            lng,
            total_spaces: None,
            available_spaces: None,
            address: String::new(),
            last_update_utc: observed_at,
            source_status: SourceStatus::Live,
        }
    }

    /// Set capacity and availability.
    #[must_use]
    pub fn with_spaces(mut self, total: Option<u32>, available: Option<u32>) -> Self {
        self.total_spaces = total;
        self.available_spaces = available;
        self
    }

    /// Set the street address.
    #[must_use]
    pub fn with_address<A: Into<String>>(mut self, address: A) -> Self {
        self.address = address.into();
        self
    }

    /// Re-tag the record as recovered from the fallback copy.
    #[must_use]
    pub fn into_fallback(mut self) -> Self {
        self.source_status = SourceStatus::Fallback;
        self
    }

    /// Whether the provider reported more free spaces than total spaces.
    #[must_use]
    pub fn is_over_capacity(&self) -> bool {
        matches!(
            (self.total_spaces, self.available_spaces),
            (Some(total), Some(available)) if available > total
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// The persisted unit for one source: a complete replacement on every run.
pub struct DatasetPayload {
    /// Dataset the payload belongs to. Older files stored this under `city`.
    #[serde(alias = "city")]
    pub dataset_id: DatasetId,
    /// When the payload was assembled.
    #[serde(with = "utc_seconds")]
    pub updated_at: DateTime<Utc>,
    /// Records in adapter emission order.
    pub records: Vec<ParkingRecord>,
}

impl DatasetPayload {
    /// Assemble a payload stamped with the current time.
    #[must_use]
    pub fn new(dataset_id: DatasetId, records: Vec<ParkingRecord>) -> Self {
        Self {
            dataset_id,
            updated_at: now_utc(),
            records,
        }
    }
}

// Files from the previous tool kept the feed's negative "no data" sentinels verbatim.
fn stored_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Option::<i64>::deserialize(deserializer)? {
        Some(value) if value < 0 => Ok(None),
        Some(value) => u32::try_from(value).map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

/// Current UTC time truncated to whole seconds.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Serde adapter writing timestamps as `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Reading also accepts any RFC 3339 timestamp.
pub mod utc_seconds {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Persisted timestamp layout.
    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    /// Serialize a timestamp in [`FORMAT`].
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if writing the string fails.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    /// Deserialize a timestamp written in [`FORMAT`] or RFC 3339.
    ///
    /// # Errors
    ///
    /// Returns a custom error when the string matches neither layout.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid UTC timestamp: {raw}")))
    }

    /// Parse a timestamp written in [`FORMAT`] or RFC 3339.
    #[must_use]
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .map(|naive| naive.and_utc())
            .or_else(|_err| DateTime::parse_from_rfc3339(raw).map(|parsed| parsed.with_timezone(&Utc)))
            .ok()
    }
}
