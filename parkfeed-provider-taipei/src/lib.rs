//! Provider implementation for Taipei using the city's TCMSV open data feeds.

use std::sync::Arc;

use parkfeed_core::{
    fetch::HttpFetcher,
    model::{Cities, CityId, CityMeta, ParkingKind, SourceMeta},
    plugin::CityPlugin,
    ports::SourcePort,
};

mod offstreet;
mod onstreet;

pub use offstreet::{OFFSTREET_URL, TaipeiOffStreetSource};
pub use onstreet::{ONSTREET_URL, TaipeiOnStreetSource};

/// Build the plugin bundle for the Taipei provider.
#[must_use]
pub fn plugin(fetcher: HttpFetcher) -> CityPlugin {
    let onstreet: Arc<dyn SourcePort> = Arc::new(TaipeiOnStreetSource::new(fetcher.clone()));
    let offstreet: Arc<dyn SourcePort> = Arc::new(TaipeiOffStreetSource::new(fetcher));

    CityPlugin {
        meta: city_meta(),
        sources: vec![onstreet, offstreet],
    }
}

fn city_meta() -> CityMeta {
    CityMeta {
        id: CityId::from(Cities::Taipei),
        name: String::from("Taipei"),
    }
}

fn source_meta(kind: ParkingKind) -> SourceMeta {
    SourceMeta::new(city_meta(), kind)
}
