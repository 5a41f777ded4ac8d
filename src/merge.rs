//! Attach spot prices to on-demand records
//!
//! Spot offers carry no SKU, so they are matched on (OS, region code,
//! instance name). The first offer with a positive price wins; later
//! duplicates are ignored. Records whose region is not in the registry have
//! no code and are never matched.

use crate::catalog::{Catalog, SpotCatalog};
use std::collections::HashMap;
use tracing::debug;

type MatchKey<'a> = (&'a str, &'a str, &'a str);

fn index_spot(spot: &SpotCatalog) -> HashMap<MatchKey<'_>, f64> {
    let mut index = HashMap::with_capacity(spot.len());
    for offer in &spot.offers {
        let (Some(os), Some(price)) = (offer.os.as_deref(), offer.price) else {
            continue;
        };
        if price > 0.0 && !offer.region_code.is_empty() {
            index
                .entry((os, offer.region_code.as_str(), offer.name.as_str()))
                .or_insert(price);
        }
    }
    index
}

/// Copy matching spot prices onto `demand`. Returns the number of records priced.
pub fn merge_spot_prices(demand: &mut Catalog, spot: &SpotCatalog) -> usize {
    let index = index_spot(spot);
    let mut matched = 0;
    for instance in &mut demand.instances {
        if instance.region_code.is_empty() {
            continue;
        }
        let key = (
            instance.specs.os.as_str(),
            instance.region_code.as_str(),
            instance.name.as_str(),
        );
        if let Some(&price) = index.get(&key) {
            instance.spot_price = Some(price);
            matched += 1;
        }
    }
    debug!(
        matched,
        total = demand.len(),
        "Attached spot prices to on-demand catalog"
    );
    matched
}
