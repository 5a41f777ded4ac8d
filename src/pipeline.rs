//! Load both catalogs and merge them into one enriched catalog.

use crate::catalog::{self, Catalog, SpotCatalog};
use crate::config::Config;
use crate::error::Result;
use crate::freshness::{CatalogLoader, CatalogSource};
use crate::merge::merge_spot_prices;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PricingSources {
    pub demand: CatalogSource,
    pub spot: CatalogSource,
}

impl PricingSources {
    pub fn from_config(config: &Config) -> Self {
        Self {
            demand: CatalogSource {
                name: config.cache.demand_name.clone(),
                url: config.pricing.demand_url.clone(),
                ttl: config.cache.demand_ttl(),
            },
            spot: CatalogSource {
                name: config.cache.spot_name.clone(),
                url: config.pricing.spot_url.clone(),
                ttl: config.cache.spot_ttl(),
            },
        }
    }
}

/// On-demand catalog with spot prices attached (unless `include_spot` is off).
///
/// The demand catalog is loaded first; any error aborts before spot is touched.
pub async fn load_enriched_catalog(
    loader: &CatalogLoader<'_>,
    sources: &PricingSources,
    include_spot: bool,
) -> Result<Catalog> {
    let mut demand: Catalog = loader.load(&sources.demand, catalog::ingest_demand).await?;
    info!("Loaded {} on-demand price records", demand.len());

    if include_spot {
        let spot: SpotCatalog = loader.load(&sources.spot, catalog::ingest_spot).await?;
        let matched = merge_spot_prices(&mut demand, &spot);
        info!("Matched spot prices for {}/{} records", matched, demand.len());
    }

    Ok(demand)
}
