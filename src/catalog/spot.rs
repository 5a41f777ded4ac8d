//! Spot price feed ingestion
//!
//! The feed is JSONP: `callback({...})`. The body walks
//! `config.regions[].instanceTypes[].sizes[].valueColumns[]`, one value column
//! per operating system. Any structural mismatch rejects the whole feed.

use crate::catalog::{SpotCatalog, SpotOffer};
use crate::error::{FleetError, Result};
use crate::region;
use regex::bytes::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

const DOCUMENT: &str = "spot";

#[derive(Deserialize)]
struct SpotFeed {
    config: FeedConfig,
}

#[derive(Deserialize)]
struct FeedConfig {
    regions: Vec<FeedRegion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedRegion {
    region: String,
    instance_types: Vec<FeedInstanceType>,
}

#[derive(Deserialize)]
struct FeedInstanceType {
    sizes: Vec<FeedSize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedSize {
    size: String,
    value_columns: Vec<FeedColumn>,
}

#[derive(Deserialize)]
struct FeedColumn {
    name: String,
    prices: HashMap<String, String>,
}

fn callback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)callback\s*\((.*)\)").expect("callback pattern is valid"))
}

/// Strip the `callback( ... )` wrapper and return the JSON body.
pub fn unwrap_callback(bytes: &[u8]) -> Result<&[u8]> {
    callback_re()
        .captures(bytes)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_bytes())
        .ok_or_else(|| FleetError::decode(DOCUMENT, "could not find callback(...) wrapper"))
}

/// Translate feed OS names into the offer file's vocabulary.
pub fn normalize_os(feed_name: &str) -> Option<&'static str> {
    match feed_name {
        "linux" => Some("Linux"),
        "mswin" => Some("Windows"),
        _ => None,
    }
}

/// Normalize a downloaded spot feed into a [`SpotCatalog`].
pub fn ingest_spot(bytes: &[u8]) -> Result<SpotCatalog> {
    let body = unwrap_callback(bytes)?;
    let feed: SpotFeed = serde_json::from_slice(body).map_err(|e| FleetError::decode(DOCUMENT, e))?;

    let mut offers = Vec::new();
    for feed_region in &feed.config.regions {
        let region_code = region::code_for_spot_label(&feed_region.region);
        for group in &feed_region.instance_types {
            for size in &group.sizes {
                for column in &size.value_columns {
                    offers.push(SpotOffer {
                        name: size.size.clone(),
                        region_code: region_code.to_string(),
                        os: normalize_os(&column.name).map(str::to_string),
                        price: column.prices.get("USD").and_then(|p| p.trim().parse().ok()),
                    });
                }
            }
        }
    }

    debug!(offers = offers.len(), "Normalized spot feed");
    Ok(SpotCatalog { offers })
}
