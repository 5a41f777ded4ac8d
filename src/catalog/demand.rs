//! On-demand / reserved offer file ingestion
//!
//! The offer file has two halves that only meet through the SKU:
//!
//! ```text
//! products.<sku>.attributes.{instanceType, location, vcpu, memory, ...}
//! terms.<OnDemand|Reserved>.<sku>.<sku>.<offer>.priceDimensions.<sku>.<offer>.<dim>.pricePerUnit.USD
//! ```
//!
//! Product entries that fail the commercial filters (wrong family, BYOL,
//! pre-installed software, dedicated tenancy) are dropped silently. A missing
//! price node leaves that price as `None`.

use crate::catalog::{
    Catalog, DiskType, Instance, InstanceSpecs, ReservedPrices, UNCLASSIFIED_NETWORK_TIER,
};
use crate::error::{FleetError, Result};
use crate::region;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

const DOCUMENT: &str = "demand";

#[derive(Deserialize)]
struct OfferFile {
    products: Map<String, Value>,
    #[serde(default)]
    terms: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    product_family: Option<String>,
    #[serde(default)]
    attributes: HashMap<String, Value>,
}

/// Where one price lives in the `terms` tree.
struct PriceSlot {
    term: &'static str,
    offer: &'static str,
    dimension: &'static str,
}

const HOURLY: &str = "6YS6EN2CT7";
const UPFRONT: &str = "2TG2D8R56U";

const ON_DEMAND: PriceSlot = PriceSlot { term: "OnDemand", offer: "JRTCKXETXF", dimension: HOURLY };
const ZERO_1Y: PriceSlot = PriceSlot { term: "Reserved", offer: "4NA7Y494T4", dimension: HOURLY };
const PARTIAL_1Y_HOURLY: PriceSlot = PriceSlot { term: "Reserved", offer: "HU7G6KETJZ", dimension: HOURLY };
const PARTIAL_1Y_UPFRONT: PriceSlot = PriceSlot { term: "Reserved", offer: "HU7G6KETJZ", dimension: UPFRONT };
const FULL_1Y_UPFRONT: PriceSlot = PriceSlot { term: "Reserved", offer: "6QCMYABX3D", dimension: UPFRONT };
const PARTIAL_3Y_HOURLY: PriceSlot = PriceSlot { term: "Reserved", offer: "38NPMPTW36", dimension: HOURLY };
const PARTIAL_3Y_UPFRONT: PriceSlot = PriceSlot { term: "Reserved", offer: "38NPMPTW36", dimension: UPFRONT };
const FULL_3Y_UPFRONT: PriceSlot = PriceSlot { term: "Reserved", offer: "NQ3QZPMQV9", dimension: UPFRONT };

fn memory_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s+GiB").expect("memory pattern is valid"))
}

fn storage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d[\d,]*)\s+x\s+(\d[\d,]*)(?:\s+(?:NVMe\s+)?(SSD|HDD))?")
            .expect("storage pattern is valid")
    })
}

fn parse_number<T: std::str::FromStr>(digits: &str) -> Option<T> {
    digits.replace(',', "").parse().ok()
}

/// Parse a memory attribute such as `"15 GiB"` or `"0.613 GiB"`.
///
/// Anything without a `<number> GiB` part yields `0.0`.
pub fn parse_memory(text: &str) -> f64 {
    memory_re()
        .captures(text)
        .and_then(|caps| parse_number(&caps[1]))
        .unwrap_or(0.0)
}

/// Parse a storage attribute into total instance-store GiB and disk type.
///
/// `"EBS only"` is `(0, Ebs)`; `"2 x 800 SSD"` is `(1600, Ssd)`; an unlabeled
/// `"4 x 420"` counts as HDD.
pub fn parse_storage(text: &str) -> (u64, DiskType) {
    if text.trim() == "EBS only" {
        return (0, DiskType::Ebs);
    }
    let Some(caps) = storage_re().captures(text) else {
        return (0, DiskType::Unknown);
    };
    let count: u64 = parse_number(&caps[1]).unwrap_or(0);
    let size: u64 = parse_number(&caps[2]).unwrap_or(0);
    let disk_type = match caps.get(3).map(|m| m.as_str()) {
        Some("SSD") => DiskType::Ssd,
        _ => DiskType::Hdd,
    };
    (count.saturating_mul(size), disk_type)
}

/// Map an offer-file network description to its tier (1 = fastest).
pub fn network_tier(desc: &str) -> u8 {
    match desc {
        "10 Gigabit" => 1,
        "High" => 2,
        "Moderate" => 3,
        _ => UNCLASSIFIED_NETWORK_TIER,
    }
}

fn lookup_price(terms: &Value, sku: &str, slot: &PriceSlot) -> Option<f64> {
    let offer_key = format!("{}.{}", sku, slot.offer);
    let dimension_key = format!("{}.{}", offer_key, slot.dimension);
    terms
        .get(slot.term)?
        .get(sku)?
        .get(&offer_key)?
        .get("priceDimensions")?
        .get(&dimension_key)?
        .get("pricePerUnit")?
        .get("USD")?
        .as_str()?
        .trim()
        .parse()
        .ok()
}

fn attr<'a>(attributes: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str)
}

/// Commercial filters: only shared-tenancy compute instances with a known OS,
/// no BYOL and no pre-installed software.
fn passes_filters(product: &RawProduct) -> bool {
    if product.product_family.as_deref() != Some("Compute Instance") {
        return false;
    }
    let attrs = &product.attributes;
    let os_ok = matches!(attr(attrs, "operatingSystem"), Some(os) if os != "NA");
    let license_ok =
        matches!(attr(attrs, "licenseModel"), Some(lic) if lic != "Bring your own license");
    let software_ok = matches!(attr(attrs, "preInstalledSw"), Some("") | Some("NA"));
    let tenancy_ok = attr(attrs, "tenancy") == Some("Shared");
    os_ok && license_ok && software_ok && tenancy_ok
}

fn normalize(sku: &str, product: &RawProduct, terms: &Value) -> Option<Instance> {
    if !passes_filters(product) {
        return None;
    }
    let attrs = &product.attributes;
    let name = attr(attrs, "instanceType")?;
    let region_name = attr(attrs, "location")?;
    let os = attr(attrs, "operatingSystem")?;

    let network_desc = attr(attrs, "networkPerformance").unwrap_or_default();
    let (disk_gib, disk_type) = parse_storage(attr(attrs, "storage").unwrap_or_default());

    let specs = InstanceSpecs {
        memory_gib: parse_memory(attr(attrs, "memory").unwrap_or_default()),
        vcpu: attr(attrs, "vcpu").and_then(parse_number).unwrap_or(0),
        clock_speed: attr(attrs, "clockSpeed").unwrap_or_default().to_string(),
        os: os.to_string(),
        disk_gib,
        disk_type,
        network_tier: network_tier(network_desc),
        network_desc: network_desc.to_string(),
    };

    let price = |slot: &PriceSlot| lookup_price(terms, sku, slot);

    Some(Instance {
        sku: sku.to_string(),
        name: name.to_string(),
        region_name: region_name.to_string(),
        region_code: region::code_for_display_name(region_name).to_string(),
        specs,
        demand_price: price(&ON_DEMAND),
        reserved: ReservedPrices {
            zero_1y_hourly: price(&ZERO_1Y),
            partial_1y_hourly: price(&PARTIAL_1Y_HOURLY),
            partial_1y_upfront: price(&PARTIAL_1Y_UPFRONT),
            full_1y_upfront: price(&FULL_1Y_UPFRONT),
            partial_3y_hourly: price(&PARTIAL_3Y_HOURLY),
            partial_3y_upfront: price(&PARTIAL_3Y_UPFRONT),
            full_3y_upfront: price(&FULL_3Y_UPFRONT),
        },
        spot_price: None,
    })
}

/// Normalize a downloaded offer file into a [`Catalog`].
///
/// Fails only when the top level is not an object with a `products` map;
/// individual malformed products are skipped.
pub fn ingest_demand(bytes: &[u8]) -> Result<Catalog> {
    let offer: OfferFile =
        serde_json::from_slice(bytes).map_err(|e| FleetError::decode(DOCUMENT, e))?;

    let mut instances = Vec::new();
    let mut skipped = 0usize;

    for (sku, value) in &offer.products {
        let instance = serde_json::from_value::<RawProduct>(value.clone())
            .ok()
            .and_then(|product| normalize(sku, &product, &offer.terms));
        match instance {
            Some(instance) => instances.push(instance),
            None => skipped += 1,
        }
    }

    debug!(
        kept = instances.len(),
        skipped, "Normalized on-demand offer file"
    );
    Ok(Catalog { instances })
}
