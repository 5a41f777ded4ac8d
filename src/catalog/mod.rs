//! Canonical pricing records
//!
//! Both pricing documents are normalized into the types here before anything
//! else looks at them:
//! - `demand`: the on-demand/reserved offer file → [`Catalog`]
//! - `spot`: the JSONP spot feed → [`SpotCatalog`]
//!
//! Prices are `Option<f64>` throughout. `None` means the document had no
//! price for that slot, which is not the same thing as a price of zero.

pub mod demand;
pub mod spot;

pub use demand::ingest_demand;
pub use spot::ingest_spot;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance-store disk technology. `Ebs` means no instance store at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskType {
    #[serde(rename = "EBS")]
    Ebs,
    #[serde(rename = "HDD")]
    Hdd,
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "unknown")]
    Unknown,
}

impl DiskType {
    pub fn label(&self) -> &'static str {
        match self {
            DiskType::Ebs => "EBS",
            DiskType::Hdd => "HDD",
            DiskType::Ssd => "SSD",
            DiskType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Network tier for descriptions the offer file does not classify.
pub const UNCLASSIFIED_NETWORK_TIER: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpecs {
    pub memory_gib: f64,
    pub vcpu: u32,
    pub clock_speed: String,
    pub os: String,
    /// Total instance-store capacity, 0 when EBS only
    pub disk_gib: u64,
    pub disk_type: DiskType,
    /// 1 is fastest, 4 is unclassified
    pub network_tier: u8,
    pub network_desc: String,
}

/// Reserved instance price components, one per (term, payment option) slot.
///
/// `*_hourly` fields are recurring hourly charges; `*_upfront` fields are the
/// one-time payment for the whole term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedPrices {
    pub zero_1y_hourly: Option<f64>,
    pub partial_1y_hourly: Option<f64>,
    pub partial_1y_upfront: Option<f64>,
    pub full_1y_upfront: Option<f64>,
    pub partial_3y_hourly: Option<f64>,
    pub partial_3y_upfront: Option<f64>,
    pub full_3y_upfront: Option<f64>,
}

/// One on-demand/reserved SKU, optionally enriched with a spot price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub sku: String,
    /// Instance type, e.g. `m4.large`
    pub name: String,
    pub region_name: String,
    /// Empty when the location is not in the region registry
    pub region_code: String,
    pub specs: InstanceSpecs,
    pub demand_price: Option<f64>,
    pub reserved: ReservedPrices,
    /// Filled in by the price merger; `None` when no spot offer matched
    pub spot_price: Option<f64>,
}

/// Full on-demand/reserved snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub instances: Vec<Instance>,
}

/// One spot price observation for a (region, size, OS) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotOffer {
    pub name: String,
    pub region_code: String,
    /// `None` for feed operating systems with no on-demand counterpart
    pub os: Option<String>,
    pub price: Option<f64>,
}

/// Full spot snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotCatalog {
    pub offers: Vec<SpotOffer>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl SpotCatalog {
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Linux EBS-only instance in us-east-1 with only an on-demand price.
    pub fn instance(name: &str, vcpu: u32, memory_gib: f64, demand: f64) -> Instance {
        Instance {
            sku: format!("SKU-{}", name),
            name: name.to_string(),
            region_name: "US East (N. Virginia)".to_string(),
            region_code: "us-east-1".to_string(),
            specs: InstanceSpecs {
                memory_gib,
                vcpu,
                clock_speed: "2.4 GHz".to_string(),
                os: "Linux".to_string(),
                disk_gib: 0,
                disk_type: DiskType::Ebs,
                network_tier: 3,
                network_desc: "Moderate".to_string(),
            },
            demand_price: Some(demand),
            reserved: ReservedPrices::default(),
            spot_price: None,
        }
    }
}
