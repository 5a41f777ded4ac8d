//! Fleet filtering, sizing and cost ranking
//!
//! Every catalog record is checked against the [`Constraints`] in a fixed
//! order (region, type, OS, network, disk type, disk size, CPU, memory), sized
//! into a fleet, priced per month under demand/reserved/spot, and ranked by
//! the selected cost. Unknown costs sort after every known cost.

use crate::catalog::{Catalog, Instance, InstanceSpecs, ReservedPrices, UNCLASSIFIED_NETWORK_TIER};
use crate::error::{FleetError, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Billing month used for every monthly figure.
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Reserved instance payment plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationPlan {
    /// 1 year, no upfront
    #[default]
    #[value(name = "zero1")]
    Zero1,
    /// 1 year, partial upfront
    #[value(name = "partial1")]
    Partial1,
    /// 3 years, partial upfront
    #[value(name = "partial3")]
    Partial3,
    /// 1 year, all upfront
    #[value(name = "full1")]
    Full1,
    /// 3 years, all upfront
    #[value(name = "full3")]
    Full3,
}

impl ReservationPlan {
    fn term_months(&self) -> f64 {
        match self {
            ReservationPlan::Zero1 | ReservationPlan::Partial1 | ReservationPlan::Full1 => 12.0,
            ReservationPlan::Partial3 | ReservationPlan::Full3 => 36.0,
        }
    }

    /// (recurring hourly, upfront) for this plan, `None` if either is unknown.
    fn components(&self, prices: &ReservedPrices) -> Option<(f64, f64)> {
        match self {
            ReservationPlan::Zero1 => Some((prices.zero_1y_hourly?, 0.0)),
            ReservationPlan::Partial1 => {
                Some((prices.partial_1y_hourly?, prices.partial_1y_upfront?))
            }
            ReservationPlan::Partial3 => {
                Some((prices.partial_3y_hourly?, prices.partial_3y_upfront?))
            }
            ReservationPlan::Full1 => Some((0.0, prices.full_1y_upfront?)),
            ReservationPlan::Full3 => Some((0.0, prices.full_3y_upfront?)),
        }
    }

    /// Monthly cost of `count` reserved instances, upfront amortized over the term.
    ///
    /// `None` when the plan has no pricing for this SKU or prices out at zero.
    pub fn monthly_cost(&self, prices: &ReservedPrices, count: u32) -> Option<f64> {
        let (hourly, upfront) = self.components(prices)?;
        let count = f64::from(count);
        let total = hourly * HOURS_PER_MONTH * count + upfront / self.term_months() * count;
        (total > 0.0).then_some(total)
    }
}

impl FromStr for ReservationPlan {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| {
            FleetError::validation("ri", format!("unknown plan '{}', expected zero1, partial1, partial3, full1 or full3", s))
        })
    }
}

/// Which monthly cost candidates are ranked by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Demand,
    Spot,
    Ri,
}

impl FromStr for SortKey {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| {
            FleetError::validation("sort", format!("unknown sort key '{}', expected demand, spot or ri", s))
        })
    }
}

/// Minimum network performance, mapped onto catalog tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum NetworkSpeed {
    Any,
    #[default]
    Low,
    Med,
    High,
    Gbit,
}

impl NetworkSpeed {
    /// Slowest tier that still satisfies this requirement.
    pub fn max_tier(&self) -> u8 {
        match self {
            NetworkSpeed::Any | NetworkSpeed::Low => UNCLASSIFIED_NETWORK_TIER,
            NetworkSpeed::Med => 3,
            NetworkSpeed::High => 2,
            NetworkSpeed::Gbit => 1,
        }
    }
}

impl FromStr for NetworkSpeed {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| {
            FleetError::validation("network", format!("unknown network speed '{}', expected any, low, med, high or gbit", s))
        })
    }
}

/// How many instances the fleet needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FleetSize {
    /// Exactly this many instances
    Exact(u32),
    /// As many as it takes to reach these aggregate totals
    Targets { cpu: u32, memory_gib: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    /// Case-insensitive substring of the region code
    pub region: String,
    /// Case-insensitive substring of the instance type, `any` disables
    pub instance_type: String,
    /// Case-insensitive substring of the operating system, `any` disables
    pub os: String,
    pub min_cpu: u32,
    pub min_memory_gib: f64,
    pub min_disk_gib: u64,
    pub network: NetworkSpeed,
    /// `EBS`, `HDD`, `SSD` or `any`
    pub disk_type: String,
    pub fleet: FleetSize,
    pub min_count: u32,
    pub plan: ReservationPlan,
    pub sort: SortKey,
    pub limit: usize,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            instance_type: "any".to_string(),
            os: "linux".to_string(),
            min_cpu: 2,
            min_memory_gib: 2.0,
            min_disk_gib: 0,
            network: NetworkSpeed::Low,
            disk_type: "any".to_string(),
            fleet: FleetSize::Targets {
                cpu: 2,
                memory_gib: 2.0,
            },
            min_count: 1,
            plan: ReservationPlan::Partial1,
            sort: SortKey::Demand,
            limit: 20,
        }
    }
}

impl Constraints {
    pub fn validate(&self) -> Result<()> {
        if !self.min_memory_gib.is_finite() || self.min_memory_gib < 0.0 {
            return Err(FleetError::validation("mem", "minimum memory must be a non-negative number"));
        }
        match self.fleet {
            FleetSize::Exact(0) => {
                return Err(FleetError::validation("num", "instance count must be at least 1"));
            }
            FleetSize::Targets { memory_gib, .. }
                if !memory_gib.is_finite() || memory_gib < 0.0 =>
            {
                return Err(FleetError::validation(
                    "fleet-mem",
                    "fleet memory must be a non-negative number",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// A catalog record that satisfies the constraints, sized and priced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub instance: Instance,
    pub count: u32,
    pub demand_monthly: Option<f64>,
    pub reserved_monthly: Option<f64>,
    pub spot_monthly: Option<f64>,
    pub sort_cost: Option<f64>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.count, self.instance.name)?;
        match self.sort_cost {
            Some(cost) => write!(f, " (${:.2}/month)", cost),
            None => write!(f, " (price unavailable)"),
        }
    }
}

/// Lowercased needles, built once per search.
struct Matcher {
    region: String,
    instance_type: Option<String>,
    os: Option<String>,
    disk_type: Option<String>,
}

fn unless_any(value: &str) -> Option<String> {
    (!value.eq_ignore_ascii_case("any")).then(|| value.to_lowercase())
}

impl Matcher {
    fn new(constraints: &Constraints) -> Self {
        Self {
            region: constraints.region.to_lowercase(),
            instance_type: unless_any(&constraints.instance_type),
            os: unless_any(&constraints.os),
            disk_type: unless_any(&constraints.disk_type),
        }
    }

    fn accepts(&self, instance: &Instance, constraints: &Constraints) -> bool {
        let specs = &instance.specs;
        contains_lower(&instance.region_code, &self.region)
            && self
                .instance_type
                .as_deref()
                .map_or(true, |t| contains_lower(&instance.name, t))
            && self.os.as_deref().map_or(true, |os| contains_lower(&specs.os, os))
            && specs.network_tier <= constraints.network.max_tier()
            && self
                .disk_type
                .as_deref()
                .map_or(true, |d| specs.disk_type.label().eq_ignore_ascii_case(d))
            && specs.disk_gib >= constraints.min_disk_gib
            && specs.vcpu >= constraints.min_cpu
            && specs.memory_gib >= constraints.min_memory_gib
    }
}

fn contains_lower(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn ratio(target: f64, capacity: f64) -> Option<f64> {
    if target <= 0.0 {
        Some(0.0)
    } else if capacity <= 0.0 {
        None
    } else {
        Some(target / capacity)
    }
}

/// Number of instances needed, or `None` when the instance cannot be sized
/// (zero CPU or memory against a positive target).
///
/// Both ratios are taken in floating point before they are compared and
/// rounded up, and the result is never below 1.
pub fn fleet_size(specs: &InstanceSpecs, fleet: FleetSize) -> Option<u32> {
    match fleet {
        FleetSize::Exact(count) => Some(count),
        FleetSize::Targets { cpu, memory_gib } => {
            let by_memory = ratio(memory_gib, specs.memory_gib)?;
            let by_cpu = ratio(f64::from(cpu), f64::from(specs.vcpu))?;
            let needed = by_memory.max(by_cpu).ceil();
            Some((needed as u32).max(1))
        }
    }
}

fn monthly(hourly: Option<f64>, count: u32) -> Option<f64> {
    hourly.map(|price| price * f64::from(count) * HOURS_PER_MONTH)
}

fn price_candidate(instance: &Instance, count: u32, constraints: &Constraints) -> Candidate {
    let demand_monthly = monthly(instance.demand_price, count);
    let spot_monthly = monthly(instance.spot_price, count);
    let reserved_monthly = constraints.plan.monthly_cost(&instance.reserved, count);
    let sort_cost = match constraints.sort {
        SortKey::Demand => demand_monthly,
        SortKey::Spot => spot_monthly,
        SortKey::Ri => reserved_monthly,
    };
    Candidate {
        instance: instance.clone(),
        count,
        demand_monthly,
        reserved_monthly,
        spot_monthly,
        sort_cost,
    }
}

/// Every catalog record that satisfies `constraints`, in catalog order.
pub fn filter_candidates(catalog: &Catalog, constraints: &Constraints) -> Vec<Candidate> {
    let matcher = Matcher::new(constraints);
    catalog
        .instances
        .iter()
        .filter(|instance| matcher.accepts(instance, constraints))
        .filter_map(|instance| {
            let count = fleet_size(&instance.specs, constraints.fleet)?;
            (count >= constraints.min_count).then(|| price_candidate(instance, count, constraints))
        })
        .collect()
}

/// Known costs ascending, unknown costs last.
pub fn compare_costs(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort by `sort_cost` (stable, so ties keep catalog order) and keep `limit` rows.
pub fn rank(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| compare_costs(a.sort_cost, b.sort_cost));
    candidates.truncate(limit);
    candidates
}

/// Filter, size, price and rank in one go.
pub fn search(catalog: &Catalog, constraints: &Constraints) -> Result<Vec<Candidate>> {
    constraints.validate()?;
    Ok(rank(filter_candidates(catalog, constraints), constraints.limit))
}
