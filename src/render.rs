//! Candidate display: comfy-table for humans, JSON for scripts

use crate::error::Result;
use crate::fleet::{Candidate, Constraints};
use crate::region;
use crate::utils::format_thousands;
use clap::ValueEnum;
use comfy_table::{Cell, CellAlignment, Color, Table};
use console::style;

const NOT_AVAILABLE: &str = "N/A";

pub const HEADERS: [&str; 14] = [
    "# Inst",
    "Type",
    "VCPU",
    "VCPU Freq",
    "Mem",
    "Network",
    "IS Type",
    "IS Size",
    "Demand/Hour",
    "Spot/Hour",
    "Spot Sav",
    "Demand/Mon",
    "RI/Mon",
    "Spot/Mon",
];

/// Fleet hourly total, with the per-instance price appended for fleets.
fn hourly(price: Option<f64>, count: u32) -> String {
    match price {
        None => NOT_AVAILABLE.to_string(),
        Some(each) if count > 1 => {
            format!("${:.2} (${:.2} ea)", each * f64::from(count), each)
        }
        Some(each) => format!("${:.2}", each),
    }
}

fn monthly(cost: Option<f64>) -> String {
    cost.map_or_else(|| NOT_AVAILABLE.to_string(), |c| format!("${}", format_thousands(c)))
}

/// Whole-percent saving of spot over on-demand.
pub fn spot_saving(demand: Option<f64>, spot: Option<f64>) -> Option<f64> {
    match (demand, spot) {
        (Some(demand), Some(spot)) if demand > 0.0 => Some(((demand - spot) / demand * 100.0).round()),
        _ => None,
    }
}

/// Display strings for one candidate, in [`HEADERS`] order.
pub fn candidate_row(candidate: &Candidate) -> Vec<String> {
    let instance = &candidate.instance;
    let specs = &instance.specs;
    let (store_type, store_size) = if specs.disk_gib == 0 {
        (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string())
    } else {
        (specs.disk_type.to_string(), format!("{} GB", specs.disk_gib))
    };
    let saving = spot_saving(candidate.demand_monthly, candidate.spot_monthly)
        .map_or_else(|| NOT_AVAILABLE.to_string(), |pct| format!("{:.0}%", pct));

    vec![
        candidate.count.to_string(),
        instance.name.clone(),
        specs.vcpu.to_string(),
        specs.clock_speed.clone(),
        format!("{:.1}", specs.memory_gib),
        specs.network_desc.clone(),
        store_type,
        store_size,
        hourly(instance.demand_price, candidate.count),
        hourly(instance.spot_price, candidate.count),
        saving,
        monthly(candidate.demand_monthly),
        monthly(candidate.reserved_monthly),
        monthly(candidate.spot_monthly),
    ]
}

pub fn build_table(candidates: &[Candidate]) -> Table {
    let mut table = Table::new();
    table.set_header(HEADERS.to_vec());

    for candidate in candidates {
        let cells = candidate_row(candidate).into_iter().enumerate().map(|(i, text)| {
            let cell = Cell::new(&text);
            match i {
                1 => cell.fg(Color::Cyan),
                _ if text == NOT_AVAILABLE => cell.fg(Color::DarkGrey),
                0 | 2 | 4 | 7..=13 => cell.set_alignment(CellAlignment::Right),
                _ => cell,
            }
        });
        table.add_row(cells.collect::<Vec<_>>());
    }
    table
}

fn value_name<V: ValueEnum>(value: V) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default()
}

/// One-line summary printed above the table.
///
/// The region is named from the registry only when every candidate shares
/// it; otherwise the region filter is shown as typed.
pub fn summary_line(candidates: &[Candidate], constraints: &Constraints) -> String {
    let first_code = candidates.first().map(|c| c.instance.region_code.as_str());
    let shared_code =
        first_code.filter(|code| candidates.iter().all(|c| c.instance.region_code == *code));
    let region = shared_code
        .and_then(region::by_code)
        .map(|r| format!("{} ({})", r.display_name, r.code))
        .unwrap_or_else(|| constraints.region.clone());
    format!(
        "{} cheapest by {} in {}, RI plan {}",
        candidates.len(),
        value_name(constraints.sort),
        region,
        value_name(constraints.plan),
    )
}

pub fn render_text(candidates: &[Candidate], constraints: &Constraints) -> String {
    if candidates.is_empty() {
        return format!(
            "{}",
            style("No instances match the given constraints").yellow()
        );
    }
    format!(
        "{}\n{}",
        style(summary_line(candidates, constraints)).bold(),
        build_table(candidates)
    )
}

pub fn render_json(candidates: &[Candidate]) -> Result<String> {
    Ok(serde_json::to_string_pretty(candidates)?)
}
