//! Gates, zones, the parking-state report and the zone open toggle.

use tabled::Tabled;

use gopark_config::Config;
use gopark_core::{Gate, Parking, ParkingStateReportEntry, Zone, ZoneOpenState};

use crate::cli::{GateArgs, GlobalOpts, ZoneOpenArgs};
use crate::commands::util::{money, resolve_gate};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct GateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Zones")]
    zones: String,
}

impl From<&Gate> for GateRow {
    fn from(g: &Gate) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            location: g.location.clone(),
            zones: g.zone_ids.join(", "),
        }
    }
}

#[derive(Tabled)]
pub(crate) struct ZoneRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Total")]
    total: u32,
    #[tabled(rename = "Occupied")]
    occupied: u32,
    #[tabled(rename = "Free")]
    free: String,
    #[tabled(rename = "Reserved")]
    reserved: u32,
    #[tabled(rename = "Visitors")]
    visitors: u32,
    #[tabled(rename = "Subscribers")]
    subscribers: u32,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl ZoneRow {
    pub(crate) fn new(z: &Zone, color: bool) -> Self {
        Self {
            id: z.id.clone(),
            name: z.name.clone(),
            category: z.category_id.clone(),
            total: z.total_slots,
            occupied: z.occupied,
            free: output::free_label(z.free, color),
            reserved: z.reserved,
            visitors: z.available_for_visitors,
            subscribers: z.available_for_subscribers,
            rate: format!("{} / {}", money(z.rate_normal), money(z.rate_special)),
            status: output::open_label(z.open, color),
        }
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Zone")]
    zone_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Total")]
    total: u32,
    #[tabled(rename = "Occupied")]
    occupied: u32,
    #[tabled(rename = "Free")]
    free: String,
    #[tabled(rename = "Reserved")]
    reserved: u32,
    #[tabled(rename = "Visitors")]
    visitors: u32,
    #[tabled(rename = "Subscribers")]
    subscribers: u32,
    #[tabled(rename = "Subs")]
    subscriber_count: u32,
    #[tabled(rename = "Status")]
    status: String,
}

impl ReportRow {
    fn new(r: &ParkingStateReportEntry, color: bool) -> Self {
        Self {
            zone_id: r.zone_id.clone(),
            name: r.name.clone(),
            total: r.total_slots,
            occupied: r.occupied,
            free: output::free_label(r.free, color),
            reserved: r.reserved,
            visitors: r.available_for_visitors,
            subscribers: r.available_for_subscribers,
            subscriber_count: r.subscriber_count,
            status: output::open_label(r.open, color),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn gates(parking: &Parking, global: &GlobalOpts) -> Result<(), CliError> {
    let gates = parking.gates().await?;
    let out = output::render_list(global.output, &gates, |g| GateRow::from(g), |g| g.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn zones(
    parking: &Parking,
    config: &Config,
    args: &GateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let gate = resolve_gate(args.gate.as_deref(), config)?;
    let zones = parking.load_zones(&gate).await?;
    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        zones.as_slice(),
        |z| ZoneRow::new(z, color),
        |z| z.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn report(parking: &Parking, global: &GlobalOpts) -> Result<(), CliError> {
    let entries = parking.parking_report().await?;
    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        &entries,
        |r| ReportRow::new(r, color),
        |r| r.zone_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn zone_open(
    parking: &Parking,
    args: &ZoneOpenArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = parking.set_zone_open(&args.zone, args.state.is_on()).await?;
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &state,
        |s: &ZoneOpenState| format!("Zone {} is now {}", s.zone_id, output::open_label(s.open, color)),
        |s| s.zone_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
