//! Check-in and checkout.

use std::fmt::Write as _;

use tabled::Tabled;
use tabled::settings::Style;

use gopark_config::Config;
use gopark_core::{CheckinKind, CheckinResponse, CheckoutBreakdown, CheckoutResponse, Parking};

use crate::cli::{CheckinArgs, CheckoutArgs, GlobalOpts};
use crate::commands::util::{money, resolve_gate};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct BreakdownRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

impl From<&CheckoutBreakdown> for BreakdownRow {
    fn from(b: &CheckoutBreakdown) -> Self {
        Self {
            from: output::timestamp(&b.from),
            to: output::timestamp(&b.to),
            hours: format!("{:.2}", b.hours),
            mode: b.rate_mode.to_string(),
            rate: money(b.rate),
            amount: money(b.amount),
        }
    }
}

pub async fn checkin(
    parking: &Parking,
    config: &Config,
    args: CheckinArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let gate = resolve_gate(args.gate.as_deref(), config)?;
    let kind = match args.subscription {
        Some(subscription_id) => CheckinKind::Subscriber { subscription_id },
        None => CheckinKind::Visitor,
    };

    let resp = parking.check_in(&gate, &args.zone, kind).await?;
    let out = output::render_single(global.output, &resp, checkin_detail, |r| {
        r.ticket.id.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn checkout(
    parking: &Parking,
    args: &CheckoutArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resp = parking.check_out(&args.ticket, args.force_visitor).await?;
    let out = output::render_single(global.output, &resp, checkout_detail, |r| money(r.amount))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn checkin_detail(r: &CheckinResponse) -> String {
    let t = &r.ticket;
    let mut pairs = vec![
        ("Ticket", t.id.clone()),
        ("Type", t.ticket_type.to_string()),
        ("Gate", t.gate_id.clone()),
        ("Zone", t.zone_id.clone()),
        ("Checked in", output::timestamp(&t.checkin_at)),
    ];
    if let Some(sub) = &t.subscription_id {
        pairs.push(("Subscription", sub.clone()));
    }
    pairs.push((
        "Zone free",
        format!("{} of {}", r.zone_state.free, r.zone_state.total_slots),
    ));
    output::detail(&pairs)
}

fn checkout_detail(r: &CheckoutResponse) -> String {
    let mut out = output::detail(&[
        ("Ticket", r.ticket_id.clone()),
        ("Checked in", output::timestamp(&r.checkin_at)),
        ("Checked out", output::timestamp(&r.checkout_at)),
        ("Duration", format!("{:.2} h", r.duration_hours)),
        ("Amount", money(r.amount)),
    ]);
    if !r.breakdown.is_empty() {
        let rows: Vec<BreakdownRow> = r.breakdown.iter().map(BreakdownRow::from).collect();
        let table = tabled::Table::new(rows).with(Style::rounded()).to_string();
        let _ = write!(out, "\n\n{table}");
    }
    out
}
