//! Live views over the shared feed: `watch`, `audit` and `ping`.

use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tokio::sync::watch;

use gopark_config::Config;
use gopark_core::{AdminAudit, LinkStatus, LiveFeed, Parking};

use crate::cli::{AuditArgs, GateArgs, GlobalOpts, OutputFormat, PingArgs};
use crate::commands::util::resolve_gate;
use crate::commands::zones::ZoneRow;
use crate::error::CliError;
use crate::output;

// ── Rows ────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct AuditRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Admin")]
    admin: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&AdminAudit> for AuditRow {
    fn from(a: &AdminAudit) -> Self {
        Self {
            time: output::timestamp(&a.timestamp),
            admin: a.admin_id.clone(),
            action: a.action.clone(),
            target: format!("{} {}", a.target_type, a.target_id),
            details: a
                .details
                .as_ref()
                .and_then(|d| serde_json::to_string(d).ok())
                .unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct PingResult {
    url: String,
    reachable: bool,
}

fn status_label(status: LinkStatus) -> String {
    match status {
        LinkStatus::Disconnected => "disconnected".into(),
        LinkStatus::Connecting => "connecting".into(),
        LinkStatus::Connected => "live".into(),
        LinkStatus::Reconnecting { attempt } => format!("reconnecting (attempt {attempt})"),
    }
}

// ── Follow loop ─────────────────────────────────────────────────────

/// Re-render on every data or link-status change until Ctrl-C, or until
/// the feed gives up reconnecting.
async fn follow<T>(
    feed: &LiveFeed,
    data: &mut watch::Receiver<T>,
    mut render: impl FnMut(LinkStatus) -> Result<(), CliError>,
) -> Result<(), CliError> {
    let mut status = feed.status();
    let mut seen_live = false;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let link = *status.borrow_and_update();
        data.borrow_and_update();

        if link == LinkStatus::Disconnected && seen_live {
            return Err(CliError::ConnectionFailed {
                url: feed.ws_url().to_string(),
                reason: "live feed closed and reconnect attempts are exhausted".into(),
            });
        }
        seen_live |= link != LinkStatus::Disconnected;
        render(link)?;

        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = data.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Close the socket and give the close frame a moment to leave.
async fn stop(feed: &LiveFeed) {
    feed.disconnect();
    tokio::time::sleep(crate::CLOSE_GRACE).await;
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn watch(
    parking: &Parking,
    config: &Config,
    args: &GateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let gate = resolve_gate(args.gate.as_deref(), config)?;
    let _binding = parking.watch_gate(&gate).await?;
    let mut versions = parking.store().zones.subscribe();
    let color = output::should_color(global.color);

    let result = follow(parking.feed(), &mut versions, |link| {
        let zones = parking.store().zones.get(&gate).unwrap_or_default();
        let body = output::render_list(
            global.output,
            zones.as_slice(),
            |z| ZoneRow::new(z, color),
            |z| z.id.clone(),
        )?;
        if global.output == OutputFormat::Table {
            output::print_output(&format!("{gate} [{}]", status_label(link)), global.quiet);
        }
        output::print_output(&body, global.quiet);
        Ok(())
    })
    .await;

    stop(parking.feed()).await;
    result
}

pub async fn audit(parking: &Parking, args: &AuditArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let _binding = parking.watch_admin(args.gate.as_deref());
    let mut log = parking.store().admin_log.subscribe();

    let result = follow(parking.feed(), &mut log, |link| {
        let entries = parking.store().admin_log.snapshot();
        let body = output::render_list(
            global.output,
            entries.as_slice(),
            |a| AuditRow::from(a),
            |a| format!("{} {} {}", a.timestamp, a.action, a.target_id),
        )?;
        if global.output == OutputFormat::Table {
            output::print_output(
                &format!("admin log [{}] {} entries", status_label(link), entries.len()),
                global.quiet,
            );
        }
        output::print_output(&body, global.quiet);
        Ok(())
    })
    .await;

    stop(parking.feed()).await;
    result
}

pub async fn ping(config: &Config, args: &PingArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let url = config.ws_url()?;
    let reachable = gopark_core::probe(&url, Duration::from_secs(args.timeout_secs)).await;
    if !reachable {
        return Err(CliError::ConnectionFailed {
            url: url.to_string(),
            reason: format!("no WebSocket handshake within {}s", args.timeout_secs),
        });
    }

    let result = PingResult {
        url: url.to_string(),
        reachable,
    };
    let out = output::render_single(
        global.output,
        &result,
        |r| format!("{} accepts connections", r.url),
        |r| r.url.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(status_label(LinkStatus::Connected), "live");
        assert_eq!(
            status_label(LinkStatus::Reconnecting { attempt: 2 }),
            "reconnecting (attempt 2)"
        );
    }

    #[test]
    fn audit_row_flattens_target_and_details() {
        let mut details = serde_json::Map::new();
        details.insert("open".into(), serde_json::Value::Bool(false));
        let row = AuditRow::from(&AdminAudit {
            admin_id: "admin_1".into(),
            action: "zone-closed".into(),
            target_type: "zone".into(),
            target_id: "zone_a".into(),
            details: Some(details),
            timestamp: "2026-03-01T09:30:00Z".into(),
        });
        assert_eq!(row.target, "zone zone_a");
        assert_eq!(row.details, r#"{"open":false}"#);
        assert_eq!(row.time, "2026-03-01 09:30:00");
    }
}
