//! Config subcommand handlers.

use dialoguer::Input;

use gopark_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::util::prompt_err;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = crate::load_effective_config(global)?;
            let out = output::render_single(global.output, &cfg, config_detail, |c| {
                c.api.base_url.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            let current = config::load_config_or_default();
            eprintln!("GoPark CLI configuration");
            eprintln!("   Config path: {}\n", config_path.display());

            let base_url: String = Input::new()
                .with_prompt("REST API URL")
                .default(current.api.base_url.clone())
                .interact_text()
                .map_err(prompt_err)?;

            let ws_url: String = Input::new()
                .with_prompt("Live feed URL")
                .default(current.live.ws_url.clone())
                .interact_text()
                .map_err(prompt_err)?;

            let default_gate: String = Input::new()
                .with_prompt("Default gate (blank for none)")
                .default(current.default_gate.clone().unwrap_or_default())
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let mut cfg = current;
            cfg.api.base_url = base_url.trim().to_owned();
            cfg.live.ws_url = ws_url.trim().to_owned();
            cfg.default_gate = Some(default_gate.trim().to_owned()).filter(|g| !g.is_empty());

            // Reject bad URLs before anything hits disk.
            cfg.api_url()?;
            cfg.ws_url()?;

            config::save_to(&cfg, &config_path)?;
            eprintln!("\nConfiguration written to {}", config_path.display());
            eprintln!("  Next: gopark login");
            Ok(())
        }
    }
}

fn config_detail(cfg: &Config) -> String {
    output::detail(&[
        ("Config file", config::config_path().display().to_string()),
        (
            "Default gate",
            cfg.default_gate.clone().unwrap_or_else(|| "-".into()),
        ),
        ("API URL", cfg.api.base_url.clone()),
        ("Timeout", format!("{}s", cfg.api.timeout_secs)),
        ("Live feed URL", cfg.live.ws_url.clone()),
        (
            "Reconnect",
            format!(
                "{} attempts, {} ms apart",
                cfg.live.max_reconnect_attempts, cfg.live.reconnect_delay_ms
            ),
        ),
    ])
}
