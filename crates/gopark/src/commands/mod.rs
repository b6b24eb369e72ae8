//! Command dispatch: bridges CLI args -> `Parking` calls -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod live;
pub mod tickets;
pub mod util;
pub mod zones;

use gopark_config::Config;
use gopark_core::Parking;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    parking: &Parking,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(parking, args, global).await,
        Command::Logout => auth::logout(parking, global),
        Command::Whoami => auth::whoami(parking, global),
        Command::Gates => zones::gates(parking, global).await,
        Command::Zones(args) => zones::zones(parking, config, &args, global).await,
        Command::Report => zones::report(parking, global).await,
        Command::ZoneOpen(args) => zones::zone_open(parking, &args, global).await,
        Command::Checkin(args) => tickets::checkin(parking, config, args, global).await,
        Command::Checkout(args) => tickets::checkout(parking, &args, global).await,
        Command::Watch(args) => live::watch(parking, config, &args, global).await,
        Command::Audit(args) => live::audit(parking, &args, global).await,
        // Config, Completions and Ping are handled before dispatch
        Command::Config(_) | Command::Completions(_) | Command::Ping(_) => unreachable!(),
    }
}
