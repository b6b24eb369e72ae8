//! Login, logout and whoami.

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};

use gopark_core::{Parking, User};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::commands::util::prompt_err;
use crate::error::CliError;
use crate::output;

pub async fn login(parking: &Parking, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let username = match args.username {
        Some(u) => u,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(prompt_err)?,
    };
    let password = match args.password {
        Some(p) => SecretString::from(p),
        None => SecretString::from(rpassword::prompt_password("Password: ").map_err(prompt_err)?),
    };

    if username.trim().is_empty() || password.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let session = parking
        .login(username.trim(), password.expose_secret())
        .await?;
    gopark_config::save_session(&session)?;

    let out = output::render_single(
        global.output,
        &session.user,
        |u| format!("Logged in as {} ({})", u.username, u.role),
        |u| u.username.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn logout(parking: &Parking, global: &GlobalOpts) -> Result<(), CliError> {
    parking.logout();
    gopark_config::clear_session()?;
    if !global.quiet {
        eprintln!("Logged out");
    }
    Ok(())
}

pub fn whoami(parking: &Parking, global: &GlobalOpts) -> Result<(), CliError> {
    let session = parking.session().ok_or(CliError::NotLoggedIn)?;
    let out = output::render_single(global.output, &session.user, user_detail, |u| {
        u.username.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn user_detail(user: &User) -> String {
    output::detail(&[
        ("ID", user.id.clone()),
        ("Username", user.username.clone()),
        ("Role", user.role.to_string()),
    ])
}
