//! Session command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use wayfare_core::Wayfare;
use wayfare_core::auth::{decode_claims, mask_token};
use wayfare_core::permissions::Actions;

use super::new_table;

/// Set to skip opening the browser during login.
const NO_BROWSER_ENV: &str = "WAYFARE_NO_BROWSER";

pub async fn login(
    app: &Wayfare,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
    no_browser: bool,
) -> Result<()> {
    let (access, refresh) = match access_token {
        Some(access) => (access.to_string(), refresh_token.map(ToString::to_string)),
        None => prompt_for_tokens(app, no_browser)?,
    };

    let user = app
        .sign_in(&access, refresh.as_deref())
        .context("store session tokens")?;

    match user {
        Some(user) => println!("Logged in as {} <{}>", user.name, user.email),
        None => println!("Logged in."),
    }
    if refresh.is_none() {
        println!("No refresh token stored; you will need to log in again when the session expires.");
    }

    // Surface a bad token now rather than on the first booking.
    if let Err(err) = app.permissions().await {
        tracing::warn!(error = %err, "permission check after login failed");
        eprintln!("Warning: could not verify the session: {err}");
    }
    Ok(())
}

fn prompt_for_tokens(app: &Wayfare, no_browser: bool) -> Result<(String, Option<String>)> {
    let url = app.auth().google_login_url();
    let skip_browser = no_browser || std::env::var_os(NO_BROWSER_ENV).is_some();

    println!("Sign in with Google at:\n  {url}");
    if !skip_browser && let Err(err) = open::that(&url) {
        tracing::debug!(error = %err, "failed to open browser");
        println!("Could not open a browser; open the link above manually.");
    }
    println!("After signing in, copy the access_token and refresh_token cookies.");

    let access = prompt("Access token: ")?;
    if access.is_empty() {
        anyhow::bail!("No access token entered");
    }
    let refresh = prompt("Refresh token (optional): ")?;
    Ok((access, (!refresh.is_empty()).then_some(refresh)))
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read from stdin")?;
    Ok(line.trim().to_string())
}

pub async fn logout(app: &Wayfare) -> Result<()> {
    if app.logout().await? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub fn whoami(app: &Wayfare) {
    let Some(access) = app.client().tokens().access_token() else {
        println!("Not logged in.");
        return;
    };

    match app.user() {
        Some(user) => {
            println!("Name:   {}", user.name);
            println!("Email:  {}", user.email);
            println!("ID:     {}", user.id);
        }
        None => println!("Logged in (token carries no profile)."),
    }
    println!("Token:  {}", mask_token(&access));
    if let Some(expires_at) = decode_claims(&access).and_then(|c| c.expires_at()) {
        let state = if expires_at <= Utc::now() {
            " (expired, will refresh on next request)"
        } else {
            ""
        };
        println!("Expires: {}{state}", expires_at.format("%Y-%m-%d %H:%M UTC"));
    }
}

pub async fn permissions(app: &Wayfare) -> Result<()> {
    super::require_login(app)?;
    let menus = app.permissions().await.context("fetch permissions")?;
    if menus.is_empty() {
        println!("No permissions granted.");
        return Ok(());
    }

    let mut table = new_table(vec!["Menu", "Actions"]);
    for menu in &menus {
        table.add_row(vec![menu.menu_name.clone(), action_list(menu.actions)]);
        for sub in menu.sub_menus.iter().flatten() {
            table.add_row(vec![format!("  └ {}", sub.menu_name), action_list(sub.actions)]);
        }
    }
    println!("{table}");
    Ok(())
}

fn action_list(actions: Option<Actions>) -> String {
    let names: Vec<&str> = actions
        .map(|a| a.checked().into_iter().map(|x| x.as_str()).collect())
        .unwrap_or_default();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
