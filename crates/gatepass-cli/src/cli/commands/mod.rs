//! CLI command handlers.

pub mod auth;
pub mod codes;
pub mod config;
pub mod dashboard;

use anyhow::{Result, bail};
use gatepass_core::app::App;
use gatepass_core::screens::Route;

/// Fails unless the navigation guard lets the current session open `route`.
fn open(app: &App, route: Route) -> Result<()> {
    let shown = app.navigator.push(route.clone());
    if shown != route {
        if shown == Route::Login {
            bail!("Not signed in. Run `gatepass login` first.");
        }
        bail!("Already signed in. Run `gatepass logout` first.");
    }
    Ok(())
}
