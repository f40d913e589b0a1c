//! `gatepass dashboard`: greeting, stats and recent activity.

use anyhow::{Result, bail};
use gatepass_core::app::App;
use gatepass_core::screens::Route;
use gatepass_core::screens::dashboard::{ActivityIcon, DashboardController};

use super::open;

pub async fn show(app: &App) -> Result<()> {
    open(app, Route::Home)?;
    let screen = DashboardController::mount(&app.queries, app.session.clone()).await;

    let Some(stats) = screen.stats() else {
        let message = screen
            .toast()
            .map_or_else(|| "No stats available".to_string(), ToString::to_string);
        bail!("{message}");
    };

    println!("{}", screen.greeting());
    println!();
    println!("Active codes:        {}", stats.active_codes);
    println!("Visitors this month: {}", stats.monthly_visitors);

    let activities = screen.activities();
    if !activities.is_empty() {
        println!();
        println!("Recent activity");
        for item in activities {
            let marker = match item.icon {
                ActivityIcon::AccessCode => "#",
                ActivityIcon::Visitor => "@",
            };
            match item.time {
                Some(time) => println!("  {marker} {}  ({time})", item.message),
                None => println!("  {marker} {}", item.message),
            }
        }
    }
    Ok(())
}
