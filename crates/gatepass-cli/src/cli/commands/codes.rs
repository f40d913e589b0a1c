//! Access code commands.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use gatepass_core::app::App;
use gatepass_core::models::{AccessCode, CodeStatus};
use gatepass_core::screens::create_code::{CreateCodeController, VisitorType};
use gatepass_core::screens::manage_codes::{
    CodeCard, ManageCodesController, StatusFilter, share_text,
};
use gatepass_core::screens::Route;
use serde_json::Value;

use super::open;

pub struct CreateArgs {
    pub name: String,
    pub purpose: String,
    pub notes: String,
    /// Raw count; presence makes this a group code
    pub visitors: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

pub async fn create(app: &App, args: CreateArgs, json: bool) -> Result<()> {
    open(app, Route::CreateVisitorCode)?;
    let mut screen = CreateCodeController::new(&app.queries, app.navigator.clone());
    {
        let form = screen.form_mut();
        form.visitor_name = args.name;
        form.visit_purpose = args.purpose;
        form.notes = args.notes;
        form.start_time = args.start;
        form.end_time = args.end;
        if let Some(count) = args.visitors {
            form.visitor_type = VisitorType::Multiple;
            form.visitor_count = count;
        }
    }

    let payload = screen.submit().await.map_err(|t| anyhow!("{t}"))?;

    if json {
        let out = serde_json::to_string_pretty(&payload).context("serialize code")?;
        println!("{out}");
        return Ok(());
    }

    println!("Code: {}", payload.code.code);
    println!("Visitor: {}", payload.code.visitor_name);
    if let Some(count) = payload.visitor_count {
        println!("Visitors: {count}");
    }
    if !payload.notes.is_empty() {
        println!("Notes: {}", payload.notes);
    }
    Ok(())
}

fn parse_filter(status: Option<&str>) -> StatusFilter {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None | Some("all") => StatusFilter::All,
        Some(s) => {
            let status: CodeStatus = serde_json::from_value(Value::from(s.to_lowercase()))
                .unwrap_or_else(|_| CodeStatus::Other(s.to_string()));
            StatusFilter::Only(status)
        }
    }
}

fn print_card(card: &CodeCard) {
    let expiry = card.expiry.as_deref().unwrap_or("");
    println!(
        "{:<10} {:<8} {:<24} {}",
        card.code, card.status_label, card.title, expiry
    );
}

async fn mount_list(app: &App) -> Result<ManageCodesController> {
    open(app, Route::ManageAccessCodes)?;
    let screen = ManageCodesController::mount(&app.queries).await;
    if let Some(toast) = screen.toast() {
        bail!("{toast}");
    }
    Ok(screen)
}

fn find(screen: &ManageCodesController, code: &str) -> Result<AccessCode> {
    screen
        .find(code.trim())
        .ok_or_else(|| anyhow!("No access code {code}"))
}

pub async fn list(app: &App, status: Option<&str>, json: bool) -> Result<()> {
    let mut screen = mount_list(app).await?;
    screen.set_filter(parse_filter(status));

    if json {
        let out = serde_json::to_string_pretty(&screen.visible()).context("serialize codes")?;
        println!("{out}");
        return Ok(());
    }

    let cards = screen.cards();
    if cards.is_empty() {
        println!("No access codes");
        return Ok(());
    }
    for card in &cards {
        print_card(card);
    }
    Ok(())
}

pub async fn revoke(app: &App, code: &str) -> Result<()> {
    let mut screen = mount_list(app).await?;
    let target = find(&screen, code)?;

    screen.revoke(&target).await.map_err(|t| anyhow!("{t}"))?;
    println!("Revoked {}", target.code);
    Ok(())
}

pub async fn share(app: &App, code: &str) -> Result<()> {
    let screen = mount_list(app).await?;
    let target = find(&screen, code)?;

    let Some(text) = share_text(&target) else {
        bail!("Code {} is no longer active", target.code);
    };
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(None), StatusFilter::All);
        assert_eq!(parse_filter(Some("all")), StatusFilter::All);
        assert_eq!(
            parse_filter(Some("Active")),
            StatusFilter::Only(CodeStatus::Active)
        );
        assert_eq!(
            parse_filter(Some("pending")),
            StatusFilter::Only(CodeStatus::Other("pending".into()))
        );
    }
}
