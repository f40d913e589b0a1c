//! Home screen.

use super::{Toast, format_date};
use crate::api::ApiResult;
use crate::models::{Activity, Stat};
use crate::query::{Query, QueryClient};
use crate::session::SessionStore;

pub const STATS_FAILED_MESSAGE: &str = "Failed to load stats. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityIcon {
    AccessCode,
    Visitor,
}

impl ActivityIcon {
    pub fn for_message(message: &str) -> Self {
        if message.contains("Access code") {
            ActivityIcon::AccessCode
        } else {
            ActivityIcon::Visitor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityItem {
    pub icon: ActivityIcon,
    pub message: String,
    pub time: Option<String>,
}

impl From<&Activity> for ActivityItem {
    fn from(activity: &Activity) -> Self {
        Self {
            icon: ActivityIcon::for_message(&activity.message),
            message: activity.message.clone(),
            time: activity.time.as_deref().map(format_date),
        }
    }
}

pub struct DashboardController {
    session: SessionStore,
    stats: Query<Stat>,
    toast: Option<Toast>,
}

impl DashboardController {
    pub async fn mount(client: &QueryClient, session: SessionStore) -> Self {
        let stats: Query<Stat> = client.use_get("stats", "access-codes/stats").await;
        let toast = stats
            .error()
            .map(|e| Toast::from_error(&e, STATS_FAILED_MESSAGE));
        Self {
            session,
            stats,
            toast,
        }
    }

    /// `Welcome, <first name>`; just `Welcome` when the profile is unknown.
    pub fn greeting(&self) -> String {
        match self.session.user() {
            Some(user) if !user.first_name.trim().is_empty() => {
                format!("Welcome, {}", user.first_name)
            }
            _ => "Welcome".to_string(),
        }
    }

    pub fn stats(&self) -> Option<Stat> {
        self.stats.data()
    }

    pub fn is_refreshing(&self) -> bool {
        self.stats.is_pending()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn activities(&self) -> Vec<ActivityItem> {
        self.stats()
            .map(|s| s.activities.iter().map(ActivityItem::from).collect())
            .unwrap_or_default()
    }

    /// Pull-to-refresh.
    pub async fn refresh(&mut self) -> ApiResult<Stat> {
        let result = self.stats.refetch().await;
        self.toast = result
            .as_ref()
            .err()
            .map(|e| Toast::from_error(e, STATS_FAILED_MESSAGE));
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::{ApiClient, Pipeline};
    use crate::session::User;

    fn client_for(server: &MockServer) -> QueryClient {
        let api = ApiClient::with_pipeline(server.uri(), Duration::from_secs(5), Pipeline::new())
            .unwrap();
        QueryClient::new(api)
    }

    #[test]
    fn test_activity_icon() {
        assert_eq!(
            ActivityIcon::for_message("Access code AB12CD created"),
            ActivityIcon::AccessCode
        );
        assert_eq!(
            ActivityIcon::for_message("Jane checked in"),
            ActivityIcon::Visitor
        );
    }

    #[tokio::test]
    async fn test_mount_loads_stats_and_greets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/access-codes/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
                "active_codes": 2,
                "monthly_visitors": 14,
                "activities": [
                    {"message": "Access code AB12CD created", "time": "2026-10-16T09:30:00Z"},
                    {"message": "Jane checked in"}
                ]
            }})))
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        session.sign_in("tok".into(), User::named(1, "Ada"));
        let dashboard = DashboardController::mount(&client_for(&server), session).await;

        assert_eq!(dashboard.greeting(), "Welcome, Ada");
        assert_eq!(dashboard.stats().unwrap().monthly_visitors, 14);

        let items = dashboard.activities();
        assert_eq!(items[0].icon, ActivityIcon::AccessCode);
        assert_eq!(items[0].time.as_deref(), Some("Oct 16, 2026, 9:30 AM"));
        assert_eq!(items[1].icon, ActivityIcon::Visitor);
        assert!(items[1].time.is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"active_codes": 5}})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mut dashboard =
            DashboardController::mount(&client_for(&server), SessionStore::in_memory()).await;
        assert_eq!(dashboard.greeting(), "Welcome");

        dashboard.refresh().await.unwrap_err();
        assert_eq!(dashboard.stats().unwrap().active_codes, 5);
        assert_eq!(dashboard.toast().unwrap().message, STATS_FAILED_MESSAGE);
    }
}
