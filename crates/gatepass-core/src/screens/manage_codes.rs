//! "Manage Access Codes" screen: list, filter, share and revoke.

use super::{Toast, capitalize_first_letter, format_timestamp};
use crate::api::ApiResult;
use crate::models::{AccessCode, CodeStatus};
use crate::query::{Query, QueryClient};

pub const REVOKED_MESSAGE: &str = "Access code revoked";
pub const REVOKE_FAILED_MESSAGE: &str = "Failed to revoke code. Please try again.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load access codes. Please try again.";

const CODES_KEY: &str = "access-codes";

/// Badge colour for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Success,
    Medium,
    Danger,
    Primary,
}

impl StatusColor {
    pub fn for_status(status: &CodeStatus) -> Self {
        match status {
            CodeStatus::Active => StatusColor::Success,
            CodeStatus::Expired => StatusColor::Medium,
            CodeStatus::Revoked => StatusColor::Danger,
            CodeStatus::Other(_) => StatusColor::Primary,
        }
    }
}

/// Status filter above the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(CodeStatus),
}

impl StatusFilter {
    pub fn matches(&self, code: &AccessCode) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => &code.status == status,
        }
    }
}

/// Rendered form of one code.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeCard {
    pub title: String,
    pub code: String,
    pub status_label: String,
    pub status_color: StatusColor,
    /// Only shown for codes whose status is `active`.
    pub expiry: Option<String>,
    pub created: Option<String>,
    /// Share and revoke are only offered for active codes.
    pub actionable: bool,
}

impl CodeCard {
    pub fn new(code: &AccessCode) -> Self {
        let expiry = (code.status == CodeStatus::Active).then(|| expiry_label(code));
        Self {
            title: capitalize_first_letter(&code.visitor_name),
            code: code.code.clone(),
            status_label: capitalize_first_letter(code.status.as_str()),
            status_color: StatusColor::for_status(&code.status),
            expiry,
            created: code.created_at.as_ref().map(format_timestamp),
            actionable: code.is_active(),
        }
    }
}

fn expiry_label(code: &AccessCode) -> String {
    match &code.remaining {
        Some(remaining) if remaining.value > 0.0 => {
            format!("Expires in {} {}", remaining.value, remaining.unit)
        }
        _ => "Expired".to_string(),
    }
}

/// Text handed to the platform share sheet. `None` for codes that can no
/// longer be used.
pub fn share_text(code: &AccessCode) -> Option<String> {
    if !code.is_active() {
        return None;
    }
    let mut text = format!(
        "Hello {}, your visitor access code is {}.",
        capitalize_first_letter(&code.visitor_name),
        code.code
    );
    if let Some(remaining) = &code.remaining {
        text.push_str(&format!(
            " It expires in {} {}.",
            remaining.value, remaining.unit
        ));
    }
    Some(text)
}

pub struct ManageCodesController {
    client: QueryClient,
    codes: Query<Vec<AccessCode>>,
    filter: StatusFilter,
    toast: Option<Toast>,
}

impl ManageCodesController {
    /// Mounts the screen and loads the list.
    pub async fn mount(client: &QueryClient) -> Self {
        let codes: Query<Vec<AccessCode>> = client.use_get(CODES_KEY, "access-codes").await;
        let toast = codes
            .error()
            .map(|e| Toast::from_error(&e, LOAD_FAILED_MESSAGE));
        Self {
            client: client.clone(),
            codes,
            filter: StatusFilter::All,
            toast,
        }
    }

    pub fn filter(&self) -> &StatusFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.codes.is_pending()
    }

    /// Every loaded code, unfiltered.
    pub fn codes(&self) -> Vec<AccessCode> {
        self.codes.data().unwrap_or_default()
    }

    /// Codes passing the current filter, in server order.
    pub fn visible(&self) -> Vec<AccessCode> {
        self.codes()
            .into_iter()
            .filter(|code| self.filter.matches(code))
            .collect()
    }

    pub fn cards(&self) -> Vec<CodeCard> {
        self.visible().iter().map(CodeCard::new).collect()
    }

    pub fn find(&self, code: &str) -> Option<AccessCode> {
        self.codes().into_iter().find(|c| c.code == code)
    }

    /// Pull-to-refresh.
    pub async fn refresh(&mut self) -> ApiResult<()> {
        match self.codes.refetch().await {
            Ok(_) => {
                self.toast = None;
                Ok(())
            }
            Err(e) => {
                self.toast = Some(Toast::from_error(&e, LOAD_FAILED_MESSAGE));
                Err(e)
            }
        }
    }

    /// Revokes an active code and reloads the list.
    ///
    /// Inactive codes are refused locally. The list is only reloaded after
    /// a successful revoke.
    pub async fn revoke(&mut self, code: &AccessCode) -> Result<(), Toast> {
        if !code.is_active() {
            let toast = Toast::danger(format!("Code {} is no longer active", code.code));
            self.toast = Some(toast.clone());
            return Err(toast);
        }

        let mutation = self
            .client
            .use_delete::<Option<serde_json::Value>>(format!("access-codes/{}", code.code))
            .invalidates(CODES_KEY)
            .invalidates("stats");
        if let Err(e) = mutation.mutate_async(&()).await {
            let toast = Toast::from_error(&e, REVOKE_FAILED_MESSAGE);
            self.toast = Some(toast.clone());
            return Err(toast);
        }

        tracing::info!(code = %code.code, "access code revoked");
        self.toast = Some(Toast::success(REVOKED_MESSAGE));
        if let Err(e) = self.codes.refetch().await {
            tracing::debug!(kind = %e.kind, "reload after revoke failed");
        }
        Ok(())
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
    use crate::screens::ToastTone;

    fn code(json: serde_json::Value) -> AccessCode {
        serde_json::from_value(json).unwrap()
    }

    fn client_for(server: &MockServer) -> QueryClient {
        let api = ApiClient::with_pipeline(server.uri(), Duration::from_secs(5), Pipeline::new())
            .unwrap();
        QueryClient::new(api)
    }

    fn list() -> serde_json::Value {
        json!({"data": [
            {"code": "AAA111", "visitor_name": "jane", "status": "active",
             "remaining": {"value": 2, "unit": "hours"}, "created_at": "2026-10-16T09:30:00Z"},
            {"code": "BBB222", "visitor_name": "tom", "status": "expired",
             "created_at": "2026-10-16 09:30:00"},
            {"code": "CCC333", "visitor_name": "ola", "status": "revoked",
             "created_at": "yesterday"}
        ]})
    }

    #[test]
    fn test_card_for_active_code() {
        let card = CodeCard::new(&code(json!({
            "code": "AB12CD", "visitor_name": "jane doe", "status": "active",
            "remaining": {"value": 3, "unit": "hours"}, "created_at": "2026-10-16T09:30:00Z"
        })));

        assert_eq!(card.title, "Jane doe");
        assert_eq!(card.status_label, "Active");
        assert_eq!(card.status_color, StatusColor::Success);
        assert_eq!(card.expiry.as_deref(), Some("Expires in 3 hours"));
        assert_eq!(card.created.as_deref(), Some("Oct 16, 2026, 9:30 AM"));
        assert!(card.actionable);
    }

    #[test]
    fn test_card_for_run_out_and_other_codes() {
        let run_out = CodeCard::new(&code(json!({
            "code": "X", "visitor_name": "a", "status": "active",
            "remaining": {"value": 0, "unit": "minutes"}
        })));
        assert_eq!(run_out.expiry.as_deref(), Some("Expired"));
        assert!(!run_out.actionable);

        let revoked = CodeCard::new(&code(json!({"code": "Y", "visitor_name": "b", "status": "revoked"})));
        assert_eq!(revoked.status_color, StatusColor::Danger);
        assert!(revoked.expiry.is_none());

        let odd = CodeCard::new(&code(json!({"code": "Z", "visitor_name": "c", "status": "pending"})));
        assert_eq!(odd.status_color, StatusColor::Primary);
        assert_eq!(odd.status_label, "Pending");
    }

    #[test]
    fn test_share_text_only_for_active_codes() {
        let active = code(json!({
            "code": "AB12CD", "visitor_name": "jane", "status": "active",
            "remaining": {"value": 1.5, "unit": "hours"}
        }));
        assert_eq!(
            share_text(&active).unwrap(),
            "Hello Jane, your visitor access code is AB12CD. It expires in 1.5 hours."
        );

        let expired = code(json!({"code": "X", "visitor_name": "a", "status": "expired"}));
        assert!(share_text(&expired).is_none());
    }

    #[tokio::test]
    async fn test_mount_and_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/access-codes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut screen = ManageCodesController::mount(&client).await;
        assert_eq!(screen.codes().len(), 3);
        assert!(screen.toast().is_none());

        screen.set_filter(StatusFilter::Only(CodeStatus::Expired));
        let visible = screen.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].code, "BBB222");
        assert_eq!(
            CodeCard::new(&visible[0]).created.as_deref(),
            Some("Oct 16, 2026, 9:30 AM")
        );
    }

    #[tokio::test]
    async fn test_revoke_active_code_then_reload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/access-codes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/access-codes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"code": "AAA111", "visitor_name": "jane", "status": "revoked"}
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/access-codes/AAA111"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut screen = ManageCodesController::mount(&client).await;
        let target = screen.find("AAA111").unwrap();

        screen.revoke(&target).await.unwrap();

        assert_eq!(screen.toast().unwrap().tone, ToastTone::Success);
        assert_eq!(screen.codes().len(), 1);
        assert_eq!(screen.codes()[0].status, CodeStatus::Revoked);
    }

    #[tokio::test]
    async fn test_revoke_refuses_inactive_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut screen = ManageCodesController::mount(&client).await;
        let expired = screen.find("BBB222").unwrap();

        let toast = screen.revoke(&expired).await.unwrap_err();
        assert_eq!(toast.tone, ToastTone::Danger);

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
    }

    #[tokio::test]
    async fn test_failed_load_shows_toast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let screen = ManageCodesController::mount(&client).await;
        assert!(screen.codes().is_empty());
        assert_eq!(screen.toast().unwrap().message, LOAD_FAILED_MESSAGE);
    }
}
