//! Request/response pipeline stages.
//!
//! Outbound requests pass through every [`RequestStage`] and inbound responses
//! through every [`ResponseStage`], each in registration order. Stages are the
//! only place where the HTTP layer touches the session.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response, StatusCode};

use crate::session::SessionStore;

/// Transforms a request before it is dispatched.
pub trait RequestStage: Send + Sync {
    fn on_request(&self, request: Request) -> Request;
}

/// Observes (and may replace) a response before it reaches the caller.
///
/// Stages may trigger side effects but must hand a response back; failures
/// are decided by the client after the whole chain ran.
pub trait ResponseStage: Send + Sync {
    fn on_response(&self, response: Response) -> Response;
}

/// Ordered set of request and response stages.
#[derive(Default, Clone)]
pub struct Pipeline {
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stages every authenticated client needs: bearer injection and
    /// logout on 401.
    pub fn for_session(session: &SessionStore) -> Self {
        Self::new()
            .with_request_stage(BearerAuth::new(session.clone()))
            .with_response_stage(LogoutOnUnauthorized::new(session.clone()))
    }

    #[must_use]
    pub fn with_request_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.request_stages.push(Arc::new(stage));
        self
    }

    #[must_use]
    pub fn with_response_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        self.response_stages.push(Arc::new(stage));
        self
    }

    pub fn apply_request(&self, request: Request) -> Request {
        self.request_stages
            .iter()
            .fold(request, |req, stage| stage.on_request(req))
    }

    pub fn apply_response(&self, response: Response) -> Response {
        self.response_stages
            .iter()
            .fold(response, |resp, stage| stage.on_response(resp))
    }
}

/// Attaches `Authorization: Bearer <token>` when the session holds a token.
pub struct BearerAuth {
    session: SessionStore,
}

impl BearerAuth {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }
}

impl RequestStage for BearerAuth {
    fn on_request(&self, mut request: Request) -> Request {
        let Some(token) = self.session.token() else {
            return request;
        };

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("session token is not a valid header value, sending without it");
            }
        }
        request
    }
}

/// Clears the session whenever the server answers 401.
pub struct LogoutOnUnauthorized {
    session: SessionStore,
}

impl LogoutOnUnauthorized {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }
}

impl ResponseStage for LogoutOnUnauthorized {
    fn on_response(&self, response: Response) -> Response {
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(url = %response.url().path(), "received 401, ending session");
            self.session.clear();
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::session::User;

    fn request() -> Request {
        Request::new(Method::GET, "http://localhost/v1/user".parse().unwrap())
    }

    fn signed_in(token: &str) -> SessionStore {
        let store = SessionStore::in_memory();
        store.sign_in(token.to_string(), User::named(1, "Ada"));
        store
    }

    #[test]
    fn test_bearer_added_when_token_present() {
        let store = signed_in("tok-123");
        let req = BearerAuth::new(store).on_request(request());
        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer tok-123"
        );
    }

    #[test]
    fn test_no_header_without_session() {
        let req = BearerAuth::new(SessionStore::in_memory()).on_request(request());
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_token_is_dropped_not_panicking() {
        let store = signed_in("bad\ntoken");
        let req = BearerAuth::new(store).on_request(request());
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    struct Tag(&'static str, Arc<std::sync::Mutex<Vec<&'static str>>>);

    impl RequestStage for Tag {
        fn on_request(&self, request: Request) -> Request {
            self.1.lock().unwrap().push(self.0);
            request
        }
    }

    #[test]
    fn test_stages_run_in_registration_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_request_stage(Tag("first", Arc::clone(&seen)))
            .with_request_stage(Tag("second", Arc::clone(&seen)))
            .with_request_stage(Tag("third", Arc::clone(&seen)));

        pipeline.apply_request(request());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
