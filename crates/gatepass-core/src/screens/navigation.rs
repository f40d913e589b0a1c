//! Route stack with an auth guard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use super::create_code::SuccessCodePayload;
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Login,
    Register,
    /// Carries the address the code was sent to, when known.
    VerifyEmail(Option<String>),
    ForgotPassword,
    Home,
    CreateVisitorCode,
    SuccessCode(Box<SuccessCodePayload>),
    ManageAccessCodes,
    Profile,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::VerifyEmail(_) => "/verify-email",
            Route::ForgotPassword => "/forgot-password",
            Route::Home => "/home",
            Route::CreateVisitorCode => "/create-visitor-code",
            Route::SuccessCode(_) => "/success-code",
            Route::ManageAccessCodes => "/manage-access-codes",
            Route::Profile => "/profile",
        }
    }

    /// Resolves a path typed by the user. Unknown paths land on Home, and
    /// `/success-code` needs a payload so it cannot be entered directly.
    pub fn from_path(path: &str) -> Route {
        match path.trim_end_matches('/') {
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/verify-email" => Route::VerifyEmail(None),
            "/forgot-password" => Route::ForgotPassword,
            "/create-visitor-code" => Route::CreateVisitorCode,
            "/manage-access-codes" => Route::ManageAccessCodes,
            "/profile" => Route::Profile,
            _ => Route::Home,
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Route::Login | Route::Register | Route::VerifyEmail(_) | Route::ForgotPassword
        )
    }
}

/// Navigation stack shared by all screens.
///
/// Protected routes are only reachable with a session and auth routes only
/// without one; anything else is redirected.
#[derive(Clone)]
pub struct Navigator {
    stack: Arc<Mutex<Vec<Route>>>,
    session: SessionStore,
}

impl Navigator {
    /// Starts on Home when signed in, Login otherwise.
    pub fn new(session: SessionStore) -> Self {
        let start = if session.is_authenticated() {
            Route::Home
        } else {
            Route::Login
        };
        Self {
            stack: Arc::new(Mutex::new(vec![start])),
            session,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Route>> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The route that would actually be shown for `route`.
    pub fn guard(&self, route: Route) -> Route {
        let signed_in = self.session.is_authenticated();
        match (route.requires_auth(), signed_in) {
            (true, false) => Route::Login,
            (false, true) => Route::Home,
            _ => route,
        }
    }

    pub fn current(&self) -> Route {
        self.lock().last().cloned().unwrap_or(Route::Login)
    }

    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    /// Pushes the guarded route and returns it.
    pub fn push(&self, route: Route) -> Route {
        let route = self.guard(route);
        tracing::debug!(path = route.path(), "push");
        self.lock().push(route.clone());
        route
    }

    /// Clears the stack and shows the guarded route.
    pub fn replace(&self, route: Route) -> Route {
        let route = self.guard(route);
        tracing::debug!(path = route.path(), "replace");
        let mut stack = self.lock();
        stack.clear();
        stack.push(route.clone());
        route
    }

    /// Pops the current route. The root route is never popped.
    pub fn back(&self) -> Route {
        let mut stack = self.lock();
        if stack.len() > 1 {
            stack.pop();
        }
        stack.last().cloned().unwrap_or(Route::Login)
    }

    /// Sends the user to Login if the session ended while a protected route
    /// was showing. Returns whether a redirect happened.
    pub fn sync_with_session(&self) -> bool {
        if self.session.is_authenticated() || !self.current().requires_auth() {
            return false;
        }
        tracing::info!("session ended, redirecting to login");
        self.replace(Route::Login);
        true
    }

    /// Follows session changes in a background task. Abort the handle to stop.
    pub fn watch_session(&self) -> JoinHandle<()> {
        let navigator = self.clone();
        let mut rx = self.session.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                navigator.sync_with_session();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::User;

    fn signed_in() -> SessionStore {
        let store = SessionStore::in_memory();
        store.sign_in("tok".into(), User::named(1, "Ada"));
        store
    }

    #[test]
    fn test_guard_redirects_both_ways() {
        let nav = Navigator::new(SessionStore::in_memory());
        assert_eq!(nav.current(), Route::Login);
        assert_eq!(nav.push(Route::ManageAccessCodes), Route::Login);
        assert_eq!(nav.push(Route::Register), Route::Register);

        let nav = Navigator::new(signed_in());
        assert_eq!(nav.current(), Route::Home);
        assert_eq!(nav.push(Route::ForgotPassword), Route::Home);
        assert_eq!(nav.push(Route::Profile), Route::Profile);
    }

    #[test]
    fn test_back_stops_at_root() {
        let nav = Navigator::new(signed_in());
        nav.push(Route::CreateVisitorCode);
        nav.push(Route::Profile);
        assert_eq!(nav.back(), Route::CreateVisitorCode);
        assert_eq!(nav.back(), Route::Home);
        assert_eq!(nav.back(), Route::Home);
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Route::from_path("/manage-access-codes/"), Route::ManageAccessCodes);
        assert_eq!(Route::from_path("/"), Route::Home);
        assert_eq!(Route::from_path("/success-code"), Route::Home);
        assert_eq!(Route::from_path("/verify-email").path(), "/verify-email");
    }

    #[tokio::test]
    async fn test_logout_redirects_to_login() {
        let session = signed_in();
        let nav = Navigator::new(session.clone());
        nav.push(Route::ManageAccessCodes);
        let handle = nav.watch_session();

        session.clear();

        tokio::time::timeout(Duration::from_secs(1), async {
            while nav.current() != Route::Login {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(nav.depth(), 1);
        handle.abort();
    }

    #[test]
    fn test_sync_leaves_auth_routes_alone() {
        let nav = Navigator::new(SessionStore::in_memory());
        nav.push(Route::Register);
        assert!(!nav.sync_with_session());
        assert_eq!(nav.current(), Route::Register);
    }
}
