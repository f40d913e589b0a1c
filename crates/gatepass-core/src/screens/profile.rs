//! Profile screen.

use super::{Navigator, Route, Toast};
use crate::auth::AuthService;
use crate::session::User;

pub const PROFILE_FAILED_MESSAGE: &str = "Failed to load your profile. Please try again.";

pub struct ProfileController {
    auth: AuthService,
    navigator: Navigator,
    signing_out: bool,
    toast: Option<Toast>,
}

impl ProfileController {
    pub fn new(auth: AuthService, navigator: Navigator) -> Self {
        Self {
            auth,
            navigator,
            signing_out: false,
            toast: None,
        }
    }

    pub fn user(&self) -> Option<User> {
        self.auth.session().user()
    }

    pub fn is_signing_out(&self) -> bool {
        self.signing_out
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Reloads the profile from the server; the cached user stays on failure.
    pub async fn refresh(&mut self) -> Option<User> {
        match self.auth.refresh_user().await {
            Ok(user) => {
                self.toast = None;
                Some(user)
            }
            Err(e) => {
                self.toast = Some(Toast::from_error(&e, PROFILE_FAILED_MESSAGE));
                None
            }
        }
    }

    /// Signs out and lands on Login whatever the server says.
    pub async fn sign_out(&mut self) -> Route {
        self.signing_out = true;
        self.auth.logout().await;
        self.signing_out = false;
        self.navigator.replace(Route::Login)
    }
}
