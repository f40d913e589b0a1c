//! Sign-in, sign-up and account recovery screens.

use super::{FormStatus, Navigator, Phase, REQUIRED_FIELDS_MESSAGE, Route, Toast, all_filled};
use crate::auth::{AuthService, Credentials, EmailVerification, PasswordReset, Registration};
use crate::session::Session;

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";
pub const REGISTER_FAILED_MESSAGE: &str = "Registration failed. Please try again.";
pub const VERIFY_FAILED_MESSAGE: &str = "Verification failed. Please try again.";
pub const RESET_FAILED_MESSAGE: &str = "Failed to send reset link. Please try again.";
pub const VERIFIED_MESSAGE: &str = "Email verified. You can now sign in.";
pub const RESET_SENT_MESSAGE: &str = "Password reset link sent to your email";

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub struct LoginController {
    pub form: LoginForm,
    status: FormStatus,
    auth: AuthService,
    navigator: Navigator,
}

impl LoginController {
    pub fn new(auth: AuthService, navigator: Navigator) -> Self {
        Self {
            form: LoginForm::default(),
            status: FormStatus::default(),
            auth,
            navigator,
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.status.toast()
    }

    pub async fn submit(&mut self) -> Result<Session, Toast> {
        self.status.validating();
        if !all_filled(&[&self.form.email, &self.form.password]) {
            return Err(self.status.rejected(Toast::danger(REQUIRED_FIELDS_MESSAGE)));
        }

        self.status.submitting();
        let credentials = Credentials {
            email: self.form.email.trim().to_string(),
            password: self.form.password.clone(),
        };
        match self.auth.login(&credentials).await {
            Ok(session) => {
                self.form.password.clear();
                self.status.succeeded(None);
                self.navigator.replace(Route::Home);
                Ok(session)
            }
            Err(e) => Err(self
                .status
                .rejected(Toast::from_error(&e, LOGIN_FAILED_MESSAGE))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, &'static str> {
        if !all_filled(&[
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.password,
            &self.password_confirmation,
        ]) {
            return Err(REQUIRED_FIELDS_MESSAGE);
        }
        if !looks_like_email(&self.email) {
            return Err(INVALID_EMAIL_MESSAGE);
        }
        if self.password != self.password_confirmation {
            return Err(PASSWORD_MISMATCH_MESSAGE);
        }

        let phone = self.phone.trim();
        Ok(Registration {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
            password: self.password.clone(),
            password_confirmation: self.password_confirmation.clone(),
        })
    }
}

pub struct RegisterController {
    pub form: RegisterForm,
    status: FormStatus,
    auth: AuthService,
    navigator: Navigator,
}

impl RegisterController {
    pub fn new(auth: AuthService, navigator: Navigator) -> Self {
        Self {
            form: RegisterForm::default(),
            status: FormStatus::default(),
            auth,
            navigator,
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.status.toast()
    }

    /// Creates the account and moves on to email verification.
    pub async fn submit(&mut self) -> Result<Route, Toast> {
        self.status.validating();
        let registration = match self.form.validate() {
            Ok(registration) => registration,
            Err(message) => return Err(self.status.rejected(Toast::danger(message))),
        };

        self.status.submitting();
        match self.auth.register(&registration).await {
            Ok(message) => {
                self.status.succeeded(message.map(Toast::success));
                Ok(self
                    .navigator
                    .push(Route::VerifyEmail(Some(registration.email))))
            }
            Err(e) => Err(self
                .status
                .rejected(Toast::from_error(&e, REGISTER_FAILED_MESSAGE))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyEmailForm {
    pub email: String,
    pub code: String,
}

pub struct VerifyEmailController {
    pub form: VerifyEmailForm,
    status: FormStatus,
    auth: AuthService,
    navigator: Navigator,
}

impl VerifyEmailController {
    /// `email` pre-fills the form when arriving from registration.
    pub fn new(auth: AuthService, navigator: Navigator, email: Option<String>) -> Self {
        Self {
            form: VerifyEmailForm {
                email: email.unwrap_or_default(),
                code: String::new(),
            },
            status: FormStatus::default(),
            auth,
            navigator,
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.status.toast()
    }

    pub async fn submit(&mut self) -> Result<Route, Toast> {
        self.status.validating();
        if !all_filled(&[&self.form.email, &self.form.code]) {
            return Err(self.status.rejected(Toast::danger(REQUIRED_FIELDS_MESSAGE)));
        }

        self.status.submitting();
        let verification = EmailVerification {
            email: self.form.email.trim().to_string(),
            code: self.form.code.trim().to_string(),
        };
        match self.auth.verify_email(&verification).await {
            Ok(message) => {
                let message = message.unwrap_or_else(|| VERIFIED_MESSAGE.to_string());
                self.status.succeeded(Some(Toast::success(message)));
                Ok(self.navigator.replace(Route::Login))
            }
            Err(e) => Err(self
                .status
                .rejected(Toast::from_error(&e, VERIFY_FAILED_MESSAGE))),
        }
    }
}

pub struct ForgotPasswordController {
    pub email: String,
    status: FormStatus,
    auth: AuthService,
    navigator: Navigator,
}

impl ForgotPasswordController {
    pub fn new(auth: AuthService, navigator: Navigator) -> Self {
        Self {
            email: String::new(),
            status: FormStatus::default(),
            auth,
            navigator,
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.status.toast()
    }

    pub async fn submit(&mut self) -> Result<Route, Toast> {
        self.status.validating();
        if !all_filled(&[&self.email]) {
            return Err(self.status.rejected(Toast::danger(REQUIRED_FIELDS_MESSAGE)));
        }
        if !looks_like_email(&self.email) {
            return Err(self.status.rejected(Toast::danger(INVALID_EMAIL_MESSAGE)));
        }

        self.status.submitting();
        let request = PasswordReset {
            email: self.email.trim().to_string(),
        };
        match self.auth.forgot_password(&request).await {
            Ok(message) => {
                let message = message.unwrap_or_else(|| RESET_SENT_MESSAGE.to_string());
                self.status.succeeded(Some(Toast::success(message)));
                Ok(self.navigator.replace(Route::Login))
            }
            Err(e) => Err(self
                .status
                .rejected(Toast::from_error(&e, RESET_FAILED_MESSAGE))),
        }
    }
}
