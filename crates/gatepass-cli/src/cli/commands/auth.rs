//! Account commands.

use anyhow::{Result, anyhow, bail};
use gatepass_core::app::App;
use gatepass_core::screens::auth::{
    ForgotPasswordController, LoginController, RegisterController, RegisterForm,
    VerifyEmailController,
};
use gatepass_core::screens::profile::ProfileController;
use gatepass_core::screens::{Route, Toast};

use super::open;

pub struct RegisterArgs {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirmation: String,
}

fn print_toast(toast: Option<&Toast>) {
    if let Some(toast) = toast {
        println!("{toast}");
    }
}

pub async fn login(app: &App, email: String, password: String) -> Result<()> {
    let mut screen = LoginController::new(app.auth.clone(), app.navigator.clone());
    screen.form.email = email;
    screen.form.password = password;

    let session = screen.submit().await.map_err(|t| anyhow!("{t}"))?;
    let name = session.user.map(|u| u.full_name()).unwrap_or_default();
    println!("Signed in as {name}");
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    let was_signed_in = app.session.is_authenticated();
    let mut screen = ProfileController::new(app.auth.clone(), app.navigator.clone());
    screen.sign_out().await;
    if was_signed_in {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub async fn register(app: &App, args: RegisterArgs) -> Result<()> {
    open(app, Route::Register)?;
    let mut screen = RegisterController::new(app.auth.clone(), app.navigator.clone());
    screen.form = RegisterForm {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        phone: args.phone.unwrap_or_default(),
        password: args.password,
        password_confirmation: args.password_confirmation,
    };

    let route = screen.submit().await.map_err(|t| anyhow!("{t}"))?;
    print_toast(screen.toast());
    if let Route::VerifyEmail(Some(email)) = route {
        println!("Next: gatepass verify-email --email {email} --code <CODE>");
    }
    Ok(())
}

pub async fn verify_email(app: &App, email: String, code: String) -> Result<()> {
    open(app, Route::VerifyEmail(None))?;
    let mut screen =
        VerifyEmailController::new(app.auth.clone(), app.navigator.clone(), Some(email));
    screen.form.code = code;

    screen.submit().await.map_err(|t| anyhow!("{t}"))?;
    print_toast(screen.toast());
    Ok(())
}

pub async fn forgot_password(app: &App, email: String) -> Result<()> {
    open(app, Route::ForgotPassword)?;
    let mut screen = ForgotPasswordController::new(app.auth.clone(), app.navigator.clone());
    screen.email = email;

    screen.submit().await.map_err(|t| anyhow!("{t}"))?;
    print_toast(screen.toast());
    Ok(())
}

pub async fn whoami(app: &App, refresh: bool) -> Result<()> {
    open(app, Route::Profile)?;
    let mut screen = ProfileController::new(app.auth.clone(), app.navigator.clone());
    if refresh && screen.refresh().await.is_none() {
        // A 401 during refresh ends the session.
        if !app.session.is_authenticated() {
            bail!("Session expired. Run `gatepass login` again.");
        }
        print_toast(screen.toast());
    }

    let Some(user) = screen.user() else {
        bail!("Not signed in. Run `gatepass login` first.");
    };
    println!("{}", user.full_name());
    if let Some(email) = &user.email {
        println!("Email: {email}");
    }
    if let Some(phone) = &user.phone {
        println!("Phone: {phone}");
    }
    println!("ID: {}", user.id);
    Ok(())
}
