//! Sign-in, registration, logout and status commands.

use super::{build_context, next_step_hint, prompt, prompt_optional};
use crate::output::{self, OutputFormat};
use crate::validate;
use anyhow::Result;
use pastibot_api::{RegisterRequest, Role};
use pastibot_session::{
    destination_for, FederatedProvider, RedirectListener, SessionState, SignInOutcome,
};
use tracing::debug;

/// Report a completed sign-in: who, and what to do next.
fn report_sign_in(outcome: &SignInOutcome, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Signed in as {} <{}>", outcome.user.name, outcome.user.email);
            if let Some(hint) = next_step_hint(&outcome.destination) {
                println!("{}", hint);
            }
            if outcome.needs_password {
                println!("Tip: set a password with 'pastibot password set' to enable email login");
            }
        }
        OutputFormat::Json => output::print_json(outcome)?,
    }
    Ok(())
}

/// Sign in with email/password, or through the browser with --google.
pub async fn login(
    email: Option<&str>,
    google: bool,
    role: Option<Role>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = build_context()?;

    // Restore first; a reachable backend with a good token means we are done.
    if let Err(e) = ctx.manager.restore().await {
        debug!(error = %e, "Restore failed; continuing to sign-in");
    }
    if ctx.manager.is_authenticated() {
        let snapshot = ctx.manager.snapshot();
        let email = snapshot.user.map(|u| u.email).unwrap_or_default();
        output::print_success(&format!("Already signed in as {}", email), format);
        return Ok(());
    }

    if google {
        return login_with_google(&ctx, role.unwrap_or_default(), format).await;
    }

    let email = match email {
        Some(email) => email.to_string(),
        None => prompt("Email")?,
    };
    validate::validate_email(&email).map_err(anyhow::Error::msg)?;

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    println!("Signing in...");
    let outcome = ctx.manager.login_with_credentials(&email, &password).await?;
    report_sign_in(&outcome, format)
}

/// Browser hand-off: open the provider entry URL, wait for the redirect
/// on a local listener, then resume the sign-in with its token.
async fn login_with_google(
    ctx: &super::CliContext,
    role: Role,
    format: &OutputFormat,
) -> Result<()> {
    let listener = RedirectListener::with_defaults();
    let handoff =
        ctx.manager
            .begin_federated(FederatedProvider::Google, role, &listener.return_url())?;

    println!("Opening the browser to continue the sign-in...");
    if open::that(handoff.auth_url.as_str()).is_err() {
        println!("Could not open a browser. Visit this URL to continue:");
        println!("  {}", handoff.auth_url);
    }

    let redirect = listener.wait_for_redirect(Some(&handoff.state)).await?;
    let token = redirect.into_token()?;

    let outcome = ctx.manager.resume_federated(&token).await?;
    report_sign_in(&outcome, format)
}

/// Create an account interactively and sign in with it.
pub async fn register(format: &OutputFormat) -> Result<()> {
    let ctx = build_context()?;

    let name = prompt("Name")?;
    validate::validate_name(&name).map_err(anyhow::Error::msg)?;

    let email = prompt("Email")?;
    validate::validate_email(&email).map_err(anyhow::Error::msg)?;

    let password = rpassword::prompt_password("Password: ")?;
    validate::validate_password(&password).map_err(anyhow::Error::msg)?;
    let confirmation = rpassword::prompt_password("Confirm password: ")?;
    if password != confirmation {
        anyhow::bail!("Passwords do not match");
    }

    let role = match prompt("Role (caregiver/patient)")?.to_lowercase().as_str() {
        "caregiver" => Role::Caregiver,
        "patient" => Role::Patient,
        other => anyhow::bail!("Unknown role '{}': expected caregiver or patient", other),
    };

    let caregiver_code = if role == Role::Patient {
        prompt_optional("Caregiver share code")?
    } else {
        None
    };
    let gender = prompt_optional("Gender")?;

    println!("Creating account...");
    let request = RegisterRequest::new(name, email, password, role, gender, caregiver_code);
    let outcome = ctx.manager.register(&request).await?;
    report_sign_in(&outcome, format)
}

/// Sign out and clear the stored session.
///
/// Purely local and safe to repeat; no backend call is made.
pub fn logout(format: &OutputFormat) -> Result<()> {
    let ctx = build_context()?;
    ctx.manager.logout();
    output::print_success("Signed out", format);
    Ok(())
}

/// Show session state, the signed-in account, and the next destination.
pub async fn status(format: &OutputFormat) -> Result<()> {
    let ctx = build_context()?;
    let backend = ctx.manager.api().base_url().to_string();

    match ctx.manager.restore().await {
        Ok(state) => {
            let snapshot = ctx.manager.snapshot();
            match format {
                OutputFormat::Text => {
                    println!("Backend:  {}", backend);
                    println!("Session:  {}", state_label(&state));
                    if let Some(user) = &snapshot.user {
                        println!("Name:     {}", user.name);
                        println!("Email:    {}", user.email);
                        println!("Role:     {}", user.role);
                        println!("Next:     {}", destination_for(user).path());
                    }
                }
                OutputFormat::Json => {
                    let destination = snapshot.user.as_ref().map(destination_for);
                    let payload = serde_json::json!({
                        "backend": backend,
                        "state": state,
                        "user": snapshot.user,
                        "destination": destination,
                    });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
            }
        }
        Err(e) => {
            // Transient failure: the stored sign-in is kept for next time
            let has_stored = ctx.hints.has_session().unwrap_or(false);
            match format {
                OutputFormat::Text => {
                    println!("Backend:  {}", backend);
                    println!("Session:  unknown ({})", e);
                    if has_stored {
                        println!("A stored sign-in was kept and will be retried next time.");
                    }
                }
                OutputFormat::Json => {
                    let payload = serde_json::json!({
                        "backend": backend,
                        "state": "unknown",
                        "error": e.to_string(),
                        "storedSession": has_stored,
                    });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
            }
        }
    }

    Ok(())
}

fn state_label(state: &SessionState) -> &'static str {
    match state {
        SessionState::Authenticated => "signed in",
        SessionState::Anonymous => "not signed in",
        SessionState::Bootstrapping
        | SessionState::Restoring
        | SessionState::LoggingIn
        | SessionState::LoggingOut => "in progress",
    }
}
