//! Role, profile and password commands.

use super::{build_context, next_step_hint, prompt, prompt_optional, require_session};
use crate::output::{self, OutputFormat};
use crate::validate;
use anyhow::Result;
use pastibot_api::{ProfileUpdate, Role};

/// Assign the account role.
pub async fn role_set(
    role: Role,
    caregiver_code: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_session().await?;

    let code = match (role, caregiver_code) {
        // Patients must join a caregiver; ask when the flag is missing
        (Role::Patient, None) => Some(prompt("Caregiver share code")?),
        (_, code) => code.map(String::from),
    };

    let outcome = ctx.manager.select_role(role, code.as_deref()).await?;

    match format {
        OutputFormat::Text => {
            println!("Role set to {}", outcome.user.role);
            if let Some(hint) = next_step_hint(&outcome.destination) {
                println!("{}", hint);
            }
        }
        OutputFormat::Json => output::print_json(&outcome)?,
    }
    Ok(())
}

/// Show the signed-in account's profile.
pub async fn profile_show(format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;
    let snapshot = ctx.manager.snapshot();
    let Some(user) = snapshot.user else {
        anyhow::bail!("Not signed in. Run 'pastibot login' first");
    };

    match format {
        OutputFormat::Json => output::print_json(&user)?,
        OutputFormat::Text => {
            output::print_heading("Profile");
            output::print_row("Name", &user.name);
            output::print_row("Email", &user.email);
            output::print_row("Role", &user.role.to_string());
            if let Some(gender) = &user.gender {
                output::print_row("Gender", gender);
            }
            if let Some(code) = &user.sharing_code {
                output::print_row("Share code", code);
            }
            if let Some(profile) = &user.patient_profile {
                if let Some(age) = profile.age {
                    output::print_row("Age", &age.to_string());
                }
                if let Some(condition) = &profile.condition {
                    output::print_row("Condition", condition);
                }
                if let Some(phone) = &profile.emergency_phone {
                    output::print_row("Emergency", phone);
                }
                output::print_row(
                    "Caregiver",
                    if profile.caregiver_id.is_some() {
                        "linked"
                    } else {
                        "not linked"
                    },
                );
            }
        }
    }
    Ok(())
}

/// Complete patient onboarding: age plus an emergency contact and/or a
/// caregiver link.
pub async fn profile_complete(
    age: Option<u32>,
    condition: Option<&str>,
    emergency_phone: Option<&str>,
    caregiver_code: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_session().await?;
    super::require_role(&ctx, Role::Patient)?;

    let age = match age {
        Some(age) => age,
        None => prompt("Age")?.parse::<u32>().map_err(|_| {
            anyhow::anyhow!("Age must be a number")
        })?,
    };

    let emergency_phone = match emergency_phone {
        Some(phone) => Some(phone.to_string()),
        None => prompt_optional("Emergency contact phone")?,
    };
    let caregiver_code = match caregiver_code {
        Some(code) => Some(code.to_string()),
        None => prompt_optional("Caregiver share code")?,
    };

    if emergency_phone.is_none() && caregiver_code.is_none() {
        let already_linked = ctx
            .manager
            .snapshot()
            .user
            .and_then(|u| u.patient_profile)
            .map_or(false, |p| p.caregiver_id.is_some());
        if !already_linked {
            anyhow::bail!(
                "Provide an emergency phone or a caregiver share code to finish onboarding"
            );
        }
    }

    let update = ProfileUpdate {
        age: Some(age),
        condition: condition.map(String::from),
        emergency_phone,
    };

    let outcome = ctx
        .manager
        .complete_patient_profile(&update, caregiver_code.as_deref())
        .await?;

    match format {
        OutputFormat::Text => {
            println!("Profile saved");
            if let Some(hint) = next_step_hint(&outcome.destination) {
                println!("{}", hint);
            } else {
                println!("Onboarding complete");
            }
        }
        OutputFormat::Json => output::print_json(&outcome)?,
    }
    Ok(())
}

/// Set a password on a federated-only account.
pub async fn password_set(format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;

    let password = rpassword::prompt_password("New password: ")?;
    validate::validate_password(&password).map_err(anyhow::Error::msg)?;
    let confirmation = rpassword::prompt_password("Confirm password: ")?;
    if password != confirmation {
        anyhow::bail!("Passwords do not match");
    }

    ctx.manager.set_password(&password).await?;
    output::print_success("Password set. Email login is now available.", format);
    Ok(())
}

/// Request a password reset link. Works without a session.
pub async fn password_forgot(email: Option<&str>, format: &OutputFormat) -> Result<()> {
    let ctx = build_context()?;

    let email = match email {
        Some(email) => email.to_string(),
        None => prompt("Email")?,
    };
    validate::validate_email(&email).map_err(anyhow::Error::msg)?;

    match ctx.manager.forgot_password(&email).await? {
        Some(link) => match format {
            OutputFormat::Text => {
                println!("Reset link:");
                println!("  {}", link);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "resetLink": link }));
            }
        },
        None => output::print_success(
            "If that address has an account, a reset email is on its way",
            format,
        ),
    }
    Ok(())
}

/// Redeem a password reset token. Works without a session.
pub async fn password_reset(token: Option<&str>, format: &OutputFormat) -> Result<()> {
    let ctx = build_context()?;

    let token = match token {
        Some(token) => token.to_string(),
        None => prompt("Reset token")?,
    };

    let password = rpassword::prompt_password("New password: ")?;
    validate::validate_password(&password).map_err(anyhow::Error::msg)?;
    let confirmation = rpassword::prompt_password("Confirm password: ")?;
    if password != confirmation {
        anyhow::bail!("Passwords do not match");
    }

    ctx.manager.reset_password(&token, &password).await?;
    output::print_success("Password updated. Sign in with 'pastibot login'.", format);
    Ok(())
}
