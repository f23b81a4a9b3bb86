//! CLI command implementations.

mod account;
mod auth;
mod medicines;
mod patients;
mod robot;

pub use account::{
    password_forgot, password_reset, password_set, profile_complete, profile_show, role_set,
};
pub use auth::{login, logout, register, status};
pub use medicines::{
    medicines_add, medicines_list, medicines_remove, medicines_update, MedicineFields,
};
pub use patients::{
    history, invitations_accept, patients_link, patients_list, patients_select, patients_show,
};
pub use robot::{robot_dispense, robot_inventory, robot_status};

use anyhow::{Context, Result};
use pastibot_api::{ApiClient, Role};
use pastibot_core::{Config, Paths};
use pastibot_session::{Destination, SessionManager};
use pastibot_storage::TokenVault;
use std::io::{self, Write};
use std::time::Duration;

/// Everything a command needs: the session manager plus a second handle
/// on the credentials file for CLI-local hints (the remembered patient).
pub struct CliContext {
    pub manager: SessionManager,
    pub hints: TokenVault,
}

fn open_vault(paths: &Paths) -> Result<TokenVault> {
    Ok(pastibot_storage::create_vault(&paths.credentials_file())?)
}

/// Wire up a session manager from the local config and credentials.
pub fn build_context() -> Result<CliContext> {
    let paths = Paths::new()?;
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let api = ApiClient::with_timeout(
        &config.api_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let manager = SessionManager::new(open_vault(&paths)?, api);

    Ok(CliContext {
        manager,
        hints: open_vault(&paths)?,
    })
}

/// Restore the stored session and require a signed-in account.
pub(crate) async fn require_session() -> Result<CliContext> {
    let ctx = build_context()?;
    ctx.manager
        .restore()
        .await
        .context("Could not validate the stored session")?;

    if !ctx.manager.is_authenticated() {
        anyhow::bail!("Not signed in. Run 'pastibot login' first");
    }

    Ok(ctx)
}

/// The signed-in account's role; decides which endpoints serve a command.
pub(crate) fn current_role(ctx: &CliContext) -> Role {
    ctx.manager
        .snapshot()
        .user
        .map(|user| user.role)
        .unwrap_or_default()
}

/// Require the signed-in account to have a specific role.
pub(crate) fn require_role(ctx: &CliContext, role: Role) -> Result<()> {
    if current_role(ctx) != role {
        anyhow::bail!("This command needs a {} account", role);
    }
    Ok(())
}

/// Resolve which patient a caregiver command targets: the explicit flag,
/// falling back to the remembered selection.
pub(crate) fn resolve_patient_id(ctx: &CliContext, flag: Option<i64>) -> Result<i64> {
    if let Some(id) = flag {
        return Ok(id);
    }
    if let Some(id) = ctx.hints.active_patient()? {
        return Ok(id);
    }
    anyhow::bail!("No patient given. Pass --patient-id or run 'pastibot patients select <id>'")
}

/// What to run next after a sign-in or role change.
pub(crate) fn next_step_hint(destination: &Destination) -> Option<&'static str> {
    match destination {
        Destination::RoleSelection => {
            Some("Next: choose a role with 'pastibot role set caregiver|patient'")
        }
        Destination::CompleteProfile => {
            Some("Next: finish onboarding with 'pastibot profile complete'")
        }
        Destination::CaregiverHome | Destination::PatientHome => None,
    }
}

/// Read a required line of input.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    let value = value.trim().to_string();

    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}

/// Read an optional line of input; empty means skip.
pub(crate) fn prompt_optional(label: &str) -> Result<Option<String>> {
    print!("{} (optional): ", label);
    io::stdout().flush()?;

    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    let value = value.trim().to_string();

    Ok(if value.is_empty() { None } else { Some(value) })
}
