//! Patient roster, linking, history and invitation commands.

use super::{current_role, prompt, require_role, require_session, resolve_patient_id};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use pastibot_api::{HistoryEntry, Role};

/// List the caregiver's linked patients.
pub async fn patients_list(format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Caregiver)?;

    let patients = ctx.manager.api().patients().await?;
    let selected = ctx.hints.active_patient()?;

    match format {
        OutputFormat::Json => output::print_json(&patients)?,
        OutputFormat::Text => {
            if patients.is_empty() {
                println!("No linked patients. Share your code with 'pastibot profile show'.");
                return Ok(());
            }
            println!("{:<3} {:<6} {:<24} {:<5} {}", "", "ID", "Name", "Age", "Condition");
            output::print_divider();
            for patient in &patients {
                let marker = if selected == Some(patient.id) { "*" } else { "" };
                let age = patient
                    .age
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<3} {:<6} {:<24} {:<5} {}",
                    marker,
                    patient.id,
                    patient.name,
                    age,
                    patient.condition.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

/// Show one patient: profile, upcoming doses, today's check-ins.
pub async fn patients_show(id: Option<i64>, format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Caregiver)?;
    let id = resolve_patient_id(&ctx, id)?;

    let patients = ctx.manager.api().patients().await?;
    let Some(patient) = patients.into_iter().find(|p| p.id == id) else {
        anyhow::bail!("No linked patient with ID {}", id);
    };

    let reminders = ctx.manager.api().patient_reminders(id).await?;
    let monitoring = ctx.manager.api().patient_daily_monitoring(id).await?;

    match format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "patient": patient,
                "reminders": reminders,
                "dailyMonitoring": monitoring,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Text => {
            output::print_heading(&patient.name);
            if let Some(age) = patient.age {
                output::print_row("Age", &age.to_string());
            }
            if let Some(condition) = &patient.condition {
                output::print_row("Condition", condition);
            }
            if let Some(phone) = &patient.emergency_phone {
                output::print_row("Emergency", phone);
            }

            output::print_heading("Upcoming doses");
            if reminders.is_empty() {
                println!("  none scheduled");
            }
            for reminder in &reminders {
                println!(
                    "  {:<7} {}",
                    reminder.time,
                    reminder.medicine_label().unwrap_or("-")
                );
            }

            output::print_heading("Today");
            if monitoring.is_empty() {
                println!("  no check-ins yet");
            }
            for entry in &monitoring {
                println!(
                    "  {:<7} {:<24} {}",
                    entry.time.as_deref().unwrap_or("-"),
                    entry.medicine_name.as_deref().unwrap_or("-"),
                    entry.status.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

/// Remember (or forget) the patient later commands default to.
pub async fn patients_select(id: Option<i64>, clear: bool, format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Caregiver)?;

    if clear {
        ctx.hints.clear_active_patient()?;
        output::print_success("Patient selection cleared", format);
        return Ok(());
    }

    let Some(id) = id else {
        anyhow::bail!("Give a patient ID, or --clear to forget the selection");
    };

    // Only accept patients actually linked to this caregiver
    let patients = ctx.manager.api().patients().await?;
    let Some(patient) = patients.into_iter().find(|p| p.id == id) else {
        anyhow::bail!("No linked patient with ID {}", id);
    };

    ctx.hints.set_active_patient(id)?;
    output::print_success(
        &format!("Selected {} (ID {})", patient.name, patient.id),
        format,
    );
    Ok(())
}

/// Link this patient account to a caregiver via a share code.
pub async fn patients_link(code: Option<&str>, format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Patient)?;

    let code = match code {
        Some(code) => code.to_string(),
        None => prompt("Caregiver share code")?,
    };

    ctx.manager.api().link_caregiver(&code).await?;
    // Pick up the new caregiver link; a failure here is not the link failing
    let _ = ctx.manager.refresh_profile().await;

    output::print_success("Linked to caregiver", format);
    Ok(())
}

/// Dispensation history, scoped by role.
pub async fn history(days: u32, patient_id: Option<i64>, format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;

    let entries = match current_role(&ctx) {
        Role::Patient => ctx.manager.api().my_history(days).await?,
        Role::Caregiver => {
            let id = resolve_patient_id(&ctx, patient_id)?;
            ctx.manager.api().patient_history(id, days).await?
        }
        Role::Unset => anyhow::bail!("Choose a role first with 'pastibot role set'"),
    };

    match format {
        OutputFormat::Json => output::print_json(&entries)?,
        OutputFormat::Text => print_history_table(&entries, days),
    }
    Ok(())
}

fn print_history_table(entries: &[HistoryEntry], days: u32) {
    if entries.is_empty() {
        println!("No dispensations in the last {} days", days);
        return;
    }
    println!("{:<18} {:<10} {}", "When", "Status", "Medicine");
    output::print_divider();
    for entry in entries {
        let medicine = entry
            .medicine
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .unwrap_or("-");
        println!(
            "{:<18} {:<10} {}",
            entry
                .dispensed_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            entry.status,
            medicine
        );
    }
}

/// Accept a caregiver invitation.
pub async fn invitations_accept(token: &str, format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;

    ctx.manager.api().accept_invitation(token).await?;
    let _ = ctx.manager.refresh_profile().await;

    output::print_success("Invitation accepted", format);
    Ok(())
}
