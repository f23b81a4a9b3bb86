//! Medicine configuration commands.

use super::{current_role, require_role, require_session, resolve_patient_id, CliContext};
use crate::output::{self, OutputFormat};
use crate::validate;
use anyhow::Result;
use pastibot_api::{Medicine, MedicinePayload, Role};

/// Medicine fields shared by add and update flags.
pub struct MedicineFields {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub times: Option<String>,
    pub days: Option<String>,
    pub slot: Option<u32>,
    pub instructions: Option<String>,
}

/// Parse a comma-separated `HH:MM` list.
fn parse_times(raw: &str) -> Result<Vec<String>> {
    let times: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();

    if times.is_empty() {
        anyhow::bail!("At least one intake time is required");
    }
    for time in &times {
        validate::validate_time_hhmm(time).map_err(anyhow::Error::msg)?;
    }
    Ok(times)
}

/// Parse a comma-separated weekday list; empty means every day.
fn parse_days(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_uppercase)
            .collect()
    })
    .unwrap_or_default()
}

/// List medicines: the patient's own, or a linked patient's for caregivers.
pub async fn medicines_list(patient_id: Option<i64>, format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;

    let medicines = match current_role(&ctx) {
        Role::Patient => ctx.manager.api().my_medicines().await?,
        Role::Caregiver => {
            let id = resolve_patient_id(&ctx, patient_id)?;
            ctx.manager.api().patient_medicines(id).await?
        }
        Role::Unset => anyhow::bail!("Choose a role first with 'pastibot role set'"),
    };

    match format {
        OutputFormat::Json => output::print_json(&medicines)?,
        OutputFormat::Text => print_medicine_table(&medicines),
    }
    Ok(())
}

fn print_medicine_table(medicines: &[Medicine]) {
    if medicines.is_empty() {
        println!("No medicines configured");
        return;
    }
    println!(
        "{:<6} {:<24} {:<14} {:<5} {:<18} {}",
        "ID", "Name", "Dosage", "Slot", "Times", "Days"
    );
    output::print_divider();
    for medicine in medicines {
        let slot = medicine
            .slot
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let days = if medicine.days.is_empty() {
            "every day".to_string()
        } else {
            medicine.days.join(",")
        };
        println!(
            "{:<6} {:<24} {:<14} {:<5} {:<18} {}",
            medicine.id,
            medicine.name,
            medicine.dosage.as_deref().unwrap_or("-"),
            slot,
            medicine.times.join(","),
            days
        );
    }
}

/// Configure a new medicine for a patient.
pub async fn medicines_add(
    fields: MedicineFields,
    patient_id: Option<i64>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Caregiver)?;
    let patient_id = resolve_patient_id(&ctx, patient_id)?;

    let name = fields.name.unwrap_or_default();
    if name.trim().is_empty() {
        anyhow::bail!("Medicine name is required");
    }
    let times = parse_times(fields.times.as_deref().unwrap_or_default())?;

    let payload = MedicinePayload {
        name,
        dosage: fields.dosage,
        times,
        days: parse_days(fields.days.as_deref()),
        slot: fields.slot,
        instructions: fields.instructions,
        ..Default::default()
    };

    let medicine = ctx.manager.api().add_medicine(patient_id, &payload).await?;
    match format {
        OutputFormat::Json => output::print_json(&medicine)?,
        OutputFormat::Text => {
            println!("Added {} (ID {})", medicine.name, medicine.id);
        }
    }
    Ok(())
}

/// Find an existing medicine by ID in a patient's list.
async fn find_medicine(ctx: &CliContext, patient_id: i64, medicine_id: i64) -> Result<Medicine> {
    let medicines = ctx.manager.api().patient_medicines(patient_id).await?;
    medicines
        .into_iter()
        .find(|m| m.id == medicine_id)
        .ok_or_else(|| anyhow::anyhow!("No medicine with ID {} for this patient", medicine_id))
}

/// Update an existing medicine; unspecified flags keep their current value.
pub async fn medicines_update(
    id: i64,
    fields: MedicineFields,
    patient_id: Option<i64>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Caregiver)?;
    let patient_id = resolve_patient_id(&ctx, patient_id)?;

    let existing = find_medicine(&ctx, patient_id, id).await?;

    let times = match fields.times.as_deref() {
        Some(raw) => parse_times(raw)?,
        None => existing.times,
    };
    let days = match fields.days.as_deref() {
        Some(raw) => parse_days(Some(raw)),
        None => existing.days,
    };

    let payload = MedicinePayload {
        name: fields.name.unwrap_or(existing.name),
        dosage: fields.dosage.or(existing.dosage),
        times,
        days,
        slot: fields.slot.or(existing.slot),
        instructions: fields.instructions.or(existing.instructions),
        label: existing.label,
        icon: existing.icon,
        category: existing.category,
        image_urls: existing.image_urls,
    };

    let medicine = ctx
        .manager
        .api()
        .update_medicine(patient_id, id, &payload)
        .await?;
    match format {
        OutputFormat::Json => output::print_json(&medicine)?,
        OutputFormat::Text => {
            println!("Updated {} (ID {})", medicine.name, medicine.id);
        }
    }
    Ok(())
}

/// Remove a medicine.
pub async fn medicines_remove(
    id: i64,
    patient_id: Option<i64>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Caregiver)?;
    let patient_id = resolve_patient_id(&ctx, patient_id)?;

    ctx.manager.api().delete_medicine(patient_id, id).await?;
    output::print_success(&format!("Medicine {} removed", id), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_times_splits_and_validates() {
        assert_eq!(
            parse_times("08:00, 20:30").unwrap(),
            vec!["08:00".to_string(), "20:30".to_string()]
        );
        assert!(parse_times("").is_err());
        assert!(parse_times("8am").is_err());
    }

    #[test]
    fn parse_days_normalizes() {
        assert_eq!(
            parse_days(Some("mon, wed")),
            vec!["MON".to_string(), "WED".to_string()]
        );
        assert!(parse_days(None).is_empty());
    }
}
