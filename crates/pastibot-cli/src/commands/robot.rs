//! Dispenser robot commands.

use super::{current_role, require_role, require_session};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use pastibot_api::{Role, RobotStatus};

/// Show robot connectivity and battery, scoped by role.
pub async fn robot_status(format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;

    let status = match current_role(&ctx) {
        Role::Caregiver => ctx.manager.api().robot_status().await?,
        Role::Patient => ctx.manager.api().my_robot().await?,
        Role::Unset => anyhow::bail!("Choose a role first with 'pastibot role set'"),
    };

    match format {
        OutputFormat::Json => output::print_json(&status)?,
        OutputFormat::Text => print_robot_status(&status),
    }
    Ok(())
}

fn print_robot_status(status: &RobotStatus) {
    println!("Status:   {}", status.status);
    println!("WiFi:     {}", if status.wifi { "connected" } else { "offline" });
    println!("Battery:  {}%", status.battery_pct);
    if let Some(updated) = status.updated_at {
        println!(
            "Updated:  {}",
            updated.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        );
    }
    if !status.is_ready() {
        println!("The robot is not ready to dispense.");
    }
}

/// Show loaded carriages.
pub async fn robot_inventory(format: &OutputFormat) -> Result<()> {
    let ctx = require_session().await?;
    require_role(&ctx, Role::Caregiver)?;

    let slots = ctx.manager.api().robot_inventory().await?;

    match format {
        OutputFormat::Json => output::print_json(&slots)?,
        OutputFormat::Text => {
            if slots.is_empty() {
                println!("No carriages loaded");
                return Ok(());
            }
            println!("{:<6} {}", "Slot", "Medicine");
            output::print_divider();
            for slot in &slots {
                println!(
                    "{:<6} {}",
                    slot.slot,
                    slot.medicine_name.as_deref().unwrap_or("(empty)")
                );
            }
        }
    }
    Ok(())
}

/// Dispense a medicine now.
///
/// Caregivers command the household robot with an explicit amount;
/// patients can only request their own scheduled medicines.
pub async fn robot_dispense(
    medicine_id: i64,
    amount: Option<u32>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_session().await?;

    match current_role(&ctx) {
        Role::Caregiver => {
            ctx.manager
                .api()
                .robot_dispense(medicine_id, amount.unwrap_or(1))
                .await?;
            output::print_success("Dispense order sent", format);
        }
        Role::Patient => {
            if amount.is_some() {
                anyhow::bail!("Patients cannot choose an amount; the schedule decides");
            }
            let ack = ctx.manager.api().my_dispense(medicine_id).await?;
            if ack.ok {
                output::print_success("Dispense request acknowledged", format);
            } else {
                anyhow::bail!("The robot declined the dispense request");
            }
        }
        Role::Unset => anyhow::bail!("Choose a role first with 'pastibot role set'"),
    }
    Ok(())
}
