//! Dispenser robot resources.
//!
//! Caregivers reach the robot through `/robot/*`; patients get scoped
//! `/my/*` variants limited to their own schedule.

use crate::models::{DispenseAck, HistoryEntry, InventorySlot, Medicine, RobotStatus};
use crate::{ApiClient, ApiResult};
use serde_json::json;

impl ApiClient {
    /// Robot state for the caregiver's household.
    pub async fn robot_status(&self) -> ApiResult<RobotStatus> {
        self.get_json("/robot/status").await
    }

    /// Loaded carriages.
    pub async fn robot_inventory(&self) -> ApiResult<Vec<InventorySlot>> {
        self.get_json("/robot/inventory").await
    }

    /// Order the robot to dispense a medicine now.
    pub async fn robot_dispense(&self, medicine_id: i64, amount: u32) -> ApiResult<()> {
        self.post_unit(
            "/robot/dispense",
            &json!({ "medicineId": medicine_id, "amount": amount }),
        )
        .await
    }

    /// Robot state as seen by the calling patient.
    pub async fn my_robot(&self) -> ApiResult<RobotStatus> {
        self.get_json("/my/robot").await
    }

    /// The calling patient's own medicines.
    pub async fn my_medicines(&self) -> ApiResult<Vec<Medicine>> {
        self.get_json("/my/medicines").await
    }

    /// The calling patient's dispensation history.
    pub async fn my_history(&self, days: u32) -> ApiResult<Vec<HistoryEntry>> {
        self.get_json(&format!("/my/history?days={}", days)).await
    }

    /// Ask the robot for one of the calling patient's medicines.
    pub async fn my_dispense(&self, medicine_id: i64) -> ApiResult<DispenseAck> {
        self.post_json("/my/dispense", &json!({ "medicineId": medicine_id }))
            .await
    }
}
