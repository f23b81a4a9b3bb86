//! Caregiver-side patient resources.

use crate::models::{
    HistoryEntry, Medicine, MedicinePayload, MonitoringEntry, Patient, ProfileUpdate, Reminder,
};
use crate::{ApiClient, ApiResult};
use serde_json::json;

impl ApiClient {
    /// List the caregiver's linked patients.
    pub async fn patients(&self) -> ApiResult<Vec<Patient>> {
        self.get_json("/patients").await
    }

    /// Update the calling patient's own onboarding profile.
    pub async fn update_my_profile(&self, update: &ProfileUpdate) -> ApiResult<()> {
        self.patch_unit("/patients/update-my-profile", update).await
    }

    /// Link the calling patient to a caregiver via a shared code.
    pub async fn link_caregiver(&self, code: &str) -> ApiResult<()> {
        self.post_unit("/patients/link", &json!({ "code": code }))
            .await
    }

    /// Accept a caregiver invitation.
    pub async fn accept_invitation(&self, token: &str) -> ApiResult<()> {
        self.post_unit(&format!("/invitations/accept/{}", token), &json!({}))
            .await
    }

    /// Medicines configured for one patient.
    pub async fn patient_medicines(&self, patient_id: i64) -> ApiResult<Vec<Medicine>> {
        self.get_json(&format!("/patients/{}/medicines", patient_id))
            .await
    }

    /// Configure a new medicine for a patient.
    pub async fn add_medicine(
        &self,
        patient_id: i64,
        payload: &MedicinePayload,
    ) -> ApiResult<Medicine> {
        self.post_json(&format!("/patients/{}/medicines", patient_id), payload)
            .await
    }

    /// Update an existing medicine.
    pub async fn update_medicine(
        &self,
        patient_id: i64,
        medicine_id: i64,
        payload: &MedicinePayload,
    ) -> ApiResult<Medicine> {
        self.patch_json(
            &format!("/patients/{}/medicines/{}", patient_id, medicine_id),
            payload,
        )
        .await
    }

    /// Remove a medicine.
    pub async fn delete_medicine(&self, patient_id: i64, medicine_id: i64) -> ApiResult<()> {
        self.delete_unit(&format!("/patients/{}/medicines/{}", patient_id, medicine_id))
            .await
    }

    /// Dispensation history for one patient over the last `days` days.
    pub async fn patient_history(&self, patient_id: i64, days: u32) -> ApiResult<Vec<HistoryEntry>> {
        self.get_json(&format!("/patients/{}/history?days={}", patient_id, days))
            .await
    }

    /// Upcoming doses for one patient.
    pub async fn patient_reminders(&self, patient_id: i64) -> ApiResult<Vec<Reminder>> {
        self.get_json(&format!("/patients/{}/reminders", patient_id))
            .await
    }

    /// Daily check-in rows for one patient.
    pub async fn patient_daily_monitoring(
        &self,
        patient_id: i64,
    ) -> ApiResult<Vec<MonitoringEntry>> {
        self.get_json(&format!("/patients/{}/daily-monitoring", patient_id))
            .await
    }
}
