//! Typed backend payloads.
//!
//! The backend speaks camelCase JSON. Payload shapes are validated on
//! the way in: an unknown role string is a deserialization error, not a
//! silently-trusted value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Account role. Wire values are the backend's Spanish identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Caregiver,
    Patient,
    /// No role assigned yet (fresh federated sign-ups)
    #[default]
    Unset,
}

impl Role {
    /// Wire value sent to / received from the backend, if any.
    pub fn as_wire(&self) -> Option<&'static str> {
        match self {
            Role::Caregiver => Some("CUIDADOR"),
            Role::Patient => Some("PACIENTE"),
            Role::Unset => None,
        }
    }

    /// Parse a backend wire value. Unknown strings are rejected by the caller.
    pub fn from_wire(raw: &str) -> Option<Role> {
        match raw {
            "CUIDADOR" => Some(Role::Caregiver),
            "PACIENTE" => Some(Role::Patient),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Role::Unset)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Caregiver => "caregiver",
            Role::Patient => "patient",
            Role::Unset => "unset",
        };
        write!(f, "{}", label)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_wire() {
            Some(wire) => serializer.serialize_some(wire),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Role::Unset),
            Some(raw) => Role::from_wire(&raw)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown role: {}", raw))),
        }
    }
}

/// Patient onboarding data nested under a PATIENT user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    /// Caregiver link established via a shared code
    #[serde(default)]
    pub caregiver_id: Option<i64>,
}

impl PatientProfile {
    /// Whether the patient is fully onboarded: age set, plus either a
    /// caregiver link or an emergency phone. The single source of truth
    /// for profile completeness.
    pub fn is_complete(&self) -> bool {
        let has_phone = self
            .emergency_phone
            .as_deref()
            .map_or(false, |p| !p.trim().is_empty());
        self.age.is_some() && (self.caregiver_id.is_some() || has_phone)
    }
}

/// The authenticated account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sharing_code: Option<String>,
    #[serde(default)]
    pub patient_profile: Option<PatientProfile>,
    // Present only in login/register responses; profile fetches omit it.
    // Federated-only accounts have none until the user sets one.
    #[serde(default, skip_serializing)]
    password: Option<String>,
}

impl User {
    /// Whether the account has a password set (federated-only accounts
    /// must create one before password login works).
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Whether this PATIENT user still has onboarding steps left.
    /// Non-patients never do.
    pub fn patient_profile_incomplete(&self) -> bool {
        if self.role != Role::Patient {
            return false;
        }
        match &self.patient_profile {
            Some(profile) => !profile.is_complete(),
            None => true,
        }
    }
}

/// `POST /auth/login`, `/auth/register`, `/auth/firebase-*` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// `POST /auth/register` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caregiver_code: Option<String>,
}

impl RegisterRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: Role,
        gender: Option<String>,
        caregiver_code: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: role.as_wire().map(String::from),
            gender,
            caregiver_code,
        }
    }
}

/// `POST /auth/firebase-register` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedRegisterRequest {
    pub id_token: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caregiver_code: Option<String>,
}

/// `POST /auth/set-role` response; a rotated token replaces the stored one.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// `POST /auth/forgot-password` response.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    #[serde(default)]
    pub reset_link: Option<String>,
}

/// `PATCH /patients/update-my-profile` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_phone: Option<String>,
}

/// A patient in the caregiver's roster (`GET /patients`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub link_code: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub user: Option<PatientUserCard>,
}

/// Display info nested in a roster entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatientUserCard {
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// A configured medicine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    /// Intake times ("HH:MM")
    #[serde(default)]
    pub times: Vec<String>,
    /// Weekdays the schedule repeats on; empty means every day
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// Dispenser carriage this medicine is loaded in
    #[serde(default)]
    pub slot: Option<u32>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Medicine create/update payload (POST and PATCH share the shape).
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MedicinePayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    pub times: Vec<String>,
    pub days: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

/// Robot state (`GET /robot/status`, `GET /my/robot`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RobotStatus {
    #[serde(default = "offline")]
    pub status: String,
    #[serde(default)]
    pub wifi: bool,
    #[serde(default)]
    pub battery_pct: u8,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn offline() -> String {
    "OFFLINE".to_string()
}

impl Default for RobotStatus {
    fn default() -> Self {
        Self {
            status: offline(),
            wifi: false,
            battery_pct: 0,
            updated_at: None,
        }
    }
}

impl RobotStatus {
    /// The robot accepts dispense orders only in this state.
    pub fn is_ready(&self) -> bool {
        self.status == "OK"
    }
}

/// One loaded carriage (`GET /robot/inventory`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySlot {
    pub id: i64,
    #[serde(default)]
    pub medicine_name: Option<String>,
    pub slot: u32,
}

/// Dispensation record (`GET /my/history`, `GET /patients/:id/history`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    /// TAKEN, DISPENSED, or MISSED
    pub status: String,
    pub dispensed_at: DateTime<Utc>,
    #[serde(default)]
    pub medicine: Option<MedicineRef>,
}

/// Medicine name reference nested in history/reminder entries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// Upcoming dose (`GET /patients/:id/reminders`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub time: String,
    #[serde(default)]
    pub medicine_name: Option<String>,
    #[serde(default)]
    pub medicine: Option<MedicineRef>,
}

impl Reminder {
    /// Reminder rows carry the medicine name in one of two places.
    pub fn medicine_label(&self) -> Option<&str> {
        self.medicine_name
            .as_deref()
            .or_else(|| self.medicine.as_ref()?.name.as_deref())
    }
}

/// Daily check-in row (`GET /patients/:id/daily-monitoring`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringEntry {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub medicine_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Dispense acknowledgement (`POST /my/dispense`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DispenseAck {
    #[serde(default)]
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_wire_values() {
        assert_eq!(Role::Caregiver.as_wire(), Some("CUIDADOR"));
        assert_eq!(Role::Patient.as_wire(), Some("PACIENTE"));
        assert_eq!(Role::Unset.as_wire(), None);

        assert_eq!(Role::from_wire("CUIDADOR"), Some(Role::Caregiver));
        assert_eq!(Role::from_wire("PACIENTE"), Some(Role::Patient));
        assert_eq!(Role::from_wire("ADMIN"), None);
    }

    #[test]
    fn test_user_with_missing_role_is_unset() {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "name": "Marta",
            "email": "marta@example.com"
        }))
        .unwrap();

        assert_eq!(user.role, Role::Unset);
        assert!(!user.has_password());
        assert!(user.patient_profile.is_none());
    }

    #[test]
    fn test_user_with_null_role_is_unset() {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "name": "Marta",
            "email": "marta@example.com",
            "role": null
        }))
        .unwrap();

        assert_eq!(user.role, Role::Unset);
    }

    #[test]
    fn test_user_with_unknown_role_is_rejected() {
        let result: Result<User, _> = serde_json::from_value(json!({
            "id": 1,
            "name": "Marta",
            "email": "marta@example.com",
            "role": "SUPERVISOR"
        }));

        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown role"), "got: {}", err);
    }

    #[test]
    fn test_user_full_shape_parses() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "name": "Luis",
            "email": "luis@example.com",
            "role": "PACIENTE",
            "photoUrl": "https://cdn.example/luis.png",
            "gender": "M",
            "createdAt": "2024-03-05T10:30:00.000Z",
            "password": "$2b$10$hash",
            "patientProfile": {
                "age": 74,
                "condition": "hipertensión",
                "emergencyPhone": "+34911222333",
                "caregiverId": 3
            }
        }))
        .unwrap();

        assert_eq!(user.role, Role::Patient);
        assert!(user.has_password());
        assert!(user.created_at.is_some());
        let profile = user.patient_profile.unwrap();
        assert_eq!(profile.age, Some(74));
        assert_eq!(profile.caregiver_id, Some(3));
    }

    #[test]
    fn test_user_password_never_serialized() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "name": "Luis",
            "email": "luis@example.com",
            "password": "$2b$10$hash"
        }))
        .unwrap();

        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("password").is_none());
    }

    #[test]
    fn test_profile_completeness_rule() {
        let complete_with_link = PatientProfile {
            age: Some(70),
            caregiver_id: Some(2),
            ..Default::default()
        };
        assert!(complete_with_link.is_complete());

        let complete_with_phone = PatientProfile {
            age: Some(70),
            emergency_phone: Some("+34600111222".to_string()),
            ..Default::default()
        };
        assert!(complete_with_phone.is_complete());

        let missing_age = PatientProfile {
            caregiver_id: Some(2),
            emergency_phone: Some("+34600111222".to_string()),
            ..Default::default()
        };
        assert!(!missing_age.is_complete());

        let age_only = PatientProfile {
            age: Some(70),
            ..Default::default()
        };
        assert!(!age_only.is_complete());

        let blank_phone_does_not_count = PatientProfile {
            age: Some(70),
            emergency_phone: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!blank_phone_does_not_count.is_complete());
    }

    #[test]
    fn test_patient_profile_incomplete_only_for_patients() {
        let caregiver: User = serde_json::from_value(json!({
            "id": 1,
            "name": "Ana",
            "email": "ana@example.com",
            "role": "CUIDADOR"
        }))
        .unwrap();
        assert!(!caregiver.patient_profile_incomplete());

        let patient_no_profile: User = serde_json::from_value(json!({
            "id": 2,
            "name": "Luis",
            "email": "luis@example.com",
            "role": "PACIENTE"
        }))
        .unwrap();
        assert!(patient_no_profile.patient_profile_incomplete());
    }

    #[test]
    fn test_register_request_skips_unset_role() {
        let req = RegisterRequest::new("Ana", "ana@example.com", "secret1", Role::Unset, None, None);
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("role").is_none());
        assert!(value.get("caregiverCode").is_none());

        let req = RegisterRequest::new(
            "Luis",
            "luis@example.com",
            "secret1",
            Role::Patient,
            None,
            Some("PASTIBOT".to_string()),
        );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["role"], "PACIENTE");
        assert_eq!(value["caregiverCode"], "PASTIBOT");
    }

    #[test]
    fn test_robot_status_default_is_offline() {
        let status = RobotStatus::default();
        assert_eq!(status.status, "OFFLINE");
        assert!(!status.wifi);
        assert_eq!(status.battery_pct, 0);
        assert!(!status.is_ready());

        let ready: RobotStatus = serde_json::from_value(json!({
            "status": "OK",
            "wifi": true,
            "batteryPct": 82,
            "updatedAt": "2024-06-01T08:00:00.000Z"
        }))
        .unwrap();
        assert!(ready.is_ready());
        assert_eq!(ready.battery_pct, 82);
    }

    #[test]
    fn test_history_entry_parses() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 11,
            "status": "TAKEN",
            "dispensedAt": "2024-06-01T09:00:00.000Z",
            "medicine": { "name": "Enalapril" }
        }))
        .unwrap();

        assert_eq!(entry.status, "TAKEN");
        assert_eq!(entry.medicine.unwrap().name.as_deref(), Some("Enalapril"));
    }

    #[test]
    fn test_reminder_label_from_either_field() {
        let flat: Reminder = serde_json::from_value(json!({
            "time": "09:00",
            "medicineName": "Enalapril"
        }))
        .unwrap();
        assert_eq!(flat.medicine_label(), Some("Enalapril"));

        let nested: Reminder = serde_json::from_value(json!({
            "time": "09:00",
            "medicine": { "name": "Metformina" }
        }))
        .unwrap();
        assert_eq!(nested.medicine_label(), Some("Metformina"));
    }
}
