//! Post-sign-in destination policy.
//!
//! A single pure function decides where a freshly signed-in account should
//! land. Every sign-in path (password, registration, federated) asks this
//! same function, so the decision lives in exactly one place and can be
//! tested without a session manager.

use pastibot_api::{Role, User};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the app should send the user after sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    /// Account has no role yet; ask the user to pick one.
    RoleSelection,
    /// Patient account that has not finished onboarding.
    CompleteProfile,
    /// Caregiver landing screen.
    CaregiverHome,
    /// Patient landing screen.
    PatientHome,
}

impl Destination {
    /// Route path for this destination.
    pub fn path(&self) -> &'static str {
        match self {
            Destination::RoleSelection => "/selectrole",
            Destination::CompleteProfile => "/completeprofile",
            Destination::CaregiverHome => "/care/home",
            Destination::PatientHome => "/patient/home",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Decide the destination for a signed-in account.
///
/// Rules, evaluated in order:
/// 1. No role assigned -> role selection, regardless of profile contents.
/// 2. Patient whose onboarding is incomplete -> complete-profile.
///    Incomplete means: no age, or neither a caregiver link nor an
///    emergency phone.
/// 3. Otherwise the role's home screen.
///
/// The function reads only the given user snapshot. It performs no IO and
/// never mutates anything, so calling it twice with the same input always
/// yields the same destination.
pub fn destination_for(user: &User) -> Destination {
    match user.role {
        Role::Unset => Destination::RoleSelection,
        Role::Patient => {
            if user.patient_profile_incomplete() {
                Destination::CompleteProfile
            } else {
                Destination::PatientHome
            }
        }
        Role::Caregiver => Destination::CaregiverHome,
    }
}
