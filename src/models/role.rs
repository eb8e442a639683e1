use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of roles that govern path access.
///
/// `Onboarding` and `NotVerified` are pseudo-roles derived from the profile,
/// never stored. `Unknown` is what any unrecognised name normalizes to and is
/// denied everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKey {
    Admin,
    Immigrant,
    Realtor,
    CarDealership,
    ImmigrationConsultant,
    Onboarding,
    NotVerified,
    Unknown,
}

impl RoleKey {
    pub const KNOWN: [RoleKey; 7] = [
        RoleKey::Admin,
        RoleKey::Immigrant,
        RoleKey::Realtor,
        RoleKey::CarDealership,
        RoleKey::ImmigrationConsultant,
        RoleKey::Onboarding,
        RoleKey::NotVerified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKey::Admin => "Admin",
            RoleKey::Immigrant => "Immigrant",
            RoleKey::Realtor => "Realtor",
            RoleKey::CarDealership => "CarDealership",
            RoleKey::ImmigrationConsultant => "ImmigrationConsultant",
            RoleKey::Onboarding => "Onboarding",
            RoleKey::NotVerified => "NotVerified",
            RoleKey::Unknown => "Unknown",
        }
    }

    /// Maps a stored role name onto a key. Whitespace anywhere in the name is
    /// ignored and the comparison is case-insensitive, so "Car Dealership"
    /// and "cardealership" both resolve to `CarDealership`.
    pub fn normalize(raw: &str) -> RoleKey {
        let collapsed: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if collapsed.is_empty() {
            return RoleKey::Unknown;
        }

        Self::KNOWN
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(&collapsed))
            .unwrap_or(RoleKey::Unknown)
    }

    /// Professional roles are held back on the not-verified page until an
    /// admin approves the profile.
    pub fn requires_verification(&self) -> bool {
        matches!(
            self,
            RoleKey::Realtor | RoleKey::CarDealership | RoleKey::ImmigrationConsultant
        )
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
