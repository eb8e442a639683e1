use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::errors::{AppError, AppResult};
use crate::models::RoleKey;

use super::DEFAULT_HOME;

/// Outcome of checking one path against one role's allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied { home: String },
}

/// Role → ordered allowed path prefixes. The first prefix is the role's home.
///
/// Built once at startup and shared read-only; lookups for roles without an
/// entry (including `RoleKey::Unknown`) see an empty list and are denied.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    routes: HashMap<RoleKey, Vec<String>>,
}

impl PolicyTable {
    pub fn builtin() -> Self {
        let routes = [
            (RoleKey::Admin, "/dashboard/admin"),
            (RoleKey::Immigrant, "/dashboard/user"),
            (RoleKey::Realtor, "/dashboard/realtor"),
            (RoleKey::CarDealership, "/dashboard/car-dealer"),
            (RoleKey::ImmigrationConsultant, "/dashboard/consultant"),
            (RoleKey::Onboarding, "/onboarding"),
            (RoleKey::NotVerified, "/dashboard/not-verified"),
        ]
        .into_iter()
        .map(|(role, home)| (role, vec![home.to_string()]))
        .collect();

        Self { routes }
    }

    pub fn new(routes: impl IntoIterator<Item = (RoleKey, Vec<String>)>) -> AppResult<Self> {
        let mut table = HashMap::new();

        for (role, prefixes) in routes {
            if role == RoleKey::Unknown {
                return Err(AppError::configuration("policy table cannot grant routes to unknown roles"));
            }
            if let Some(bad) = prefixes.iter().find(|prefix| !prefix.starts_with('/')) {
                return Err(AppError::configuration(format!(
                    "policy prefix {bad:?} for role {role} must start with '/'"
                )));
            }
            table.insert(role, prefixes);
        }

        Ok(Self { routes: table })
    }

    /// Parses `{ "<role name>": ["/prefix", ...] }`. Role names go through
    /// the same normalization as stored profile roles.
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let parsed: BTreeMap<String, Vec<String>> = serde_path_to_error::deserialize(deserializer)
            .map_err(|err| AppError::configuration(format!("invalid policy file at {}: {}", err.path(), err.inner())))?;

        let mut routes = Vec::with_capacity(parsed.len());
        for (name, prefixes) in parsed {
            let role = RoleKey::normalize(&name);
            if role == RoleKey::Unknown {
                return Err(AppError::configuration(format!("policy file names unknown role {name:?}")));
            }
            routes.push((role, prefixes));
        }

        Self::new(routes)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::configuration(format!("failed to read policy file {}: {err}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn allowed_prefixes(&self, role: RoleKey) -> &[String] {
        self.routes.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_allowed(&self, role: RoleKey, path: &str) -> bool {
        self.allowed_prefixes(role)
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn home_for(&self, role: RoleKey) -> &str {
        self.allowed_prefixes(role)
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_HOME)
    }

    pub fn evaluate(&self, role: RoleKey, path: &str) -> Access {
        if self.is_allowed(role, path) {
            Access::Allowed
        } else {
            Access::Denied {
                home: self.home_for(role).to_string(),
            }
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
