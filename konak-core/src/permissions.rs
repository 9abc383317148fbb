use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

// ============================================================================
// Roles
// ============================================================================

/// Staff role. Variants are declared lowest to highest so the derived `Ord` is the rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Basic,
    Operator,
    Manager,
    Admin,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::Basic => 0,
            Role::Operator => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Basic => "BASIC",
            Role::Operator => "OPERATOR",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts the tier labels used across the dashboard screens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" | "SUPER_ADMIN" => Ok(Role::Admin),
            "MANAGER" | "SUPERVISOR" | "MODERATOR" => Ok(Role::Manager),
            "OPERATOR" | "STAFF" | "EDITOR" => Ok(Role::Operator),
            "BASIC" | "USER" | "VIEWER" => Ok(Role::Basic),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Capability keys that can be granted to a user independently of their role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Hotels,
    Transfers,
    Accommodation,
    Sales,
    Finance,
    Users,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::Hotels,
        Permission::Transfers,
        Permission::Accommodation,
        Permission::Sales,
        Permission::Finance,
        Permission::Users,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Permission::Hotels => "hotels",
            Permission::Transfers => "transfers",
            Permission::Accommodation => "accommodation",
            Permission::Sales => "sales",
            Permission::Finance => "finance",
            Permission::Users => "users",
        }
    }
}

impl FromStr for Permission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Permission::ALL
            .into_iter()
            .find(|p| p.key() == key)
            .ok_or_else(|| CoreError::validation(format!("unknown permission key: {}", s)))
    }
}

// ============================================================================
// Principal
// ============================================================================

/// The authenticated caller, as supplied by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// `None` when the session carried a role label we do not know.
    pub role: Option<Role>,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            email: None,
            role: Some(role),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    /// Builds a principal from raw session claims. Unknown role labels and
    /// permission keys are dropped rather than rejected.
    pub fn from_claims(user_id: Uuid, email: Option<String>, role: &str, permissions: &[String]) -> Self {
        let role = match role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(%user_id, "{}", e);
                None
            }
        };
        let permissions = permissions
            .iter()
            .filter_map(|key| key.parse::<Permission>().ok())
            .collect();

        Self { user_id, email, role, permissions }
    }
}

// ============================================================================
// Actions and gates
// ============================================================================

/// A gate passes on rank, on an explicit grant, or for admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub min_role: Role,
    pub permission: Permission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    ViewHotels,
    EditHotels,
    DeleteHotels,
    ViewTransfers,
    DispatchTransfers,
    DeleteTransfers,
    ViewAccommodation,
    EditAccommodation,
    DeleteAccommodation,
    TransferToSales,
    ViewSales,
    EditSales,
    DeleteSales,
    ViewFinance,
    ManageUsers,
}

impl Action {
    pub fn gate(self) -> Gate {
        use Permission as P;
        use Role as R;

        let (min_role, permission) = match self {
            Action::ViewHotels => (R::Basic, P::Hotels),
            Action::EditHotels => (R::Operator, P::Hotels),
            Action::DeleteHotels => (R::Manager, P::Hotels),
            Action::ViewTransfers => (R::Basic, P::Transfers),
            Action::DispatchTransfers => (R::Operator, P::Transfers),
            Action::DeleteTransfers => (R::Manager, P::Transfers),
            Action::ViewAccommodation => (R::Operator, P::Accommodation),
            Action::EditAccommodation => (R::Operator, P::Accommodation),
            Action::DeleteAccommodation => (R::Manager, P::Accommodation),
            Action::TransferToSales => (R::Manager, P::Sales),
            Action::ViewSales => (R::Manager, P::Sales),
            Action::EditSales => (R::Manager, P::Sales),
            Action::DeleteSales => (R::Manager, P::Sales),
            Action::ViewFinance => (R::Manager, P::Finance),
            Action::ManageUsers => (R::Admin, P::Users),
        };

        Gate { min_role, permission }
    }
}

pub fn role_allows(role: Role, required: Role) -> bool {
    role.rank() >= required.rank()
}

/// `role_allows(role, gate.min_role) || permissions ∋ gate.permission || role == ADMIN`.
/// A missing principal or an unrecognised role never passes.
pub fn can_perform(principal: Option<&Principal>, action: Action) -> bool {
    let Some(principal) = principal else {
        return false;
    };
    let Some(role) = principal.role else {
        return false;
    };

    let gate = action.gate();
    role == Role::Admin
        || role_allows(role, gate.min_role)
        || principal.permissions.contains(&gate.permission)
}

pub fn authorize(principal: &Principal, action: Action) -> CoreResult<()> {
    if can_perform(Some(principal), action) {
        Ok(())
    } else {
        tracing::warn!(user_id = %principal.user_id, ?action, "access denied");
        Err(CoreError::Authorization(format!("{:?} is not permitted", action)))
    }
}
