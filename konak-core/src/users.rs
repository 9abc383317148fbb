use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permissions::{Permission, Role};
use crate::query::{FieldValue, Fields};
use crate::repository::Record;
use crate::{CoreError, CoreResult};

/// A staff account. Managed by admins only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDraft {
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserDraft {
    fn validate(&self) -> CoreResult<(String, Role, BTreeSet<Permission>)> {
        let email = self.email.trim().to_lowercase();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(CoreError::validation(format!("invalid email address: {}", self.email)));
        }

        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| CoreError::validation(e.to_string()))?;
        let permissions = self
            .permissions
            .iter()
            .map(|p| p.parse::<Permission>())
            .collect::<CoreResult<BTreeSet<_>>>()?;

        Ok((email, role, permissions))
    }
}

impl User {
    pub fn from_draft(draft: UserDraft) -> CoreResult<Self> {
        let (email, role, permissions) = draft.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            email,
            name: clean(draft.name),
            role,
            permissions,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, draft: UserDraft) -> CoreResult<()> {
        let (email, role, permissions) = draft.validate()?;
        self.email = email;
        self.name = clean(draft.name);
        self.role = role;
        self.permissions = permissions;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Record for User {
    const KIND: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

impl Fields for User {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "email" => Some(FieldValue::text(&self.email)),
            "name" => self.name.as_deref().map(FieldValue::text),
            "role" => Some(FieldValue::text(self.role.as_str())),
            "permissions" => Some(FieldValue::owned(
                self.permissions.iter().map(|p| p.key()).collect::<Vec<_>>().join(","),
            )),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

pub const USER_SEARCH_FIELDS: &[&str] = &["email", "name"];

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(email: &str, role: &str, permissions: &[&str]) -> UserDraft {
        UserDraft {
            email: email.to_string(),
            name: Some("  Deniz  ".to_string()),
            role: role.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_user_from_draft_normalises() {
        let user = User::from_draft(draft(" Deniz@Example.COM ", "manager", &["sales", "finance"])).unwrap();
        assert_eq!(user.email, "deniz@example.com");
        assert_eq!(user.name.as_deref(), Some("Deniz"));
        assert_eq!(user.role, Role::Manager);
        assert!(user.permissions.contains(&Permission::Finance));
    }

    #[test]
    fn test_user_draft_rejects_bad_input() {
        assert!(User::from_draft(draft("no-at-sign", "ADMIN", &[])).is_err());
        assert!(User::from_draft(draft("a@b.io", "OWNER", &[])).is_err());
        assert!(User::from_draft(draft("a@b.io", "ADMIN", &["root"])).is_err());
    }
}
