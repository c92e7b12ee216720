//! Recipient resolution

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Role, User};
use crate::query::Filter;
use crate::repositories::Repository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

impl Recipient {
    /// `None` when the user opted out of email notifications
    pub fn from_user(user: &User) -> Option<Self> {
        if !user.wants_email() {
            return None;
        }
        Some(Self {
            email: user.email.clone(),
            name: user.name.clone(),
        })
    }

    /// Account mail (verification, password reset) ignores the opt-out
    pub fn account(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Active users of a tenant holding one of `roles`. Lookup failures only
/// cost the notification, never the request.
pub async fn recipients_with_roles(
    users: &Repository<User>,
    tenant_id: Uuid,
    roles: &[Role],
) -> Vec<Recipient> {
    let filter = Filter::and(vec![
        Filter::eq("tenantId", tenant_id.to_string()),
        Filter::eq("isActive", true),
        Filter::Or {
            filters: roles
                .iter()
                .map(|role| Filter::eq("role", role.as_str()))
                .collect(),
        },
    ]);

    match users.find_all(filter).await {
        Ok(users) => users.iter().filter_map(Recipient::from_user).collect(),
        Err(e) => {
            warn!(tenant_id = %tenant_id, error = %e, "failed to resolve notification recipients");
            Vec::new()
        }
    }
}

/// Single user by id, honouring the opt-out
pub async fn recipient_for(users: &Repository<User>, user_id: Uuid) -> Option<Recipient> {
    match users.find(user_id).await {
        Ok(Some(user)) if user.is_active => Recipient::from_user(&user),
        Ok(_) => None,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "failed to resolve notification recipient");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_opted_out_user_skipped() {
        let mut user = User::new(Uuid::new_v4(), "Sari".into(), "sari@x.com", "h".into(), Role::Resident);
        assert!(Recipient::from_user(&user).is_some());
        user.merge_preferences(json!({"notifications": {"email": false}}));
        assert!(Recipient::from_user(&user).is_none());
        assert_eq!(Recipient::account(&user).email, "sari@x.com");
    }
}
