//! The identity of the shopper driving a session.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Who is using the storefront right now.
///
/// Passed explicitly into engines instead of being read from ambient session
/// state. Both fields may be absent for anonymous shoppers; consumers must
/// degrade (skip per-user keys, skip notifications) rather than fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentIdentity {
    pub user_id: Option<UserId>,
    pub email: Option<String>,
}

impl CurrentIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            email: Some(email.into()),
        }
    }

    pub fn with_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            email: None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Recipient address, ignoring blank values.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_email_counts_as_absent() {
        let identity = CurrentIdentity {
            user_id: Some(UserId::new()),
            email: Some("   ".to_string()),
        };
        assert_eq!(identity.email(), None);
        assert!(!identity.is_anonymous());
    }

    #[test]
    fn anonymous_identity_has_nothing() {
        let identity = CurrentIdentity::anonymous();
        assert!(identity.is_anonymous());
        assert_eq!(identity.email(), None);
    }
}
