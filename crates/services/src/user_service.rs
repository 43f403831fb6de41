use std::sync::Arc;

use edu_core::model::{Identity, User};
use storage::repository::{UserProfile, UserRepository};

use crate::error::ServiceError;

/// Parse a comma separated admin list into trimmed, lower-cased emails.
#[must_use]
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

/// Mirrors signed-in identities into user rows and checks roles.
#[derive(Clone)]
pub struct UserService {
    durable: bool,
    admin_emails: Arc<[String]>,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(durable: bool, admin_emails: Vec<String>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            durable,
            admin_emails: admin_emails.into(),
            users,
        }
    }

    fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    /// Create or refresh the caller's user row.
    ///
    /// Listed admin emails are promoted; everyone else keeps their role,
    /// new users start as students.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthenticated` when the identity carries no
    /// email, or `ServiceError::NotConfigured` without a database.
    pub async fn ensure(&self, identity: &Identity) -> Result<User, ServiceError> {
        let email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ServiceError::Unauthenticated)?;

        let profile = UserProfile {
            id: identity.user_id.clone(),
            email: email.to_owned(),
            name: identity
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_owned),
            make_admin: self.is_admin_email(email),
        };
        Ok(self.users.ensure_user(&profile).await?)
    }

    /// Gate for authoring: no database, then no identity, then not an admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotConfigured`, `ServiceError::Unauthenticated`
    /// or `ServiceError::Forbidden`, checked in that order.
    pub async fn require_admin(&self, identity: Option<&Identity>) -> Result<User, ServiceError> {
        if !self.durable {
            return Err(ServiceError::NotConfigured);
        }
        let identity = identity.ok_or(ServiceError::Unauthenticated)?;
        let user = self.ensure(identity).await?;
        if !user.is_admin() {
            tracing::warn!(user = %user.id, "admin access denied");
            return Err(ServiceError::Forbidden);
        }
        Ok(user)
    }
}
