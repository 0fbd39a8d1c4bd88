//! User service port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::session::User;

/// Port for user lookups.
#[async_trait]
pub trait UserService: Send + Sync {
    /// # Errors
    ///
    /// - `UserNotFound` if no such user exists
    async fn get_user(&self, user_id: &UserId) -> Result<User, DomainError>;
}
