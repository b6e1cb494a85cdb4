//! Port for reading user accounts.

use async_trait::async_trait;

use crate::domain::{UserAccount, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user account repository adapters.
    pub enum UserAccountRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "user account repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "user account repository query failed: {message}",
    }
}

/// Port for looking up accounts by id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserAccountRepository: Send + Sync {
    /// Find an account by id.
    async fn find_by_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserAccount>, UserAccountRepositoryError>;
}
