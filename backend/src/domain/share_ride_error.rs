//! Failures of the matching and transition engines.

use serde_json::json;

use crate::domain::ports::{ShareRideRepositoryError, UserAccountRepositoryError};
use crate::domain::{Error, MissingPayment, ShareRide, ShareRideId, TransitionRejected};

/// Outcome of a rejected or failed share ride operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShareRideError {
    #[error("{message}")]
    NotFound { message: String },
    /// A uniqueness rule or state guard rejected the request.
    ///
    /// `ride` is the fully loaded ride when the engine already read it.
    #[error("{message}")]
    Conflict {
        message: String,
        existing_ride: Option<ShareRideId>,
        ride: Option<Box<ShareRide>>,
    },
    #[error("{message}")]
    Forbidden { message: String },
    #[error(transparent)]
    RuleViolation(#[from] TransitionRejected),
    #[error(transparent)]
    MissingPayment(#[from] MissingPayment),
    #[error(transparent)]
    Rides(#[from] ShareRideRepositoryError),
    #[error(transparent)]
    Accounts(#[from] UserAccountRepositoryError),
}

impl ShareRideError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            existing_ride: None,
            ride: None,
        }
    }

    /// Conflict that points the caller at the ride already in place.
    pub fn conflict_with(message: impl Into<String>, existing_ride: ShareRideId) -> Self {
        Self::Conflict {
            message: message.into(),
            existing_ride: Some(existing_ride),
            ride: None,
        }
    }

    /// Conflict returning the whole ride already in place.
    pub fn conflict_with_ride(message: impl Into<String>, ride: ShareRide) -> Self {
        Self::Conflict {
            message: message.into(),
            existing_ride: Some(ride.id),
            ride: Some(Box::new(ride)),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Whether the failure came from the store rather than a business rule.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::Rides(
                ShareRideRepositoryError::Connection { .. } | ShareRideRepositoryError::Query { .. }
            ) | Self::Accounts(_)
                | Self::MissingPayment(_)
        )
    }
}

impl From<ShareRideError> for Error {
    fn from(value: ShareRideError) -> Self {
        match value {
            ShareRideError::NotFound { message } => Error::not_found(message),
            ShareRideError::Conflict {
                message,
                existing_ride: Some(ride_id),
                ride: Some(ride),
            } => Error::conflict(message)
                .with_details(json!({ "shareRideId": ride_id, "shareRide": ride })),
            ShareRideError::Conflict {
                message,
                existing_ride: Some(ride_id),
                ride: None,
            } => Error::conflict(message).with_details(json!({ "shareRideId": ride_id })),
            ShareRideError::Conflict { message, .. } => Error::conflict(message),
            ShareRideError::Forbidden { message } => Error::forbidden(message),
            ShareRideError::RuleViolation(rejected) => Error::rule_violation(rejected.to_string())
                .with_details(json!({
                    "currentStatus": rejected.current.code(),
                    "requestedStatus": rejected.requested,
                })),
            ShareRideError::MissingPayment(missing) => Error::internal(missing.to_string()),
            ShareRideError::Rides(ShareRideRepositoryError::Conflict { message }) => {
                Error::conflict(message)
            }
            ShareRideError::Rides(ShareRideRepositoryError::Connection { message })
            | ShareRideError::Accounts(UserAccountRepositoryError::Connection { message }) => {
                Error::service_unavailable(format!("share ride store unavailable: {message}"))
            }
            ShareRideError::Rides(ShareRideRepositoryError::Query { message })
            | ShareRideError::Accounts(UserAccountRepositoryError::Query { message }) => {
                Error::internal(format!("share ride store error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::{ErrorCode, PassengerId, PassengerStatus, UserId};
    use crate::test_support::fixtures::sample_ride;

    #[rstest]
    #[case(ShareRideError::not_found("no ride"), ErrorCode::NotFound)]
    #[case(ShareRideError::conflict("busy"), ErrorCode::Conflict)]
    #[case(ShareRideError::forbidden("not yours"), ErrorCode::Forbidden)]
    #[case(
        ShareRideError::from(TransitionRejected { current: PassengerStatus::Done, requested: 5 }),
        ErrorCode::RuleViolation
    )]
    #[case(
        ShareRideError::from(ShareRideRepositoryError::conflict("raced")),
        ErrorCode::Conflict
    )]
    #[case(
        ShareRideError::from(ShareRideRepositoryError::connection("refused")),
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        ShareRideError::from(UserAccountRepositoryError::connection("refused")),
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        ShareRideError::from(ShareRideRepositoryError::query("bad sql")),
        ErrorCode::InternalError
    )]
    #[case(
        ShareRideError::from(MissingPayment { passenger_id: PassengerId::new(4) }),
        ErrorCode::InternalError
    )]
    fn maps_to_error_codes(#[case] err: ShareRideError, #[case] code: ErrorCode) {
        assert_eq!(Error::from(err).code(), code);
    }

    #[rstest]
    fn conflict_carries_existing_ride() {
        let err = Error::from(ShareRideError::conflict_with(
            "already searching",
            ShareRideId::new(9),
        ));
        assert_eq!(err.details(), Some(&json!({ "shareRideId": 9 })));
    }

    #[rstest]
    fn searching_conflict_returns_the_whole_ride() {
        let ride = sample_ride(ShareRideId::new(9), UserId::new(1));
        let expected = serde_json::to_value(&ride).expect("ride serialises");

        let err = Error::from(ShareRideError::conflict_with_ride("already searching", ride));

        let details = err.details().expect("details present");
        assert_eq!(details.get("shareRideId"), Some(&json!(9)));
        assert_eq!(details.get("shareRide"), Some(&expected));
        assert_eq!(details.pointer("/shareRide/driverStatus"), Some(&json!(1)));
    }

    #[rstest]
    fn storage_failures_are_distinguished_from_rules() {
        assert!(ShareRideError::from(ShareRideRepositoryError::query("x")).is_storage_failure());
        let conflict = ShareRideError::from(ShareRideRepositoryError::conflict("x"));
        assert!(!conflict.is_storage_failure());
        assert!(!ShareRideError::forbidden("x").is_storage_failure());
    }
}
