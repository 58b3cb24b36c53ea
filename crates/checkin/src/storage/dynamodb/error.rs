//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `StoreError` from `checkin_core::storage`: throttling,
//! server faults, timeouts, and dispatch failures are transient; everything
//! else is permanent.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use checkin_core::storage::StoreError;

/// Service error codes worth retrying.
const TRANSIENT_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
    "InternalServerError",
    "ServiceUnavailable",
    "TransactionConflictException",
];

/// Whether a DynamoDB error code names a transient condition.
pub fn is_transient_code(code: &str) -> bool {
    TRANSIENT_CODES.contains(&code)
}

/// Map any SDK error for `operation` to a `StoreError`.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, operation: &'static str) -> StoreError
where
    E: ProvideErrorMetadata + Debug,
    R: Debug,
{
    match &err {
        SdkError::TimeoutError(_) => {
            StoreError::Transient(format!("{operation} timed out"))
        }
        SdkError::DispatchFailure(failure) => {
            StoreError::Transient(format!("{operation} dispatch failed: {failure:?}"))
        }
        SdkError::ResponseError(_) => {
            StoreError::Transient(format!("{operation} returned an unreadable response"))
        }
        SdkError::ServiceError(service) => {
            let service = service.err();
            let code = service.code().unwrap_or("Unknown");
            let message = format!(
                "{operation} failed: {code}: {}",
                service.message().unwrap_or_default()
            );
            if is_transient_code(code) {
                StoreError::Transient(message)
            } else {
                StoreError::Permanent(message)
            }
        }
        other => StoreError::Permanent(format!("{operation} failed: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttling_codes_are_transient() {
        assert!(is_transient_code("ProvisionedThroughputExceededException"));
        assert!(is_transient_code("RequestLimitExceeded"));
        assert!(is_transient_code("ThrottlingException"));
        assert!(is_transient_code("InternalServerError"));
    }

    #[test]
    fn test_client_faults_are_permanent() {
        assert!(!is_transient_code("ResourceNotFoundException"));
        assert!(!is_transient_code("ValidationException"));
        assert!(!is_transient_code("ConditionalCheckFailedException"));
    }
}
