//! Attendance: validating a scan and recording the check-in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use checkin_core::event::{normalize_phone, EventCheckIn, EventError};
use checkin_core::storage::TableError;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("Event not found: {0}")]
    EventNotFound(String),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("{phone} is not registered for event {event_code}")]
    NotRegistered { event_code: String, phone: String },
    #[error("{phone} already checked into event {event_code}")]
    AlreadyChecked { event_code: String, phone: String },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Result of a successful check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInResponse {
    pub name: Option<String>,
    /// Events of the same version this attendee has checked into, this one included.
    pub count: usize,
}

/// Records `phone` arriving at `event_code` at `now`.
pub async fn check_attendance(
    state: &AppState,
    event_code: &str,
    phone: &str,
    now: DateTime<Utc>,
) -> Result<CheckInResponse, CheckInError> {
    let event = state
        .events
        .get(event_code, None)
        .await?
        .ok_or_else(|| CheckInError::EventNotFound(event_code.to_string()))?;
    event.validate(now)?;

    let phone = normalize_phone(phone);
    let registration = state
        .registrations
        .get(event_code, Some(&phone))
        .await?
        .ok_or_else(|| CheckInError::NotRegistered {
            event_code: event_code.to_string(),
            phone: phone.clone(),
        })?;

    if state
        .check_ins
        .get(&phone, Some(event_code))
        .await?
        .is_some()
    {
        return Err(CheckInError::AlreadyChecked {
            event_code: event_code.to_string(),
            phone,
        });
    }

    let check_in = state
        .check_ins
        .put(EventCheckIn::create(&event, &registration, now))
        .await?;

    let count = list_check_ins(state, &phone, Some(&event.event_version))
        .await?
        .len();

    tracing::info!(
        event_code = %event_code,
        event_version = %event.event_version,
        count,
        "Attendee checked in"
    );

    Ok(CheckInResponse {
        name: check_in.name,
        count,
    })
}

/// Check-in history of `phone`, optionally narrowed to one event version.
pub async fn list_check_ins(
    state: &AppState,
    phone: &str,
    event_version: Option<&str>,
) -> Result<Vec<EventCheckIn>, TableError> {
    let phone = normalize_phone(phone);
    let filter = match event_version {
        Some(version) => Some(
            state
                .check_ins
                .filter()
                .eq("event_version", version)
                .build()?,
        ),
        None => None,
    };

    state.check_ins.query(&phone, filter.as_ref()).await
}
