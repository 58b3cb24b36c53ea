//! Event creation and lookup.

use checkin_core::event::{CreateEventRequest, Event};
use checkin_core::storage::TableError;
use uuid::Uuid;

use crate::state::AppState;

/// Creates an event under a fresh code.
///
/// The QR URL points at `{QR_BASE_URL}/{event_code}.png`; rendering and
/// uploading the image happens elsewhere.
pub async fn create_event(state: &AppState, request: CreateEventRequest) -> Result<Event, TableError> {
    let event_code = Uuid::new_v4().to_string();
    let qr_url = state.config.qr_url(&event_code);
    let event = state
        .events
        .put(Event::from_request(request, event_code, qr_url))
        .await?;

    tracing::info!(event_code = %event.event_code, event_name = %event.event_name, "Event created");
    Ok(event)
}

pub async fn get_event(state: &AppState, event_code: &str) -> Result<Option<Event>, TableError> {
    state.events.get(event_code, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;
    use chrono::{TimeZone, Utc};

    fn sample_request() -> CreateEventRequest {
        CreateEventRequest {
            event_name: "Meetup".to_string(),
            description: "Monthly meetup".to_string(),
            event_date_time: Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap(),
            code_expired_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            event_version: "v1".to_string(),
            organization_code: "ORG".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_event() {
        let (state, _) = test_support::in_memory();

        let event = create_event(&state, sample_request()).await.unwrap();

        assert!(Uuid::parse_str(&event.event_code).is_ok());
        assert_eq!(
            event.qr_url,
            format!("https://dev-qr.s3.amazonaws.com/{}.png", event.event_code)
        );
        let stored = get_event(&state, &event.event_code).await.unwrap();
        assert_eq!(stored, Some(event));
    }

    #[tokio::test]
    async fn test_get_missing_event() {
        let (state, _) = test_support::in_memory();
        assert_eq!(get_event(&state, "nope").await.unwrap(), None);
    }
}
