use thiserror::Error;

/// Domain rules that reject a check-in before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("The default event cannot be checked into; scan the event QR code")]
    DefaultEvent,
    #[error("Check-in for event {event_code} closed at {closed_at}")]
    CheckInClosed {
        event_code: String,
        closed_at: String,
    },
}
