use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for creating an event. The code and QR URL are assigned on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub event_name: String,
    pub description: String,
    pub event_date_time: DateTime<Utc>,
    pub code_expired_at: DateTime<Utc>,
    pub event_version: String,
    pub organization_code: String,
}
