use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{FieldDef, FieldKind, FieldReader, FieldWriter, Record, Result};

use super::error::EventError;
use super::requests::CreateEventRequest;

/// An event attendees check into by scanning its QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_code: String,
    pub event_date_time: DateTime<Utc>,
    pub description: String,
    pub event_name: String,
    /// Public URL of the event's QR code image.
    pub qr_url: String,
    /// Check-in is refused after this instant.
    pub code_expired_at: DateTime<Utc>,
    pub event_version: String,
    pub organization_code: String,
}

impl Event {
    /// Placeholder code the check-in page falls back to without a QR code.
    pub const DEFAULT_CODE: &'static str = "test";

    /// Builds a new event from a request, a fresh code, and its QR URL.
    pub fn from_request(
        request: CreateEventRequest,
        event_code: impl Into<String>,
        qr_url: impl Into<String>,
    ) -> Self {
        Self {
            event_code: event_code.into(),
            event_date_time: request.event_date_time,
            description: request.description,
            event_name: request.event_name,
            qr_url: qr_url.into(),
            code_expired_at: request.code_expired_at,
            event_version: request.event_version,
            organization_code: request.organization_code,
        }
    }

    pub fn is_default(&self) -> bool {
        self.event_code == Self::DEFAULT_CODE
    }

    /// Checks that attendance can still be recorded at `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> std::result::Result<(), EventError> {
        if self.is_default() {
            return Err(EventError::DefaultEvent);
        }
        if self.code_expired_at < now {
            return Err(EventError::CheckInClosed {
                event_code: self.event_code.clone(),
                closed_at: self.code_expired_at.to_rfc3339(),
            });
        }
        Ok(())
    }
}

impl Record for Event {
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::partition("event_code"),
        FieldDef::required("event_date_time", FieldKind::DateTime),
        FieldDef::required("description", FieldKind::String),
        FieldDef::required("event_name", FieldKind::String),
        FieldDef::required("qr_url", FieldKind::String),
        FieldDef::required("code_expired_at", FieldKind::DateTime),
        FieldDef::required("event_version", FieldKind::String),
        FieldDef::required("organization_code", FieldKind::String),
    ];

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields
            .set("event_code", &self.event_code)
            .set("event_date_time", &self.event_date_time)
            .set("description", &self.description)
            .set("event_name", &self.event_name)
            .set("qr_url", &self.qr_url)
            .set("code_expired_at", &self.code_expired_at)
            .set("event_version", &self.event_version)
            .set("organization_code", &self.organization_code);
    }

    fn read_fields(fields: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            event_code: fields.required("event_code")?,
            event_date_time: fields.required("event_date_time")?,
            description: fields.required("description")?,
            event_name: fields.required("event_name")?,
            qr_url: fields.required("qr_url")?,
            code_expired_at: fields.required("code_expired_at")?,
            event_version: fields.required("event_version")?,
            organization_code: fields.required("organization_code")?,
        })
    }
}

/// One attendee's arrival at one event. Keyed by phone so an attendee's
/// history is a single partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCheckIn {
    pub phone: String,
    pub event_code: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub event_version: String,
}

impl EventCheckIn {
    /// Records `registration` arriving at `event` at `now`.
    pub fn create(event: &Event, registration: &EventRegistration, now: DateTime<Utc>) -> Self {
        Self {
            phone: registration.phone.clone(),
            event_code: event.event_code.clone(),
            email: registration.email.clone(),
            name: registration.name.clone(),
            checked_at: now,
            event_version: event.event_version.clone(),
        }
    }
}

impl Record for EventCheckIn {
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::partition("phone"),
        FieldDef::sort("event_code"),
        FieldDef::optional("email", FieldKind::String),
        FieldDef::optional("name", FieldKind::String),
        FieldDef::required("checked_at", FieldKind::DateTime),
        FieldDef::required("event_version", FieldKind::String),
    ];

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields
            .set("phone", &self.phone)
            .set("event_code", &self.event_code)
            .set_optional("email", self.email.as_ref())
            .set_optional("name", self.name.as_ref())
            .set("checked_at", &self.checked_at)
            .set("event_version", &self.event_version);
    }

    fn read_fields(fields: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            phone: fields.required("phone")?,
            event_code: fields.required("event_code")?,
            email: fields.optional("email")?,
            name: fields.optional("name")?,
            checked_at: fields.required("checked_at")?,
            event_version: fields.required("event_version")?,
        })
    }
}

/// A person registered for an event ahead of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRegistration {
    pub event_code: String,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Record for EventRegistration {
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::partition("event_code"),
        FieldDef::sort("phone"),
        FieldDef::optional("name", FieldKind::String),
        FieldDef::optional("email", FieldKind::String),
    ];

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields
            .set("event_code", &self.event_code)
            .set("phone", &self.phone)
            .set_optional("name", self.name.as_ref())
            .set_optional("email", self.email.as_ref());
    }

    fn read_fields(fields: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            event_code: fields.required("event_code")?,
            phone: fields.required("phone")?,
            name: fields.optional("name")?,
            email: fields.optional("email")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOrganization {
    pub organization_code: String,
    pub organization_name: String,
    pub logo_url: String,
    /// Event versions run by this organization.
    pub event_version: Vec<String>,
}

impl Record for EventOrganization {
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::partition("organization_code"),
        FieldDef::required("organization_name", FieldKind::String),
        FieldDef::required("logo_url", FieldKind::String),
        FieldDef::required("event_version", FieldKind::StringList),
    ];

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields
            .set("organization_code", &self.organization_code)
            .set("organization_name", &self.organization_name)
            .set("logo_url", &self.logo_url)
            .set("event_version", &self.event_version);
    }

    fn read_fields(fields: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            organization_code: fields.required("organization_code")?,
            organization_name: fields.required("organization_name")?,
            logo_url: fields.required("logo_url")?,
            event_version: fields.required("event_version")?,
        })
    }
}
