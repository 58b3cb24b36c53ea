mod error;
mod operations;
mod requests;
mod tables;
mod types;

pub use error::EventError;
pub use operations::{event_code_from_object_key, normalize_phone, parse_registration};
pub use requests::CreateEventRequest;
pub use tables::TableNames;
pub use types::{Event, EventCheckIn, EventOrganization, EventRegistration};
