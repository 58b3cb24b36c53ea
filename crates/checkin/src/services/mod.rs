//! Service layer: thin consumers of the table clients.

pub mod checkin;
pub mod event;
pub mod organization;
pub mod registration;
