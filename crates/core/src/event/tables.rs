/// Physical table names for one deployment environment.
///
/// Every table is named `{env}-{base}`, e.g. `dev-event-checkin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub event: String,
    pub check_in: String,
    pub registration: String,
    pub organization: String,
}

impl TableNames {
    pub const EVENT: &'static str = "event";
    pub const CHECK_IN: &'static str = "event-checkin";
    pub const REGISTRATION: &'static str = "event-registration";
    pub const ORGANIZATION: &'static str = "event-organization";

    pub fn for_env(env: &str) -> Self {
        Self {
            event: format!("{env}-{}", Self::EVENT),
            check_in: format!("{env}-{}", Self::CHECK_IN),
            registration: format!("{env}-{}", Self::REGISTRATION),
            organization: format!("{env}-{}", Self::ORGANIZATION),
        }
    }
}
