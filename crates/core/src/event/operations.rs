use super::types::EventRegistration;

/// Canonical phone form used in keys: dashes and surrounding whitespace removed.
pub fn normalize_phone(phone: &str) -> String {
    phone.trim().replace('-', "")
}

/// Builds a registration from one export row's name cell and info cell.
///
/// `info` is the slash-separated `name/company/email/phone` answer attendees
/// fill in. The phone is always the last part and the email the one before
/// it. Rows without a phone yield `None`.
pub fn parse_registration(
    event_code: &str,
    name: Option<&str>,
    info: &str,
) -> Option<EventRegistration> {
    let parts: Vec<&str> = info.split('/').map(str::trim).collect();
    let phone = normalize_phone(parts.last()?);
    if phone.is_empty() {
        return None;
    }
    let email = match parts.len() {
        n if n >= 2 => Some(parts[n - 2]).filter(|e| !e.is_empty()),
        _ => None,
    };

    Some(EventRegistration {
        event_code: event_code.to_string(),
        phone,
        name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        email: email.map(str::to_string),
    })
}

/// Event code encoded in an uploaded export's name, `..._{code}.csv`.
pub fn event_code_from_object_key(key: &str) -> Option<&str> {
    let file_name = key.rsplit('/').next()?;
    let (_, code) = file_name.rsplit_once('_')?;
    let code = code.strip_suffix(".csv").unwrap_or(code);
    (!code.is_empty()).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone(" 010-1234-5678 "), "01012345678");
        assert_eq!(normalize_phone("01012345678"), "01012345678");
    }

    #[test]
    fn test_parse_full_row() {
        let registration =
            parse_registration("E1", Some("Kim"), "Kim/Acme/kim@example.com/010-1234-5678")
                .unwrap();

        assert_eq!(registration.event_code, "E1");
        assert_eq!(registration.phone, "01012345678");
        assert_eq!(registration.name.as_deref(), Some("Kim"));
        assert_eq!(registration.email.as_deref(), Some("kim@example.com"));
    }

    #[test]
    fn test_parse_phone_only() {
        let registration = parse_registration("E1", Some("Lee"), "010-9999-0000").unwrap();
        assert_eq!(registration.phone, "01099990000");
        assert_eq!(registration.email, None);
    }

    #[test]
    fn test_parse_without_phone_is_skipped() {
        assert!(parse_registration("E1", Some("Park"), "").is_none());
        assert!(parse_registration("E1", Some("Park"), "Park/Acme/ ").is_none());
    }

    #[test]
    fn test_parse_without_name() {
        let registration = parse_registration("E1", None, "a@b.c/010-1111-2222").unwrap();
        assert_eq!(registration.name, None);
        assert_eq!(registration.email.as_deref(), Some("a@b.c"));

        let blank = parse_registration("E1", Some("  "), "010-1111-2222").unwrap();
        assert_eq!(blank.name, None);
    }

    #[test]
    fn test_event_code_from_object_key() {
        assert_eq!(
            event_code_from_object_key("uploads/registrations_3f2a.csv"),
            Some("3f2a")
        );
        assert_eq!(event_code_from_object_key("list_E1"), Some("E1"));
        assert_eq!(event_code_from_object_key("registrations.csv"), None);
        assert_eq!(event_code_from_object_key("list_.csv"), None);
    }
}
