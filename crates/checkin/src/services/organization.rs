//! Organizations running events.

use checkin_core::event::EventOrganization;
use checkin_core::storage::TableError;

use crate::state::AppState;

pub async fn save_organization(
    state: &AppState,
    organization: EventOrganization,
) -> Result<EventOrganization, TableError> {
    let organization = state.organizations.put(organization).await?;
    tracing::info!(
        organization_code = %organization.organization_code,
        versions = organization.event_version.len(),
        "Organization saved"
    );
    Ok(organization)
}

pub async fn get_organization(
    state: &AppState,
    organization_code: &str,
) -> Result<Option<EventOrganization>, TableError> {
    state.organizations.get(organization_code, None).await
}

/// Adds `version` to the organization's event versions and returns the result.
///
/// The version is appended in the store, so concurrent additions of different
/// versions all survive. Fails with `TableError::NotFound` when the
/// organization does not exist.
pub async fn add_event_version(
    state: &AppState,
    organization_code: &str,
    version: &str,
) -> Result<EventOrganization, TableError> {
    let current = state
        .organizations
        .get(organization_code, None)
        .await?
        .ok_or_else(|| TableError::NotFound {
            table: state.organizations.table_name().to_string(),
            key: format!("({organization_code})"),
        })?;

    if current.event_version.iter().any(|v| v == version) {
        return Ok(current);
    }

    let patch = state
        .organizations
        .patch()
        .append("event_version", &vec![version.to_string()])
        .build()?;
    let updated = state
        .organizations
        .update(organization_code, None, &patch)
        .await?;
    tracing::info!(
        organization_code,
        version,
        versions = updated.event_version.len(),
        "Event version added"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    fn sample_organization() -> EventOrganization {
        EventOrganization {
            organization_code: "ORG".to_string(),
            organization_name: "Sunny".to_string(),
            logo_url: "https://example.com/logo.png".to_string(),
            event_version: vec!["v1".to_string()],
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let (state, _) = test_support::in_memory();
        save_organization(&state, sample_organization()).await.unwrap();
        assert_eq!(
            get_organization(&state, "ORG").await.unwrap(),
            Some(sample_organization())
        );
    }

    #[tokio::test]
    async fn test_add_event_version() {
        let (state, _) = test_support::in_memory();
        save_organization(&state, sample_organization()).await.unwrap();

        let updated = add_event_version(&state, "ORG", "v2").await.unwrap();
        assert_eq!(updated.event_version, vec!["v1", "v2"]);
        assert_eq!(updated.organization_name, "Sunny");

        let unchanged = add_event_version(&state, "ORG", "v2").await.unwrap();
        assert_eq!(unchanged.event_version, vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn test_concurrent_additions_are_kept() {
        let (state, _) = test_support::in_memory();
        save_organization(&state, sample_organization()).await.unwrap();

        let (a, b, c) = tokio::join!(
            add_event_version(&state, "ORG", "v2"),
            add_event_version(&state, "ORG", "v3"),
            add_event_version(&state, "ORG", "v4"),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let mut versions = get_organization(&state, "ORG")
            .await
            .unwrap()
            .unwrap()
            .event_version;
        versions.sort_unstable();
        assert_eq!(versions, vec!["v1", "v2", "v3", "v4"]);
    }

    #[tokio::test]
    async fn test_add_event_version_to_missing_organization() {
        let (state, _) = test_support::in_memory();
        let err = add_event_version(&state, "ORG", "v2").await.unwrap_err();
        assert!(matches!(err, TableError::NotFound { .. }));
    }
}
