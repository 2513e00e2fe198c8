//! # Group Bootstrap
//!
//! Lazily provisions the group that self-registered users are enrolled in.

use std::sync::Arc;

use domains::{AccountRepo, AppError, Group, Result};

/// The default group as seen by one `ensure_default_group` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredGroup {
    pub group: Group,
    /// True when this call created the group.
    pub created: bool,
}

pub struct GroupBootstrap {
    accounts: Arc<dyn AccountRepo>,
    name: String,
    permissions: Vec<String>,
}

impl GroupBootstrap {
    pub fn new(accounts: Arc<dyn AccountRepo>, name: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            accounts,
            name: name.into(),
            permissions,
        }
    }

    pub fn group_name(&self) -> &str {
        &self.name
    }

    /// Returns the configured group, creating it with exactly the configured
    /// permissions if it does not exist yet.
    ///
    /// Permission codenames are only resolved on the creation path. A missing
    /// one aborts with `UnknownPermission` before anything is written.
    pub async fn ensure_default_group(&self) -> Result<EnsuredGroup> {
        if let Some(group) = self.accounts.find_group(&self.name).await? {
            return Ok(EnsuredGroup { group, created: false });
        }

        let mut permission_ids = Vec::with_capacity(self.permissions.len());
        for codename in &self.permissions {
            match self.accounts.find_permission(codename).await? {
                Some(permission) => permission_ids.push(permission.id),
                None => {
                    tracing::error!(group = %self.name, %codename, "default group references a missing permission");
                    return Err(AppError::UnknownPermission(codename.clone()));
                }
            }
        }

        // Another request may have won the race since the lookup above; the
        // store resolves that atomically and reports who created it.
        let (group, created) = self
            .accounts
            .get_or_create_group(&self.name, &permission_ids)
            .await?;

        if created {
            tracing::info!(group = %group.name, permissions = ?self.permissions, "created default group");
        }
        Ok(EnsuredGroup { group, created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{GroupId, MockAccountRepo, Permission, PermissionId};
    use mockall::predicate::eq;

    fn group() -> Group {
        Group {
            id: GroupId(3),
            name: "Average".into(),
        }
    }

    fn permission(id: i64, codename: &str) -> Permission {
        Permission {
            id: PermissionId(id),
            codename: codename.into(),
            name: format!("Can {}", codename.replace('_', " ")),
        }
    }

    fn bootstrap(repo: MockAccountRepo) -> GroupBootstrap {
        GroupBootstrap::new(
            Arc::new(repo),
            "Average",
            vec!["add_comment".into(), "view_newspost".into()],
        )
    }

    #[tokio::test]
    async fn existing_group_is_returned_without_touching_permissions() {
        let mut repo = MockAccountRepo::new();
        repo.expect_find_group()
            .with(eq("Average"))
            .returning(|_| Ok(Some(group())));
        repo.expect_find_permission().never();
        repo.expect_get_or_create_group().never();

        let ensured = bootstrap(repo).ensure_default_group().await.unwrap();
        assert_eq!(ensured, EnsuredGroup { group: group(), created: false });
    }

    #[tokio::test]
    async fn missing_group_is_created_with_resolved_permissions() {
        let mut repo = MockAccountRepo::new();
        repo.expect_find_group().returning(|_| Ok(None));
        repo.expect_find_permission()
            .with(eq("add_comment"))
            .returning(|c| Ok(Some(permission(1, c))));
        repo.expect_find_permission()
            .with(eq("view_newspost"))
            .returning(|c| Ok(Some(permission(4, c))));
        repo.expect_get_or_create_group()
            .withf(|name, ids| name == "Average" && ids == [PermissionId(1), PermissionId(4)])
            .times(1)
            .returning(|_, _| Ok((group(), true)));

        let ensured = bootstrap(repo).ensure_default_group().await.unwrap();
        assert!(ensured.created);
    }

    #[test]
    fn unknown_permission_is_reported_and_nothing_is_created() {
        let mut repo = MockAccountRepo::new();
        repo.expect_find_group().returning(|_| Ok(None));
        repo.expect_find_permission()
            .with(eq("add_comment"))
            .returning(|c| Ok(Some(permission(1, c))));
        repo.expect_find_permission()
            .with(eq("view_newspost"))
            .returning(|_| Ok(None));
        repo.expect_get_or_create_group().never();

        let err = tokio_test::block_on(bootstrap(repo).ensure_default_group()).unwrap_err();
        assert_eq!(err, AppError::UnknownPermission("view_newspost".into()));
    }

    #[tokio::test]
    async fn losing_the_creation_race_reports_not_created() {
        let mut repo = MockAccountRepo::new();
        repo.expect_find_group().returning(|_| Ok(None));
        repo.expect_find_permission()
            .returning(|c| Ok(Some(permission(9, c))));
        repo.expect_get_or_create_group()
            .returning(|_, _| Ok((group(), false)));

        let ensured = bootstrap(repo).ensure_default_group().await.unwrap();
        assert!(!ensured.created);
    }
}
