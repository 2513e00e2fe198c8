//! Data mapping for users, groups and permissions.

use async_trait::async_trait;
use chrono::Utc;
use domains::{
    AccountRepo, AppError, Group, GroupId, NewUser, Permission, PermissionId, Result, User, UserId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{db_err, SqliteStore};

const USER_COLUMNS: &str = "id, username, password_hash, is_staff, date_joined, session_epoch";

fn row_to_user(row: &SqliteRow) -> std::result::Result<User, sqlx::Error> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        is_staff: row.try_get("is_staff")?,
        date_joined: row.try_get("date_joined")?,
        session_epoch: row.try_get("session_epoch")?,
    })
}

fn row_to_group(row: &SqliteRow) -> std::result::Result<Group, sqlx::Error> {
    Ok(Group {
        id: GroupId(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}

fn row_to_permission(row: &SqliteRow) -> std::result::Result<Permission, sqlx::Error> {
    Ok(Permission {
        id: PermissionId(row.try_get("id")?),
        codename: row.try_get("codename")?,
        name: row.try_get("name")?,
    })
}

#[async_trait]
impl AccountRepo for SqliteStore {
    /// The user row and its memberships commit together, so a failed
    /// membership insert never leaves a group-less account behind.
    async fn create_user(&self, user: NewUser, groups: &[GroupId]) -> Result<User> {
        let date_joined = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, is_staff, date_joined) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(date_joined)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match db_err(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("username {}", user.username)),
            other => other,
        })?;

        for group in groups {
            sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES (?, ?)")
                .bind(id)
                .bind(group.0)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        Ok(User {
            id: UserId(id),
            username: user.username,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            date_joined,
            session_epoch: 0,
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose().map_err(db_err)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose().map_err(db_err)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let done = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn revoke_sessions(&self, id: UserId) -> Result<bool> {
        let done = sqlx::query("UPDATE users SET session_epoch = session_epoch + 1 WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_staff(&self) -> Result<Vec<User>> {
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_staff = 1 ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(row_to_user)
        .collect::<std::result::Result<_, _>>()
        .map_err(db_err)
    }

    async fn user_permissions(&self, id: UserId) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT p.codename FROM auth_permissions p \
             JOIN group_permissions gp ON gp.permission_id = p.id \
             JOIN user_groups ug ON ug.group_id = gp.group_id \
             WHERE ug.user_id = ? ORDER BY p.codename",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_permission(&self, codename: &str) -> Result<Option<Permission>> {
        let row = sqlx::query("SELECT id, codename, name FROM auth_permissions WHERE codename = ?")
            .bind(codename)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_permission).transpose().map_err(db_err)
    }

    async fn find_group(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, name FROM auth_groups WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_group).transpose().map_err(db_err)
    }

    /// Atomic lookup-or-create.
    ///
    /// The unique index on `auth_groups.name` decides the race: the loser's
    /// insert becomes a no-op and it reads the winner's row inside the same
    /// transaction.
    async fn get_or_create_group(
        &self,
        name: &str,
        permissions: &[PermissionId],
    ) -> Result<(Group, bool)> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO auth_groups (name) VALUES (?) ON CONFLICT (name) DO NOTHING RETURNING id",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let (id, created) = match inserted {
            Some(id) => {
                for permission in permissions {
                    sqlx::query(
                        "INSERT INTO group_permissions (group_id, permission_id) VALUES (?, ?) \
                         ON CONFLICT DO NOTHING",
                    )
                    .bind(id)
                    .bind(permission.0)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
                }
                (id, true)
            }
            None => {
                let id: i64 = sqlx::query_scalar("SELECT id FROM auth_groups WHERE name = ?")
                    .bind(name)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_err)?;
                (id, false)
            }
        };

        tx.commit().await.map_err(db_err)?;

        Ok((
            Group {
                id: GroupId(id),
                name: name.to_string(),
            },
            created,
        ))
    }

    async fn group_permissions(&self, id: GroupId) -> Result<Vec<Permission>> {
        sqlx::query(
            "SELECT p.id, p.codename, p.name FROM auth_permissions p \
             JOIN group_permissions gp ON gp.permission_id = p.id \
             WHERE gp.group_id = ? ORDER BY p.codename",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(row_to_permission)
        .collect::<std::result::Result<_, _>>()
        .map_err(db_err)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        sqlx::query("SELECT id, name FROM auth_groups ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_group)
            .collect::<std::result::Result<_, _>>()
            .map_err(db_err)
    }
}
