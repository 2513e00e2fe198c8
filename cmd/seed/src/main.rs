//! # seed
//!
//! Operator tool: migrates the database, provisions the default and staff
//! groups, creates a staff account and a welcome newspost.
//!
//! Usage: `seed <staff-username> <staff-password>`

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::Argon2Hasher;
use chrono::Utc;
use configs::Settings;
use domains::{perms, AccountRepo, CredentialHasher, NewNewspost, NewUser, NewsRepo};
use services::GroupBootstrap;
use storage_adapters::SqliteStore;

const STAFF_GROUP: &str = "Staff";

const STAFF_PERMISSIONS: &[&str] = &[
    perms::ADD_NEWSPOST,
    perms::CHANGE_NEWSPOST,
    perms::DELETE_NEWSPOST,
    perms::VIEW_NEWSPOST,
    perms::ADD_COMMENT,
    perms::CHANGE_COMMENT,
    perms::DELETE_COMMENT,
    perms::VIEW_COMMENT,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(username), Some(password)) = (args.next(), args.next()) else {
        bail!("usage: seed <staff-username> <staff-password>");
    };

    let settings = Settings::load()?;
    let store = Arc::new(
        SqliteStore::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("opening database")?,
    );

    GroupBootstrap::new(
        store.clone(),
        settings.accounts.default_group_name,
        settings.accounts.default_group_permissions,
    )
    .ensure_default_group()
    .await
    .context("provisioning default group")?;

    let staff_group = GroupBootstrap::new(
        store.clone(),
        STAFF_GROUP,
        STAFF_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
    )
    .ensure_default_group()
    .await
    .context("provisioning staff group")?;

    let staff = match store.find_user_by_username(&username).await? {
        Some(existing) => {
            tracing::info!(username = %existing.username, "staff user already exists");
            existing
        }
        None => {
            let password_hash = Argon2Hasher::new().hash_password(&password).await?;
            let user = store
                .create_user(
                    NewUser {
                        username,
                        password_hash,
                        is_staff: true,
                    },
                    &[staff_group.group.id],
                )
                .await?;
            tracing::info!(username = %user.username, "created staff user");
            user
        }
    };

    if store.list_newsposts(1).await?.is_empty() {
        let post = store
            .create_newspost(NewNewspost {
                title: "Welcome".into(),
                main_text: "The news board is up and running.".into(),
                photo: None,
                audio: None,
                video: None,
                pub_date: Utc::now(),
                author: Some(staff.id),
            })
            .await?;
        tracing::info!(newspost = %post.id, "created welcome newspost");
    }

    Ok(())
}
