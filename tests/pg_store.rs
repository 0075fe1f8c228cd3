//! Postgres store tests. Run against `TESSERA_TEST_DSN` when set, skipped otherwise.

use anyhow::{ensure, Context, Result};
use std::env;
use tessera::{
    session::secret::hash_secret,
    store::{
        postgres::apply_schema, CredentialStore, Identity, PgStore, ProfilePatch, UpdateOutcome,
    },
};
use ulid::Ulid;

async fn store() -> Result<Option<PgStore>> {
    let Ok(dsn) = env::var("TESSERA_TEST_DSN") else {
        eprintln!("TESSERA_TEST_DSN not set, skipping");
        return Ok(None);
    };

    apply_schema(&dsn).await?;
    Ok(Some(PgStore::connect(&dsn).await?))
}

// unique per test run so reruns against the same database do not collide
fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@tessera.test", Ulid::new().to_string().to_lowercase())
}

fn identity(email: &str, secret: &str, given: &str, family: &str) -> Result<Identity> {
    Ok(Identity {
        email: email.to_string(),
        secret_hash: hash_secret(secret)?,
        given_name: given.to_string(),
        family_name: family.to_string(),
    })
}

#[tokio::test]
async fn upsert_keeps_first_secret() -> Result<()> {
    let Some(store) = store().await? else {
        return Ok(());
    };
    let email = unique_email("upsert");

    store.upsert(&identity(&email, "pw1", "A", "B")?).await?;
    store.upsert(&identity(&email, "pw2", "C", "D")?).await?;

    ensure!(store.matches(&email, "pw1").await?);
    ensure!(!store.matches(&email, "pw2").await?);

    let profile = store.profile(&email).await?.context("profile missing")?;
    ensure!(profile.given_name == "C");
    ensure!(profile.family_name == "D");

    Ok(())
}

#[tokio::test]
async fn matches_unknown_email_is_false() -> Result<()> {
    let Some(store) = store().await? else {
        return Ok(());
    };

    ensure!(!store.matches(&unique_email("ghost"), "pw1").await?);
    ensure!(!store.exists(&unique_email("ghost")).await?);

    Ok(())
}

#[tokio::test]
async fn update_touches_only_its_record() -> Result<()> {
    let Some(store) = store().await? else {
        return Ok(());
    };
    let a = unique_email("a");
    let b = unique_email("b");

    store.upsert(&identity(&a, "pw1", "A", "B")?).await?;
    store.upsert(&identity(&b, "pw2", "Bee", "Bop")?).await?;

    let patch = ProfilePatch {
        given_name: Some("A2".to_string()),
        family_name: None,
    };
    ensure!(store.update_profile(&a, &patch).await? == UpdateOutcome::Updated);

    let profile_a = store.profile(&a).await?.context("profile a missing")?;
    ensure!(profile_a.given_name == "A2");
    ensure!(profile_a.family_name == "B");
    ensure!(store.matches(&a, "pw1").await?);

    let profile_b = store.profile(&b).await?.context("profile b missing")?;
    ensure!(profile_b.given_name == "Bee");

    Ok(())
}

#[tokio::test]
async fn update_missing_record_is_not_found() -> Result<()> {
    let Some(store) = store().await? else {
        return Ok(());
    };

    let outcome = store
        .update_profile(&unique_email("missing"), &ProfilePatch::default())
        .await?;
    ensure!(outcome == UpdateOutcome::NotFound);

    Ok(())
}

#[tokio::test]
async fn ping_and_reapply_schema() -> Result<()> {
    let Some(store) = store().await? else {
        return Ok(());
    };
    store.ping().await?;

    // schema is idempotent
    if let Ok(dsn) = env::var("TESSERA_TEST_DSN") {
        apply_schema(&dsn).await?;
    }

    Ok(())
}
