use crate::{
    api,
    session::{SessionService, TokenCodec},
    store::{CredentialStore, MemoryStore, PgStore},
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub signing_secret: SecretString,
    pub session_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Postgres,
}

/// Pick the store backend from the DSN scheme.
///
/// # Errors
/// Returns an error if the DSN is not a URL or the scheme is unsupported.
pub fn store_kind(dsn: &str) -> Result<StoreKind> {
    let url = Url::parse(dsn).context("invalid --dsn")?;

    match url.scheme() {
        "memory" => Ok(StoreKind::Memory),
        "postgres" | "postgresql" => Ok(StoreKind::Postgres),
        other => Err(anyhow!("unsupported --dsn scheme: {other}")),
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store is unreachable, the signing secret is rejected, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: Arc<dyn CredentialStore> = match store_kind(&args.dsn)? {
        StoreKind::Memory => {
            warn!("Using in-memory store, records are lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Postgres => Arc::new(PgStore::connect(&args.dsn).await?),
    };

    let codec = TokenCodec::new(args.signing_secret, args.session_ttl)
        .context("invalid --signing-secret")?;

    info!(
        "Session tokens expire after {} seconds",
        codec.ttl().as_secs()
    );

    api::new(args.port, SessionService::new(store, codec)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_from_scheme() {
        assert_eq!(store_kind("memory://").ok(), Some(StoreKind::Memory));
        assert_eq!(
            store_kind("postgres://user:pw@localhost:5432/tessera").ok(),
            Some(StoreKind::Postgres)
        );
        assert_eq!(
            store_kind("postgresql://localhost/tessera").ok(),
            Some(StoreKind::Postgres)
        );
    }

    #[test]
    fn store_kind_rejects_unknown() {
        assert!(store_kind("mysql://localhost/tessera").is_err());
        assert!(store_kind("not a url").is_err());
    }
}
