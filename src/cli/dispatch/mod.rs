//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary runs: serving the API
//! or applying the database schema.

use crate::cli::actions::{schema, server, Action};
use crate::cli::commands::{session, ARG_DSN, ARG_PORT, CMD_SCHEMA};
use anyhow::Result;
use clap::ArgMatches;

fn dsn(matches: &ArgMatches) -> Result<String> {
    match matches.get_one::<String>(ARG_DSN) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => anyhow::bail!("missing required argument: --{ARG_DSN}"),
    }
}

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches(CMD_SCHEMA) {
        return Ok(Action::Schema(schema::Args { dsn: dsn(sub)? }));
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = dsn(matches)?;
    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        dsn,
        signing_secret: session_opts.signing_secret,
        session_ttl: session_opts.session_ttl,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn with_cleared_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        temp_env::with_vars(
            [
                ("TESSERA_DSN", None::<&str>),
                ("TESSERA_SIGNING_SECRET", None::<&str>),
                ("TESSERA_SESSION_TTL", None::<&str>),
                ("TESSERA_PORT", None::<&str>),
            ],
            f,
        )
    }

    fn expect_err(args: Vec<&str>, message: &str) {
        let matches = crate::cli::commands::new().get_matches_from(args);
        let result = handler(&matches);
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(
                err.to_string().contains(message),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn dsn_required() {
        with_cleared_env(|| {
            expect_err(
                vec!["tessera", "--signing-secret", SECRET],
                "missing required argument: --dsn",
            );
        });
    }

    #[test]
    fn signing_secret_required() {
        with_cleared_env(|| {
            expect_err(
                vec!["tessera", "--dsn", "memory://"],
                "missing required argument: --signing-secret",
            );
        });
    }

    #[test]
    fn short_signing_secret_rejected() {
        with_cleared_env(|| {
            expect_err(
                vec!["tessera", "--dsn", "memory://", "--signing-secret", "short"],
                "at least 32 bytes",
            );
        });
    }

    #[test]
    fn server_action() {
        with_cleared_env(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "tessera",
                "--dsn",
                "memory://",
                "--signing-secret",
                SECRET,
                "--session-ttl",
                "120",
                "-p",
                "9000",
            ]);
            let action = handler(&matches);
            assert!(action.is_ok());
            if let Ok(Action::Server(args)) = action {
                assert_eq!(args.port, 9000);
                assert_eq!(args.dsn, "memory://");
                assert_eq!(args.signing_secret.expose_secret(), SECRET);
                assert_eq!(args.session_ttl, Duration::from_secs(120));
            } else {
                panic!("expected server action");
            }
        });
    }

    #[test]
    fn schema_action_ignores_signing_secret() {
        with_cleared_env(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "tessera",
                "schema",
                "--dsn",
                "postgres://localhost/tessera",
            ]);
            match handler(&matches) {
                Ok(Action::Schema(args)) => {
                    assert_eq!(args.dsn, "postgres://localhost/tessera");
                }
                other => panic!("expected schema action, got {other:?}"),
            }
        });
    }
}
