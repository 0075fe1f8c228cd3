use crate::session::token::{DEFAULT_TTL, MIN_SECRET_LEN};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_SIGNING_SECRET: &str = "signing-secret";
pub const ARG_SESSION_TTL: &str = "session-ttl";

#[derive(Debug, Clone)]
pub struct Options {
    pub signing_secret: SecretString,
    pub session_ttl: Duration,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing secret is missing or too short.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret = match matches.get_one::<String>(ARG_SIGNING_SECRET) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => anyhow::bail!("missing required argument: --{ARG_SIGNING_SECRET}"),
        };

        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("--{ARG_SIGNING_SECRET} must be at least {MIN_SECRET_LEN} bytes");
        }

        let session_ttl = matches
            .get_one::<u64>(ARG_SESSION_TTL)
            .copied()
            .map_or(DEFAULT_TTL, Duration::from_secs);

        Ok(Self {
            signing_secret: SecretString::from(secret),
            session_ttl,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_SECRET)
                .long(ARG_SIGNING_SECRET)
                .help("Secret used to sign session tokens (at least 32 bytes)")
                .long_help(
                    "Secret used to sign and verify session tokens (HS256, at least 32 bytes).\n\nChanging it invalidates every token issued before the restart.",
                )
                .env("TESSERA_SIGNING_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session token lifetime in seconds")
                .default_value("1800")
                .env("TESSERA_SESSION_TTL")
                .value_parser(clap::value_parser!(u64).range(60..=86_400)),
        )
}
