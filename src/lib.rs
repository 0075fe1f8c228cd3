//! # Tessera
//!
//! `tessera` registers accounts, checks passwords and hands out short-lived
//! session tokens that scope profile reads and writes to a single account.
//!
//! ## Sessions
//!
//! Tokens are HS256 JWTs signed with a process-wide secret fixed at startup.
//! They carry the account email (`sub`) and an absolute expiry (`exp`, 30
//! minutes by default). Nothing is stored server side: a token is valid while
//! its signature verifies and `exp` is in the future. There is no revocation.
//!
//! ## Accounts
//!
//! One record per email, lowercased and trimmed before use. Passwords are
//! stored as Argon2id hashes. Registering an existing email refreshes the
//! display names only; the first secret stays. Profile operations always act
//! on the identity bound to the token.
//!
//! ## Storage
//!
//! `postgres://` DSNs use [`store::PgStore`]; `memory://` keeps records in
//! process with [`store::MemoryStore`].

pub mod api;
pub mod cli;
pub mod session;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
