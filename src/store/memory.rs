use super::{CredentialStore, Identity, Profile, ProfilePatch, StoreError, UpdateOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process store backed by a map. Used for `memory://` DSNs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Identity>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn upsert(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut records = self.records.write().await;

        records
            .entry(identity.email.clone())
            .and_modify(|existing| {
                existing.given_name.clone_from(&identity.given_name);
                existing.family_name.clone_from(&identity.family_name);
            })
            .or_insert_with(|| identity.clone());

        Ok(())
    }

    async fn update_profile(
        &self,
        email: &str,
        patch: &ProfilePatch,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut records = self.records.write().await;

        let Some(record) = records.get_mut(email) else {
            return Ok(UpdateOutcome::NotFound);
        };

        if let Some(given_name) = &patch.given_name {
            record.given_name.clone_from(given_name);
        }
        if let Some(family_name) = &patch.family_name {
            record.family_name.clone_from(family_name);
        }

        Ok(UpdateOutcome::Updated)
    }

    async fn secret_hash(&self, email: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(email)
            .map(|record| record.secret_hash.clone()))
    }

    async fn profile(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.records.read().await.get(email).map(Profile::from))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::secret::hash_secret;

    fn identity(email: &str, secret: &str, given_name: &str) -> Identity {
        Identity {
            email: email.to_string(),
            secret_hash: hash_secret(secret).unwrap(),
            given_name: given_name.to_string(),
            family_name: "B".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_keeps_first_secret() {
        let store = MemoryStore::new();
        store.upsert(&identity("a@x.com", "pw1", "A")).await.unwrap();
        store.upsert(&identity("a@x.com", "pw2", "A2")).await.unwrap();

        assert_eq!(store.len().await, 1);
        let profile = store.profile("a@x.com").await.unwrap().unwrap();
        assert_eq!(profile.given_name, "A2");
        assert!(store.matches("a@x.com", "pw1").await.unwrap());
        assert!(!store.matches("a@x.com", "pw2").await.unwrap());
    }

    #[tokio::test]
    async fn matches_requires_both_fields() {
        let store = MemoryStore::new();
        store.upsert(&identity("a@x.com", "pw1", "A")).await.unwrap();

        assert!(store.matches("a@x.com", "pw1").await.unwrap());
        assert!(!store.matches("a@x.com", "wrong").await.unwrap());
        assert!(!store.matches("b@x.com", "pw1").await.unwrap());
    }

    #[tokio::test]
    async fn update_profile_is_scoped_to_one_record() {
        let store = MemoryStore::new();
        store.upsert(&identity("a@x.com", "pw1", "A")).await.unwrap();
        store.upsert(&identity("b@x.com", "pw2", "Bee")).await.unwrap();

        let patch = ProfilePatch {
            given_name: Some("A2".to_string()),
            family_name: None,
        };
        let outcome = store.update_profile("a@x.com", &patch).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        let a = store.profile("a@x.com").await.unwrap().unwrap();
        assert_eq!(a.given_name, "A2");
        assert_eq!(a.family_name, "B");

        let b = store.profile("b@x.com").await.unwrap().unwrap();
        assert_eq!(b.given_name, "Bee");
    }

    #[tokio::test]
    async fn update_profile_reports_missing_record() {
        let store = MemoryStore::new();
        let outcome = store
            .update_profile("nobody@x.com", &ProfilePatch::default())
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::NotFound);
        assert!(store.is_empty().await);
    }
}
