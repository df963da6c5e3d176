//! Durable registry of credential records, the mock stand-in for a user
//! database. Seeded on first run with one demo identity.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::error::AuthError;
use crate::models::CredentialRecord;
use crate::storage::Storage;

/// Storage key holding the ordered list of credential records
const USERS_KEY: &str = "mock_users";

/// Demo identity present on first run
const DEMO_EMAIL: &str = "user@example.com";
const DEMO_PASSWORD: &str = "password";

fn seed_records() -> Vec<CredentialRecord> {
    vec![CredentialRecord {
        id: "1".to_string(),
        name: "Demo User".to_string(),
        email: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
    }]
}

#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    /// Open the store, seeding the demo record if nothing is stored yet.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let store = Self { storage };
        if let Err(e) = store.ensure_seeded() {
            warn!(error = %e, "Failed to seed credential store");
        }
        store
    }

    fn ensure_seeded(&self) -> Result<()> {
        if self.storage.get(USERS_KEY)?.is_none() {
            self.save(&seed_records())?;
        }
        Ok(())
    }

    /// Load all records. A missing or malformed entry falls back to the
    /// seed data rather than failing.
    pub fn load(&self) -> Vec<CredentialRecord> {
        match self.storage.get(USERS_KEY) {
            Ok(Some(contents)) => match serde_json::from_str(&contents) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "Malformed credential records, using seed data");
                    seed_records()
                }
            },
            Ok(None) => seed_records(),
            Err(e) => {
                warn!(error = %e, "Failed to read credential records, using seed data");
                seed_records()
            }
        }
    }

    pub fn find_by_email(&self, email: &str) -> Option<CredentialRecord> {
        self.load().into_iter().find(|r| r.email == email)
    }

    /// Append a new record, assigning the next identity id.
    ///
    /// Fails with `EmailAlreadyRegistered` without writing anything if the
    /// email is already taken.
    pub fn append(&self, name: &str, email: &str, password: &str) -> Result<CredentialRecord, AuthError> {
        let mut records = self.load();
        if records.iter().any(|r| r.email == email) {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let record = CredentialRecord {
            id: (records.len() + 1).to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        records.push(record.clone());

        if let Err(e) = self.save(&records) {
            warn!(error = %e, "Failed to persist credential records");
        }
        Ok(record)
    }

    /// Number of stored records (used by tests and the demo CLI).
    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save(&self, records: &[CredentialRecord]) -> Result<()> {
        let contents = serde_json::to_string(records).context("Failed to serialize credential records")?;
        self.storage.set(USERS_KEY, &contents)
    }
}
