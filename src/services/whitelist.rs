// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whitelist of emails allowed to sign in as regular users.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{normalize_email, BulkImportSummary, NewWhitelistEntry, WhitelistEntry};
use crate::time_utils::now_rfc3339;
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use validator::ValidateEmail;

/// `added_by` for entries added without naming an admin.
pub const MANUAL_SOURCE: &str = "manual";

const MAX_CONCURRENT_IMPORTS: usize = 16;

/// Whitelist store operations.
#[derive(Clone)]
pub struct WhitelistService {
    store: Arc<dyn Store>,
}

impl WhitelistService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Add an email to the whitelist as an active entry.
    ///
    /// Fails with [`AppError::DuplicateEmail`] if the normalized email is
    /// already present, active or not. Callers wanting "add or ignore"
    /// semantics match on that variant.
    pub async fn add_to_whitelist(
        &self,
        new_entry: NewWhitelistEntry,
        added_by: Option<&str>,
    ) -> Result<String> {
        let email = normalize_email(&new_entry.email);
        if !email.validate_email() {
            return Err(AppError::BadRequest(format!(
                "Invalid email address: {:?}",
                new_entry.email
            )));
        }

        let now = now_rfc3339();
        let entry = WhitelistEntry {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            name: non_empty(new_entry.name),
            unit: non_empty(new_entry.unit),
            phone: non_empty(new_entry.phone),
            is_active: true,
            added_by: added_by.unwrap_or(MANUAL_SOURCE).to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        if !self.store.insert_whitelist_entry(&entry).await? {
            return Err(AppError::DuplicateEmail(entry.email));
        }

        tracing::info!(
            email = %entry.email,
            entry_id = %entry.id,
            added_by = %entry.added_by,
            "Email added to whitelist"
        );
        Ok(entry.id)
    }

    /// Hard-delete an entry (administrative cleanup).
    pub async fn remove_from_whitelist(&self, id: &str) -> Result<()> {
        if !self.store.delete_whitelist_entry(id).await? {
            return Err(AppError::NotFound(format!("Whitelist entry {} not found", id)));
        }
        tracing::info!(entry_id = id, "Whitelist entry removed");
        Ok(())
    }

    /// All entries, newest first.
    pub async fn get_whitelist(&self) -> Result<Vec<WhitelistEntry>> {
        let mut entries = self.store.list_whitelist().await?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// The active entry for `email`, if any. Used by the login path.
    pub async fn is_whitelisted(&self, email: &str) -> Result<Option<WhitelistEntry>> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }
        Ok(self
            .store
            .find_whitelist_entry_by_email(&email)
            .await?
            .filter(|entry| entry.is_active))
    }

    /// Any entry for `email`, active or not.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<WhitelistEntry>> {
        self.store
            .find_whitelist_entry_by_email(&normalize_email(email))
            .await
    }

    /// Soft activate/deactivate an entry.
    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<WhitelistEntry> {
        let mut entry = self
            .store
            .get_whitelist_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Whitelist entry {} not found", id)))?;

        if entry.is_active != is_active {
            entry.is_active = is_active;
            entry.updated_at = now_rfc3339();
            self.store.update_whitelist_entry(&entry).await?;
            tracing::info!(entry_id = id, email = %entry.email, is_active, "Whitelist entry updated");
        }
        Ok(entry)
    }

    /// Add many entries, skipping emails that are already whitelisted.
    pub async fn bulk_import(
        &self,
        entries: Vec<NewWhitelistEntry>,
        added_by: Option<&str>,
    ) -> Result<BulkImportSummary> {
        let results: Vec<Result<String>> = stream::iter(entries)
            .map(|entry| self.add_to_whitelist(entry, added_by))
            .buffer_unordered(MAX_CONCURRENT_IMPORTS)
            .collect()
            .await;

        let mut summary = BulkImportSummary::default();
        for result in results {
            match result {
                Ok(_) => summary.added += 1,
                Err(AppError::DuplicateEmail(_)) => summary.skipped_duplicates += 1,
                Err(AppError::BadRequest(msg)) => {
                    tracing::warn!(reason = %msg, "Skipping invalid whitelist import row");
                    summary.failed += 1;
                }
                // Store failures abort the import; rows already written stay
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            added = summary.added,
            skipped = summary.skipped_duplicates,
            failed = summary.failed,
            "Whitelist bulk import complete"
        );
        Ok(summary)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn service() -> WhitelistService {
        WhitelistService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_case_and_whitespace_resolve_to_same_entry() {
        let whitelist = service();
        let id = whitelist
            .add_to_whitelist(NewWhitelistEntry::new("User@Example.com"), None)
            .await
            .unwrap();

        let found = whitelist
            .is_whitelisted("user@example.com ")
            .await
            .unwrap()
            .expect("entry should resolve");
        assert_eq!(found.id, id);
        assert_eq!(found.email, "user@example.com");
        assert_eq!(found.added_by, MANUAL_SOURCE);
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails() {
        let whitelist = service();
        whitelist
            .add_to_whitelist(NewWhitelistEntry::new("a@ex.com"), Some("admin@ex.com"))
            .await
            .unwrap();
        let err = whitelist
            .add_to_whitelist(NewWhitelistEntry::new(" A@EX.com"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(ref e) if e == "a@ex.com"));
        assert_eq!(whitelist.get_whitelist().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivated_entry_is_not_whitelisted_but_still_unique() {
        let whitelist = service();
        let id = whitelist
            .add_to_whitelist(NewWhitelistEntry::new("a@ex.com"), None)
            .await
            .unwrap();
        whitelist.set_active(&id, false).await.unwrap();

        assert!(whitelist.is_whitelisted("a@ex.com").await.unwrap().is_none());
        assert!(matches!(
            whitelist
                .add_to_whitelist(NewWhitelistEntry::new("a@ex.com"), None)
                .await,
            Err(AppError::DuplicateEmail(_))
        ));

        whitelist.set_active(&id, true).await.unwrap();
        assert!(whitelist.is_whitelisted("a@ex.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_missing_entry_is_not_found() {
        let whitelist = service();
        assert!(matches!(
            whitelist.remove_from_whitelist("nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_import_counts() {
        let whitelist = service();
        whitelist
            .add_to_whitelist(NewWhitelistEntry::new("existing@ex.com"), None)
            .await
            .unwrap();

        let summary = whitelist
            .bulk_import(
                vec![
                    NewWhitelistEntry::new("new1@ex.com"),
                    NewWhitelistEntry::new("Existing@ex.com"),
                    NewWhitelistEntry::new("not-an-email"),
                    NewWhitelistEntry::new("new2@ex.com"),
                ],
                Some("import"),
            )
            .await
            .unwrap();

        assert_eq!(
            summary,
            BulkImportSummary {
                added: 2,
                skipped_duplicates: 1,
                failed: 1
            }
        );
        assert_eq!(whitelist.get_whitelist().await.unwrap().len(), 3);
    }
}
