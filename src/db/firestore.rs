// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Whitelist entries and users (keyed by encoded email, so a create-only
//!   insert is the uniqueness check)
//! - Access requests plus a per-email pending marker
//! - Sessions (keyed by token hash)

use super::{collections, Store};
use crate::error::AppError;
use crate::models::email::email_document_key;
use crate::models::{AccessRequest, AccessRequestStatus, Session, User, WhitelistEntry};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};

/// Marks an email as having a pending access request.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingRequestMarker {
    request_id: String,
    email: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Map a Firestore failure onto the application taxonomy.
fn db_error(context: &str, e: FirestoreError) -> AppError {
    match &e {
        FirestoreError::NetworkError(_) => AppError::Transient(format!("{}: {}", context, e)),
        FirestoreError::DatabaseError(db) if db.retry_possible => {
            AppError::Transient(format!("{}: {}", context, e))
        }
        _ => AppError::Database(format!("{}: {}", context, e)),
    }
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Find a single document whose `id` field matches.
    async fn find_by_id_field<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        let id = id.to_string();
        let mut found: Vec<T> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.field("id").eq(id.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| db_error("Query by id failed", e))?;
        Ok(found.pop())
    }

    async fn delete_doc(&self, collection: &str, doc_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(|e| db_error("Delete failed", e))
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Whitelist Operations ────────────────────────────────────

    async fn insert_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<bool, AppError> {
        let result: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::WHITELIST)
            .document_id(email_document_key(&entry.email))
            .object(entry)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(db_error("Whitelist insert failed", e)),
        }
    }

    async fn get_whitelist_entry(&self, id: &str) -> Result<Option<WhitelistEntry>, AppError> {
        self.find_by_id_field(collections::WHITELIST, id).await
    }

    async fn find_whitelist_entry_by_email(
        &self,
        email: &str,
    ) -> Result<Option<WhitelistEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WHITELIST)
            .obj()
            .one(&email_document_key(email))
            .await
            .map_err(|e| db_error("Whitelist lookup failed", e))
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WHITELIST)
            .obj()
            .query()
            .await
            .map_err(|e| db_error("Whitelist listing failed", e))
    }

    async fn update_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::WHITELIST)
            .document_id(email_document_key(&entry.email))
            .object(entry)
            .execute()
            .await
            .map_err(|e| db_error("Whitelist update failed", e))?;
        Ok(())
    }

    async fn delete_whitelist_entry(&self, id: &str) -> Result<bool, AppError> {
        let Some(entry) = self.get_whitelist_entry(id).await? else {
            return Ok(false);
        };
        self.delete_doc(collections::WHITELIST, &email_document_key(&entry.email))
            .await?;
        Ok(true)
    }

    // ─── Access Request Operations ───────────────────────────────

    async fn insert_pending_request(&self, request: &AccessRequest) -> Result<bool, AppError> {
        let marker = PendingRequestMarker {
            request_id: request.id.clone(),
            email: request.email.clone(),
        };
        let marker_key = email_document_key(&request.email);

        // 1. Claim the email's pending slot (create-only)
        let claimed: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PENDING_REQUEST_EMAILS)
            .document_id(&marker_key)
            .object(&marker)
            .execute()
            .await;

        match claimed {
            Ok(()) => {}
            Err(FirestoreError::DataConflictError(_)) => return Ok(false),
            Err(e) => return Err(db_error("Pending marker insert failed", e)),
        }

        // 2. Store the request; release the slot if that fails
        let stored: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACCESS_REQUESTS)
            .document_id(&request.id)
            .object(request)
            .execute()
            .await;

        if let Err(e) = stored {
            if let Err(cleanup) = self
                .delete_doc(collections::PENDING_REQUEST_EMAILS, &marker_key)
                .await
            {
                tracing::error!(
                    email = %request.email,
                    error = %cleanup,
                    "Failed to release pending marker after request write failure"
                );
            }
            return Err(db_error("Access request insert failed", e));
        }

        Ok(true)
    }

    async fn get_access_request(&self, id: &str) -> Result<Option<AccessRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACCESS_REQUESTS)
            .obj()
            .one(id)
            .await
            .map_err(|e| db_error("Access request lookup failed", e))
    }

    async fn list_access_requests(
        &self,
        status: Option<AccessRequestStatus>,
    ) -> Result<Vec<AccessRequest>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACCESS_REQUESTS);

        let query = if let Some(status) = status {
            query.filter(move |q| q.field("status").eq(status.as_str()))
        } else {
            query
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| db_error("Access request listing failed", e))
    }

    /// Transition a pending request inside a transaction.
    ///
    /// The status read is bound to the transaction, so a concurrent transition
    /// of the same request makes this commit fail instead of overwriting it.
    async fn complete_access_request(&self, request: &AccessRequest) -> Result<bool, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // 1. Read current state within the transaction
        let current: Option<AccessRequest> = client
            .clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::ACCESS_REQUESTS)
            .obj()
            .one(&request.id)
            .await
            .map_err(|e| db_error("Failed to read request in transaction", e))?;

        let still_pending = current
            .map(|r| r.status == AccessRequestStatus::Pending)
            .unwrap_or(false);
        if !still_pending {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        // 2. Write the terminal status
        client
            .fluent()
            .update()
            .in_col(collections::ACCESS_REQUESTS)
            .document_id(&request.id)
            .object(request)
            .add_to_transaction(&mut transaction)
            .map_err(|e| db_error("Failed to add request to transaction", e))?;

        // 3. Release the email's pending slot
        client
            .fluent()
            .delete()
            .from(collections::PENDING_REQUEST_EMAILS)
            .document_id(email_document_key(&request.email))
            .add_to_transaction(&mut transaction)
            .map_err(|e| db_error("Failed to add marker deletion to transaction", e))?;

        transaction
            .commit()
            .await
            .map_err(|e| db_error("Transaction commit failed", e))?;

        Ok(true)
    }

    async fn delete_access_request(&self, id: &str) -> Result<bool, AppError> {
        let Some(request) = self.get_access_request(id).await? else {
            return Ok(false);
        };

        self.delete_doc(collections::ACCESS_REQUESTS, id).await?;

        if request.status == AccessRequestStatus::Pending {
            self.delete_doc(
                collections::PENDING_REQUEST_EMAILS,
                &email_document_key(&request.email),
            )
            .await?;
        }
        Ok(true)
    }

    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.find_by_id_field(collections::USERS, id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&email_document_key(email))
            .await
            .map_err(|e| db_error("User lookup failed", e))
    }

    async fn insert_user(&self, user: &User) -> Result<bool, AppError> {
        let result: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(email_document_key(&user.email))
            .object(user)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(db_error("User insert failed", e)),
        }
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(email_document_key(&user.email))
            .object(user)
            .execute()
            .await
            .map_err(|e| db_error("User update failed", e))?;
        Ok(())
    }

    // ─── Session Operations ──────────────────────────────────────

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.update_session(session).await
    }

    async fn get_session(&self, token_hash: &str) -> Result<Option<Session>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(token_hash)
            .await
            .map_err(|e| db_error("Session lookup failed", e))
    }

    async fn update_session(&self, session: &Session) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.token_hash)
            .object(session)
            .execute()
            .await
            .map_err(|e| db_error("Session write failed", e))?;
        Ok(())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), AppError> {
        self.delete_doc(collections::SESSIONS, token_hash).await
    }
}
