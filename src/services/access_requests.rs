// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access request workflow: submission, review and the approval side effect.
//!
//! States are `pending -> approved | rejected`; both outcomes are terminal.
//! Approval inserts into the whitelist *before* recording the new status, so
//! a crash between the two steps leaves "whitelisted, still pending" (safe to
//! approve again) rather than "approved but not whitelisted".

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{
    normalize_email, AccessRequest, AccessRequestStatus, NewWhitelistEntry, SubmitAccessRequest,
};
use crate::services::WhitelistService;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;
use validator::Validate;

/// `added_by` tag for whitelist entries created by an approval without a named admin.
pub const APPROVAL_SOURCE: &str = "access_request_approval";

/// Access request lifecycle operations.
#[derive(Clone)]
pub struct AccessRequestService {
    store: Arc<dyn Store>,
    whitelist: WhitelistService,
}

impl AccessRequestService {
    pub fn new(store: Arc<dyn Store>, whitelist: WhitelistService) -> Self {
        Self { store, whitelist }
    }

    /// Create a pending request. Returns the new request id.
    pub async fn submit_request(&self, form: SubmitAccessRequest) -> Result<String> {
        let form = form.trimmed();
        form.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let email = normalize_email(&form.email);

        if self.store.get_user_by_email(&email).await?.is_some() {
            tracing::info!(email = %email, "Access request from registered user refused");
            return Err(AppError::AlreadyRegistered(email));
        }

        let now = now_rfc3339();
        let request = AccessRequest {
            id: uuid::Uuid::new_v4().to_string(),
            full_name: form.full_name,
            email,
            unit_number: form.unit_number,
            mobile: form.mobile,
            status: AccessRequestStatus::Pending,
            reviewed_by: None,
            created_at: now.clone(),
            updated_at: now,
        };

        if !self.store.insert_pending_request(&request).await? {
            return Err(AppError::DuplicatePendingRequest(request.email));
        }

        tracing::info!(
            request_id = %request.id,
            email = %request.email,
            "Access request submitted"
        );
        Ok(request.id)
    }

    /// Approve a pending request and whitelist its email.
    ///
    /// An email that is already whitelisted counts as success; an inactive
    /// entry is reactivated since the approval is an explicit grant. Any other
    /// whitelist failure aborts and leaves the request pending. If a
    /// concurrent rejection wins the status write, the whitelist change made
    /// here is undone.
    pub async fn approve(&self, id: &str, admin_email: Option<&str>) -> Result<AccessRequest> {
        let request = self
            .load_for_transition(id, AccessRequestStatus::Approved)
            .await?;

        let added_by = admin_email.unwrap_or(APPROVAL_SOURCE);
        let new_entry = NewWhitelistEntry {
            email: request.email.clone(),
            name: Some(request.full_name.clone()),
            unit: Some(request.unit_number.clone()),
            phone: request.mobile.clone(),
        };

        let grant = match self.whitelist.add_to_whitelist(new_entry, Some(added_by)).await {
            Ok(entry_id) => {
                tracing::debug!(request_id = id, entry_id = %entry_id, "Approval whitelisted email");
                WhitelistGrant::Created(entry_id)
            }
            Err(AppError::DuplicateEmail(_)) => {
                tracing::debug!(
                    request_id = id,
                    email = %request.email,
                    "Email already whitelisted, merging approval"
                );
                match self.reactivate_if_inactive(&request.email).await? {
                    Some(entry_id) => WhitelistGrant::Reactivated(entry_id),
                    None => WhitelistGrant::Existing,
                }
            }
            Err(e) => {
                tracing::warn!(
                    request_id = id,
                    error = %e,
                    "Whitelist insert failed, approval aborted"
                );
                return Err(e);
            }
        };

        match self
            .finish(request, AccessRequestStatus::Approved, admin_email)
            .await
        {
            Err(AppError::InvalidStateTransition { from, to }) => {
                // Lost to a concurrent review. Unless that review was also an
                // approval, the whitelist change made above must not stand.
                if from != AccessRequestStatus::Approved {
                    self.revoke_grant(id, grant).await;
                }
                Err(AppError::InvalidStateTransition { from, to })
            }
            result => result,
        }
    }

    /// Reject a pending request.
    pub async fn reject(&self, id: &str, admin_email: Option<&str>) -> Result<AccessRequest> {
        let request = self
            .load_for_transition(id, AccessRequestStatus::Rejected)
            .await?;
        self.finish(request, AccessRequestStatus::Rejected, admin_email)
            .await
    }

    /// Admin status update; dispatches to [`approve`](Self::approve) or
    /// [`reject`](Self::reject).
    pub async fn update_status(
        &self,
        id: &str,
        status: AccessRequestStatus,
        admin_email: Option<&str>,
    ) -> Result<AccessRequest> {
        match status {
            AccessRequestStatus::Approved => self.approve(id, admin_email).await,
            AccessRequestStatus::Rejected => self.reject(id, admin_email).await,
            AccessRequestStatus::Pending => {
                let request = self.get(id).await?;
                Err(AppError::InvalidStateTransition {
                    from: request.status,
                    to: AccessRequestStatus::Pending,
                })
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<AccessRequest> {
        self.store
            .get_access_request(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access request {} not found", id)))
    }

    pub async fn list_pending(&self) -> Result<Vec<AccessRequest>> {
        self.list_all(Some(AccessRequestStatus::Pending)).await
    }

    /// All requests, optionally filtered by status, newest first.
    pub async fn list_all(&self, status: Option<AccessRequestStatus>) -> Result<Vec<AccessRequest>> {
        let mut requests = self.store.list_access_requests(status).await?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Administrative cleanup. Deleting a pending request frees its email.
    pub async fn delete_request(&self, id: &str) -> Result<()> {
        if !self.store.delete_access_request(id).await? {
            return Err(AppError::NotFound(format!("Access request {} not found", id)));
        }
        tracing::info!(request_id = id, "Access request deleted");
        Ok(())
    }

    async fn load_for_transition(
        &self,
        id: &str,
        to: AccessRequestStatus,
    ) -> Result<AccessRequest> {
        let request = self.get(id).await?;
        if !request.status.can_transition_to(to) {
            return Err(AppError::InvalidStateTransition {
                from: request.status,
                to,
            });
        }
        Ok(request)
    }

    async fn finish(
        &self,
        mut request: AccessRequest,
        to: AccessRequestStatus,
        admin_email: Option<&str>,
    ) -> Result<AccessRequest> {
        let from = request.status;
        request.status = to;
        request.reviewed_by = admin_email.map(normalize_email);
        request.updated_at = now_rfc3339();

        if !self.store.complete_access_request(&request).await? {
            // Another admin got there first
            let current = self.get(&request.id).await?;
            return Err(AppError::InvalidStateTransition {
                from: current.status,
                to,
            });
        }

        tracing::info!(
            request_id = %request.id,
            email = %request.email,
            from = %from,
            to = %to,
            reviewed_by = ?request.reviewed_by,
            "Access request reviewed"
        );
        Ok(request)
    }

    /// Reactivate an inactive entry. Returns its id if it was reactivated.
    async fn reactivate_if_inactive(&self, email: &str) -> Result<Option<String>> {
        if let Some(entry) = self.whitelist.find_by_email(email).await? {
            if !entry.is_active {
                self.whitelist.set_active(&entry.id, true).await?;
                tracing::info!(email, "Reactivated whitelist entry on approval");
                return Ok(Some(entry.id));
            }
        }
        Ok(None)
    }

    /// Undo the whitelist change of an approval that did not complete.
    async fn revoke_grant(&self, request_id: &str, grant: WhitelistGrant) {
        let undone = match &grant {
            WhitelistGrant::Created(entry_id) => {
                self.whitelist.remove_from_whitelist(entry_id).await
            }
            WhitelistGrant::Reactivated(entry_id) => self
                .whitelist
                .set_active(entry_id, false)
                .await
                .map(|_| ()),
            WhitelistGrant::Existing => return,
        };

        match undone {
            Ok(()) => tracing::info!(request_id, grant = ?grant, "Revoked whitelist grant of failed approval"),
            Err(e) => tracing::error!(
                request_id,
                grant = ?grant,
                error = %e,
                "Failed to revoke whitelist grant of failed approval"
            ),
        }
    }
}

/// Whitelist change made by an approval before its status write.
#[derive(Debug)]
enum WhitelistGrant {
    Created(String),
    Reactivated(String),
    /// Already active; nothing to undo
    Existing,
}
