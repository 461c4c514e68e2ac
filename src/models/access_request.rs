// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access request model and its status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Lifecycle state of an access request. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl AccessRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRequestStatus::Pending => "pending",
            AccessRequestStatus::Approved => "approved",
            AccessRequestStatus::Rejected => "rejected",
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: AccessRequestStatus) -> bool {
        matches!(
            (self, next),
            (
                AccessRequestStatus::Pending,
                AccessRequestStatus::Approved | AccessRequestStatus::Rejected
            )
        )
    }
}

impl fmt::Display for AccessRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccessRequestStatus::Pending),
            "approved" => Ok(AccessRequestStatus::Approved),
            "rejected" => Ok(AccessRequestStatus::Rejected),
            other => Err(format!("unknown access request status: {}", other)),
        }
    }
}

/// A prospective resident's request to be whitelisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AccessRequest {
    pub id: String,
    pub full_name: String,
    /// Normalized email
    pub email: String,
    pub unit_number: String,
    pub mobile: Option<String>,
    pub status: AccessRequestStatus,
    /// Admin who approved or rejected the request
    #[serde(default)]
    pub reviewed_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Public submission form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAccessRequest {
    #[validate(length(min = 1, max = 200, message = "full name is required"))]
    pub full_name: String,
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "unit number is required"))]
    pub unit_number: String,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub mobile: Option<String>,
}

impl SubmitAccessRequest {
    /// Trim every field so whitespace-only input fails validation.
    pub fn trimmed(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            unit_number: self.unit_number.trim().to_string(),
            mobile: self
                .mobile
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_transitions() {
        use AccessRequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Approved));
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&AccessRequestStatus::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
        assert_eq!(
            "approved".parse::<AccessRequestStatus>(),
            Ok(AccessRequestStatus::Approved)
        );
        assert!("done".parse::<AccessRequestStatus>().is_err());
    }

    #[test]
    fn test_trimmed_submission_drops_blank_mobile() {
        let form = SubmitAccessRequest {
            full_name: "  Alice ".to_string(),
            email: " alice@ex.com ".to_string(),
            unit_number: " 4B".to_string(),
            mobile: Some("   ".to_string()),
        }
        .trimmed();
        assert_eq!(form.full_name, "Alice");
        assert_eq!(form.unit_number, "4B");
        assert_eq!(form.mobile, None);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_blank_name_fails_validation() {
        let form = SubmitAccessRequest {
            full_name: "   ".to_string(),
            email: "alice@ex.com".to_string(),
            unit_number: "4B".to_string(),
            mobile: None,
        }
        .trimmed();
        assert!(form.validate().is_err());
    }
}
