//! Document lifecycle: `draft → pending_payment → paid → downloaded`.
//!
//! Transitions only move forward. Payment completion is idempotent, a paid
//! document can be downloaded any number of times, and a pending document
//! may start a fresh checkout after an abandoned payment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    PendingPayment,
    Paid,
    Downloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    OrderCreated,
    PaymentCompleted,
    Downloaded,
}

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("cannot apply {event:?} to a document in status '{from}'")]
    IllegalTransition {
        from: DocumentStatus,
        event: LifecycleEvent,
    },

    #[error("document is '{status}' and can no longer be edited")]
    Frozen { status: DocumentStatus },

    #[error("unknown document status '{0}'")]
    UnknownStatus(String),
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Draft,
        DocumentStatus::PendingPayment,
        DocumentStatus::Paid,
        DocumentStatus::Downloaded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::PendingPayment => "pending_payment",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Downloaded => "downloaded",
        }
    }

    /// Computes the status reached by applying `event`.
    pub fn apply(self, event: LifecycleEvent) -> Result<DocumentStatus, LifecycleError> {
        use DocumentStatus::*;

        match (self, event) {
            (Draft | PendingPayment, LifecycleEvent::OrderCreated) => Ok(PendingPayment),
            (Draft | PendingPayment, LifecycleEvent::PaymentCompleted) => Ok(Paid),
            (Paid | Downloaded, LifecycleEvent::PaymentCompleted) => Ok(self),
            (Paid | Downloaded, LifecycleEvent::Downloaded) => Ok(Downloaded),
            (from, event) => Err(LifecycleError::IllegalTransition { from, event }),
        }
    }

    /// Content, title and template may only change before payment.
    pub fn is_editable(&self) -> bool {
        matches!(self, DocumentStatus::Draft | DocumentStatus::PendingPayment)
    }

    pub fn ensure_editable(&self) -> Result<(), LifecycleError> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(LifecycleError::Frozen { status: *self })
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, DocumentStatus::Paid | DocumentStatus::Downloaded)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LifecycleError::UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentStatus::*;
    use super::*;

    #[test]
    fn test_happy_path() {
        let s = Draft.apply(LifecycleEvent::OrderCreated).unwrap();
        assert_eq!(s, PendingPayment);
        let s = s.apply(LifecycleEvent::PaymentCompleted).unwrap();
        assert_eq!(s, Paid);
        let s = s.apply(LifecycleEvent::Downloaded).unwrap();
        assert_eq!(s, Downloaded);
    }

    #[test]
    fn test_retry_checkout_keeps_pending() {
        assert_eq!(
            PendingPayment.apply(LifecycleEvent::OrderCreated),
            Ok(PendingPayment)
        );
    }

    #[test]
    fn test_payment_completion_is_idempotent() {
        assert_eq!(Paid.apply(LifecycleEvent::PaymentCompleted), Ok(Paid));
        assert_eq!(
            Downloaded.apply(LifecycleEvent::PaymentCompleted),
            Ok(Downloaded)
        );
    }

    #[test]
    fn test_webhook_ahead_of_order_bookkeeping() {
        assert_eq!(Draft.apply(LifecycleEvent::PaymentCompleted), Ok(Paid));
    }

    #[test]
    fn test_cannot_download_unpaid() {
        for from in [Draft, PendingPayment] {
            assert_eq!(
                from.apply(LifecycleEvent::Downloaded),
                Err(LifecycleError::IllegalTransition {
                    from,
                    event: LifecycleEvent::Downloaded
                })
            );
        }
    }

    #[test]
    fn test_no_new_order_after_payment() {
        assert!(Paid.apply(LifecycleEvent::OrderCreated).is_err());
        assert!(Downloaded.apply(LifecycleEvent::OrderCreated).is_err());
    }

    #[test]
    fn test_redownload_allowed() {
        assert_eq!(Downloaded.apply(LifecycleEvent::Downloaded), Ok(Downloaded));
    }

    #[test]
    fn test_paid_documents_are_frozen() {
        assert!(Draft.ensure_editable().is_ok());
        assert!(PendingPayment.ensure_editable().is_ok());
        assert_eq!(
            Paid.ensure_editable(),
            Err(LifecycleError::Frozen { status: Paid })
        );
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in DocumentStatus::ALL {
            assert_eq!(status.as_str().parse::<DocumentStatus>(), Ok(status));
        }
        assert!("archived".parse::<DocumentStatus>().is_err());
    }
}
