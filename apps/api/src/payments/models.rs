use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order status as reported by the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    UserCancelled,
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::UserCancelled,
        OrderStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InProgress => "INPROGRESS",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::UserCancelled => "USERCANCELLED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    /// Terminal orders never change status again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending | OrderStatus::InProgress)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| format!("unknown order status '{s}'"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gateway wire types
// ────────────────────────────────────────────────────────────────────────────

/// Body of a checkout request. The vendor id is added by the gateway client.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub buyer_name: String,
    pub buyer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    /// Base64 of the notification URL.
    pub webhook_url: String,
    /// Base64 of the URL the hosted checkout returns to.
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    pub token: String,
    pub checkout_url: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletPushRequest {
    pub transaction_id: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletPushResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Push acknowledgements that mean the prompt reached the handset.
const PUSH_ACCEPTED: &[&str] = &["SUCCESS", "OK", "ACCEPTED", "SENT"];

impl WalletPushResponse {
    /// Whether the gateway took the push. Order statuses count when they are
    /// not a failure; anything unrecognised is a rejection.
    pub fn is_accepted(&self) -> bool {
        match self.status.parse::<OrderStatus>() {
            Ok(status) => matches!(
                status,
                OrderStatus::Pending | OrderStatus::InProgress | OrderStatus::Completed
            ),
            Err(_) => {
                let upper = self.status.trim().to_ascii_uppercase();
                PUSH_ACCEPTED.contains(&upper.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(OrderStatus::UserCancelled).unwrap(),
            "USERCANCELLED"
        );
        assert_eq!(
            serde_json::from_value::<OrderStatus>(serde_json::json!("INPROGRESS")).unwrap(),
            OrderStatus::InProgress
        );
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("completed".parse::<OrderStatus>(), Ok(OrderStatus::Completed));
        assert!("REFUNDED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                OrderStatus::Completed,
                OrderStatus::Cancelled,
                OrderStatus::UserCancelled,
                OrderStatus::Rejected
            ]
        );
    }

    #[test]
    fn test_create_order_request_omits_missing_email() {
        let req = CreateOrderRequest {
            order_id: "CVCC-1".to_string(),
            amount: 1000,
            currency: "XOF".to_string(),
            description: "CV".to_string(),
            buyer_name: "Awa".to_string(),
            buyer_phone: "2250707070707".to_string(),
            buyer_email: None,
            webhook_url: "aHR0cHM6Ly9h".to_string(),
            redirect_url: "aHR0cHM6Ly9i".to_string(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("buyer_email").is_none());
        assert_eq!(value["amount"], 1000);
    }

    #[test]
    fn test_wallet_push_acceptance() {
        let push = |status: &str| WalletPushResponse {
            status: status.to_string(),
            message: None,
        };
        assert!(push("INPROGRESS").is_accepted());
        assert!(push("pending").is_accepted());
        assert!(push("success").is_accepted());
        assert!(!push("REJECTED").is_accepted());
        assert!(!push("FAILED").is_accepted());
        assert!(!push("").is_accepted());
    }
}
