//! Order models and the order status vocabulary

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a sale. The vocabulary is closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Completed,
    Canceled,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    /// Legacy values such as "delivered" are a data-migration concern and
    /// are rejected here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "completed" => Ok(OrderStatus::Completed),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orders counted for operational consumption tracking. Paid orders are
/// counted provisionally before they are completed.
pub const CONSUMPTION_STATUSES: &[OrderStatus] = &[OrderStatus::Paid, OrderStatus::Completed];

/// Orders whose material usage is booked as cost of goods sold
pub const COGS_STATUSES: &[OrderStatus] = &[OrderStatus::Completed];

/// Orders whose final price is booked as revenue
pub const REVENUE_STATUSES: &[OrderStatus] = &[OrderStatus::Completed];

/// Status strings for binding into `status = ANY($n)` queries
pub fn status_strings(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}
