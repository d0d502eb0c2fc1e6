//! Order status machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Preparing ──► Completed
///                │  ▲
///                └──┘  stock check / purchase / replenish loop
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order accepted, not yet picked up by the kitchen.
    #[default]
    Pending,

    /// Recipe looked up; ingredients are being reserved or bought.
    Preparing,

    /// Every ingredient was reserved (terminal state).
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Completed,
    ];

    /// Wire names, in lifecycle order.
    pub const NAMES: [&'static str; 3] = ["PENDING", "PREPARING", "COMPLETED"];

    /// Position in the lifecycle; later statuses rank higher.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Completed => 2,
        }
    }

    /// Returns true if moving to `next` is a legal step: staying put or
    /// advancing exactly one status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        next == *self || next.rank() == self.rank() + 1
    }

    /// Returns true if moving to `next` would go backwards.
    pub fn is_regression(&self, next: OrderStatus) -> bool {
        next.rank() < self.rank()
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Returns the status name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        Self::NAMES[usize::from(self.rank())]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_regressions() {
        assert!(OrderStatus::Completed.is_regression(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.is_regression(OrderStatus::Pending));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.is_regression(OrderStatus::Completed));
        assert!(!OrderStatus::Completed.is_regression(OrderStatus::Completed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Preparing.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn test_display_matches_wire_format() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_serialization() {
        let status: OrderStatus = serde_json::from_str("\"PREPARING\"").unwrap();
        assert_eq!(status, OrderStatus::Preparing);
        assert!(serde_json::from_str::<OrderStatus>("\"Preparing\"").is_err());
    }
}
