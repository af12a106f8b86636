//! Order State Machine
//!
//! Pure transition logic. Knows nothing about storage.
//!
//! | From | Allowed targets |
//! |------|-----------------|
//! | Pending | Processing, Cancelled |
//! | Processing | Shipped, Cancelled |
//! | Shipped | Delivered |
//! | Delivered | - |
//! | Cancelled | - |

use shared::models::OrderStatus;

/// Whether `to` is an allowed direct successor of `from`
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Processing)
            | (Processing, Shipped)
            | (Shipped, Delivered)
            | (Pending, Cancelled)
            | (Processing, Cancelled)
    )
}

/// Validate a transition, returning the new status
///
/// The error carries the rejected pair so the caller can build a message.
pub fn transition(
    from: OrderStatus,
    to: OrderStatus,
) -> Result<OrderStatus, (OrderStatus, OrderStatus)> {
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err((from, to))
    }
}
