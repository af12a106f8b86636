use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

/// Order lifecycle errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: i64 },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order amount for product {product_id} is out of range")]
    AmountOutOfRange { product_id: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::OrderNotFound(id) => AppError::order_not_found(id),
            OrderError::InvalidTransition { order_id, from, to } => {
                AppError::invalid_transition(message)
                    .with_detail("order_id", order_id)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::EmptyOrder => AppError::with_message(ErrorCode::OrderEmpty, message),
            OrderError::InvalidQuantity { product_id, .. } => {
                AppError::validation(message).with_detail("product_id", product_id)
            }
            OrderError::ProductNotFound(id) => AppError::product_not_found(id),
            OrderError::AmountOutOfRange { product_id } => {
                AppError::with_message(ErrorCode::ValueOutOfRange, message)
                    .with_detail("product_id", product_id)
            }
            OrderError::MissingField(field) => {
                AppError::with_message(ErrorCode::RequiredField, message).with_detail("field", field)
            }
        }
    }
}
