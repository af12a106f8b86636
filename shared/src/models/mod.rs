//! Entity schemas shared by server and client

pub mod order;
pub mod patch;
pub mod product;

pub use order::{
    AddressType, ConfirmOrderRequest, DeliveryAddress, LineItem, Order, OrderCreate,
    OrderItemInput, OrderList, OrderStatus, OrderSummary, RejectOrderRequest, UserOrdersRequest,
};
pub use patch::{EDITABLE_FIELDS, ProductPatch};
pub use product::{CatalogChanges, CatalogSnapshot, Product};
