//! 商品目录 - 权威存储与编辑协调
//!
//! - [`CatalogStore`] - 商品存储接口 (内存实现 [`MemoryCatalogStore`])
//! - [`MutationCoordinator`] - 编辑校验、按商品串行提交、结果广播

pub mod coordinator;
pub mod store;

pub use coordinator::{EditOutcome, EditRequest, MutationCoordinator};
pub use store::{CatalogStore, MemoryCatalogStore};
