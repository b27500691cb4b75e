//! The two registries every module composes through: the versioned API
//! registry brokering vtables, and the data registry carrying shared state
//! across module reloads.

pub mod api_registry;
pub mod data_registry;

pub use api_registry::{ApiPtr, ApiRecordInfo, ApiRegistry, ApiSpec};
pub use data_registry::{DataId, DataPtr, DataRegistry, DataSnapshot, DataWriteGuard, Property};
