//! # Proxy Infrastructure
//!
//! 外部协作方的实现：从CDS Hooks发现端点获取的服务目录，以及静态配置的服务目录。

pub mod catalog;

pub use catalog::{HttpServiceCatalog, StaticServiceCatalog};
