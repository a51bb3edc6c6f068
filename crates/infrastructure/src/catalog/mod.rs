//! 服务目录实现

mod http;
mod static_catalog;

pub use http::HttpServiceCatalog;
pub use static_catalog::StaticServiceCatalog;
