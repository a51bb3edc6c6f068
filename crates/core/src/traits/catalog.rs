use async_trait::async_trait;

use crate::{models::ServiceDefinition, ProxyResult};

/// 后端服务目录
///
/// 返回值视为某一时刻的快照，刷新与缓存策略由实现自行决定。
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// 获取注册到指定hook类型的所有服务，保持目录中的顺序
    async fn services_for_hook(&self, hook: &str) -> ProxyResult<Vec<ServiceDefinition>>;

    /// 按ID查找服务
    async fn service(&self, id: &str) -> ProxyResult<Option<ServiceDefinition>>;
}
