use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// 节点配置文档缓存
///
/// 缓存失效由写路径在节点变更成功后显式调用 invalidate，
/// 不使用任何隐式钩子。
#[derive(Clone)]
pub struct ProxyConfigCache {
    cache: Arc<RwLock<HashMap<i64, Value>>>,
}

impl ProxyConfigCache {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, node_id: i64) -> Option<Value> {
        self.cache.read().await.get(&node_id).cloned()
    }

    pub async fn put(&self, node_id: i64, config: Value) {
        self.cache.write().await.insert(node_id, config);
    }

    /// 节点变更后由写路径显式调用
    pub async fn invalidate(&self, node_id: i64) {
        if self.cache.write().await.remove(&node_id).is_some() {
            debug!("节点 #{} 配置缓存已失效", node_id);
        }
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}

impl Default for ProxyConfigCache {
    fn default() -> Self {
        Self::new()
    }
}
