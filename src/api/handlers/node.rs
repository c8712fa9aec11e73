use axum::{
    extract::{Extension, Path},
    http::StatusCode,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tracing::info;

use super::ApiResponse;
use crate::entity::{proxy_node, ProxyNode};
use crate::migration::get_connection;
use crate::AppState;

/// POST /api/nodes/{id}/toggle — 切换节点启用状态
pub async fn toggle_node(
    Extension(state): Extension<AppState>,
    Path(node_id): Path<i64>,
) -> (
    StatusCode,
    axum::response::Json<ApiResponse<proxy_node::Model>>,
) {
    let db = get_connection().await;
    let node = match ProxyNode::find_by_id(node_id).one(db).await {
        Ok(Some(n)) => n,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                ApiResponse::error(format!("节点 #{} 不存在", node_id)),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::error(format!("数据库查询失败: {}", e)),
            );
        }
    };

    let target = !node.enable;
    let mut active: proxy_node::ActiveModel = node.into();
    active.enable = Set(target);
    match active.update(db).await {
        Ok(updated) => {
            // 节点变更成功后显式失效配置缓存
            state.proxy_config_cache.invalidate(node_id).await;
            info!("节点 #{} enable => {}", node_id, target);
            (StatusCode::OK, ApiResponse::success(updated))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::error(format!("更新节点失败: {}", e)),
        ),
    }
}

/// POST /api/nodes/{id}/reset_traffic — 清零节点已用流量
///
/// used_traffic 唯一允许的减少路径。
pub async fn reset_node_traffic(
    Extension(state): Extension<AppState>,
    Path(node_id): Path<i64>,
) -> (
    StatusCode,
    axum::response::Json<ApiResponse<proxy_node::Model>>,
) {
    let db = get_connection().await;
    let node = match ProxyNode::find_by_id(node_id).one(db).await {
        Ok(Some(n)) => n,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                ApiResponse::error(format!("节点 #{} 不存在", node_id)),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::error(format!("数据库查询失败: {}", e)),
            );
        }
    };

    let mut active: proxy_node::ActiveModel = node.into();
    active.used_traffic = Set(0);
    match active.update(db).await {
        Ok(updated) => {
            state.proxy_config_cache.invalidate(node_id).await;
            info!("节点 #{} 流量已重置", node_id);
            (StatusCode::OK, ApiResponse::success(updated))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::error(format!("更新节点失败: {}", e)),
        ),
    }
}
