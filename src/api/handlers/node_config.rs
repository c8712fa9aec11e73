use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use tracing::debug;

use super::{check_sync_token, error_status, TokenQuery};
use crate::entity::ProxyNode;
use crate::migration::get_connection;
use crate::node_config::build_proxy_config;
use crate::AppState;
use sea_orm::EntityTrait;

/// GET /api/proxy_configs/{node_id} — 边缘节点拉取自身配置（token 认证）
pub async fn get_proxy_config(
    Extension(state): Extension<AppState>,
    Path(node_id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    if !check_sync_token(&state, &query) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "invalid_token",
                "message": "无效的 token"
            })),
        );
    }

    // 命中缓存直接返回
    if let Some(cached) = state.proxy_config_cache.get(node_id).await {
        debug!("节点 #{} 配置命中缓存", node_id);
        return (StatusCode::OK, Json(cached));
    }

    let db = get_connection().await;
    let node = match ProxyNode::find_by_id(node_id).one(db).await {
        Ok(Some(n)) => n,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": "node_not_found",
                    "message": format!("节点 #{} 不存在", node_id)
                })),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "db_error",
                    "message": format!("数据库查询失败: {}", e)
                })),
            );
        }
    };

    match build_proxy_config(db, &node).await {
        Ok(doc) => {
            state.proxy_config_cache.put(node_id, doc.clone()).await;
            (StatusCode::OK, Json(doc))
        }
        Err(e) => (
            error_status(&e),
            Json(serde_json::json!({
                "error": "config_error",
                "message": format!("生成节点配置失败: {}", e)
            })),
        ),
    }
}
