use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use sea_orm::EntityTrait;

use super::{check_sync_token, error_status, TokenQuery};
use crate::entity::RelayNode;
use crate::migration::get_connection;
use crate::relay_config::build_relay_config;
use crate::AppState;

/// GET /api/relay_configs/{relay_node_id} — 中转节点拉取转发表（token 认证）
pub async fn get_relay_config(
    Extension(state): Extension<AppState>,
    Path(relay_node_id): Path<i64>,
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

    let db = get_connection().await;
    let relay = match RelayNode::find_by_id(relay_node_id).one(db).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": "relay_node_not_found",
                    "message": format!("中转节点 #{} 不存在", relay_node_id)
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

    match build_relay_config(db, &relay).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "web_port": relay.web_port,
                "relay_configs": entries,
            })),
        ),
        Err(e) => (
            error_status(&e),
            Json(serde_json::json!({
                "error": "config_error",
                "message": format!("生成中转配置失败: {}", e)
            })),
        ),
    }
}
