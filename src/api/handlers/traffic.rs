use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{check_sync_token, error_status, TokenQuery};
use crate::migration::get_connection;
use crate::traffic_sync::{sync_node_traffic, TrafficRecord};
use crate::AppState;

/// 一批流量上报的请求体
#[derive(Debug, Deserialize)]
pub struct TrafficPushBody {
    #[serde(default)]
    pub data: Vec<TrafficRecord>,
}

/// POST /api/proxy_configs/{node_id} — 边缘节点上报流量（token 认证）
///
/// 整批接受或整批拒绝，不定义部分成功的响应形态。
pub async fn post_node_traffic(
    Extension(state): Extension<AppState>,
    Path(node_id): Path<i64>,
    Query(query): Query<TokenQuery>,
    Json(body): Json<TrafficPushBody>,
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
    match sync_node_traffic(db, node_id, body.data).await {
        Ok(_summary) => {
            // 写路径成功后显式失效该节点的配置缓存
            state.proxy_config_cache.invalidate(node_id).await;
            (StatusCode::OK, Json(serde_json::json!({"ack": true})))
        }
        Err(e) => (
            error_status(&e),
            Json(serde_json::json!({
                "error": "sync_error",
                "message": format!("流量同步失败: {}", e)
            })),
        ),
    }
}
