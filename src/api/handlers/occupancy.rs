use anyhow::Result;
use axum::{extract::Extension, http::StatusCode, Json};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;

use super::{error_status, ApiResponse};
use crate::config_cache::ProxyConfigCache;
use crate::entity::{occupancy_config, user_occupancy, OccupancyConfig};
use crate::error::PanelError;
use crate::migration::get_connection;
use crate::occupancy::create_by_occupancy_config;
use crate::AppState;

/// 占用创建请求（由外围结算流程发起，身份已解析）
#[derive(Debug, Deserialize)]
pub struct CreateOccupancyRequest {
    pub user_id: i64,
    pub node_id: i64,
}

/// 创建占用并失效该节点的配置缓存
///
/// 占用会改变节点的可用用户集合，缓存的旧配置不能继续下发。
pub async fn create_occupancy_and_invalidate(
    db: &DatabaseConnection,
    cache: &ProxyConfigCache,
    user_id: i64,
    node_id: i64,
    config: &occupancy_config::Model,
) -> Result<user_occupancy::Model> {
    let record = create_by_occupancy_config(db, user_id, node_id, config).await?;
    cache.invalidate(node_id).await;
    Ok(record)
}

/// POST /api/occupancy — 创建节点占用
pub async fn create_occupancy(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateOccupancyRequest>,
) -> (
    StatusCode,
    axum::response::Json<ApiResponse<user_occupancy::Model>>,
) {
    let db = get_connection().await;

    // 节点必须配置了占用策略，缺失属于配置错误
    let config = match OccupancyConfig::find()
        .filter(occupancy_config::Column::NodeId.eq(req.node_id))
        .one(db)
        .await
    {
        Ok(Some(c)) => c,
        Ok(None) => {
            let err = PanelError::OccupancyConfigMissing {
                node_id: req.node_id,
            };
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::error(err.to_string()),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::error(format!("数据库查询失败: {}", e)),
            );
        }
    };

    match create_occupancy_and_invalidate(
        db,
        &state.proxy_config_cache,
        req.user_id,
        req.node_id,
        &config,
    )
    .await
    {
        Ok(record) => (StatusCode::OK, ApiResponse::success(record)),
        Err(e) => (error_status(&e), ApiResponse::error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{node_fixture, occupancy_config_fixture, test_db, user_fixture, GB};
    use sea_orm::ActiveModelTrait;
    use serde_json::json;

    // 占用创建成功后，该节点的缓存配置必须失效
    #[tokio::test]
    async fn test_create_invalidates_cached_config() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let user = user_fixture("alice", 1).insert(&db).await.unwrap();
        let config = occupancy_config_fixture(node.id, 1, GB);

        let cache = ProxyConfigCache::new();
        cache.put(node.id, json!({"users": ["stale"]})).await;

        create_occupancy_and_invalidate(&db, &cache, user.id, node.id, &config)
            .await
            .unwrap();
        assert!(cache.get(node.id).await.is_none());
    }

    // 创建失败（容量满）时不动缓存
    #[tokio::test]
    async fn test_failed_create_keeps_cache() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let a = user_fixture("a", 1).insert(&db).await.unwrap();
        let b = user_fixture("b", 1).insert(&db).await.unwrap();
        let config = occupancy_config_fixture(node.id, 1, GB);

        let cache = ProxyConfigCache::new();
        create_occupancy_and_invalidate(&db, &cache, a.id, node.id, &config)
            .await
            .unwrap();

        cache.put(node.id, json!({"users": []})).await;
        let err = create_occupancy_and_invalidate(&db, &cache, b.id, node.id, &config)
            .await
            .unwrap_err();
        assert!(err
            .downcast_ref::<PanelError>()
            .unwrap()
            .is_capacity_error());
        assert!(cache.get(node.id).await.is_some());
    }
}
