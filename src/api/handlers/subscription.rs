use axum::{
    extract::{Path, Query},
    http::StatusCode,
};
use sea_orm::EntityTrait;
use serde::Deserialize;

use crate::entity::User;
use crate::migration::get_connection;
use crate::subscription::{generate_subscription, SubType};

#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    pub sub_type: Option<String>,
}

/// GET /api/subscriptions/{user_id} — 生成用户订阅
///
/// 调用方身份由外围会话层解析，这里假定 user_id 已经过鉴权。
pub async fn get_subscription(
    Path(user_id): Path<i64>,
    Query(query): Query<SubscriptionQuery>,
) -> (StatusCode, String) {
    let sub_type = SubType::parse(query.sub_type.as_deref().unwrap_or("normal"));

    let db = get_connection().await;
    let user = match User::find_by_id(user_id).one(db).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                format!("用户 #{} 不存在", user_id),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("数据库查询失败: {}", e),
            );
        }
    };

    match generate_subscription(db, &user, sub_type).await {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("生成订阅失败: {}", e),
        ),
    }
}
