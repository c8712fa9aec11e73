pub mod node;
pub mod node_config;
pub mod occupancy;
pub mod relay_config;
pub mod subscription;
pub mod traffic;

pub use node::*;
pub use node_config::*;
pub use occupancy::*;
pub use relay_config::*;
pub use subscription::*;
pub use traffic::*;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::PanelError;
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> axum::response::Json<Self> {
        axum::response::Json(Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        })
    }

    pub fn error(message: String) -> axum::response::Json<Self> {
        axum::response::Json(Self {
            success: false,
            data: None,
            message,
        })
    }
}

/// 边缘节点同步端点的令牌参数
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// 校验边缘节点同步令牌
pub fn check_sync_token(state: &AppState, query: &TokenQuery) -> bool {
    query.token.as_deref() == Some(state.sync_token.as_str())
}

/// 业务错误到 HTTP 状态码的映射
///
/// 容量类拒绝是正常业务失败 => 400；对象不存在 => 404；
/// 其余配置错误属于服务端失误 => 500。
pub fn error_status(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<PanelError>() {
        Some(e) if e.is_capacity_error() => StatusCode::BAD_REQUEST,
        Some(PanelError::NodeNotFound { .. }) | Some(PanelError::RelayNodeNotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
