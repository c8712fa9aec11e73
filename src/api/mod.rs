use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppState;

pub mod handlers;

/// 启动 Web API 服务
pub fn start_web_server(app_state: AppState) -> tokio::task::JoinHandle<()> {
    let web_port = app_state.config.web_port;

    tokio::spawn(async move {
        let api_routes = Router::new()
            // 边缘节点同步端点（token 认证）
            .route(
                "/proxy_configs/{node_id}",
                get(handlers::get_proxy_config).post(handlers::post_node_traffic),
            )
            .route(
                "/relay_configs/{relay_node_id}",
                get(handlers::get_relay_config),
            )
            // 用户侧端点（身份由外围层解析）
            .route("/subscriptions/{user_id}", get(handlers::get_subscription))
            .route("/occupancy", post(handlers::create_occupancy))
            // 节点写路径（管理操作，变更后显式失效配置缓存）
            .route("/nodes/{id}/toggle", post(handlers::toggle_node))
            .route("/nodes/{id}/reset_traffic", post(handlers::reset_node_traffic))
            .layer(Extension(app_state));

        let app = Router::new()
            .nest("/api", api_routes)
            .layer(CorsLayer::permissive());

        let web_addr = format!("0.0.0.0:{}", web_port);
        match tokio::net::TcpListener::bind(web_addr.clone()).await {
            Ok(listener) => {
                info!("🌐 Web API: http://{}", web_addr);
                if let Err(err) = axum::serve(listener, app).await {
                    tracing::error!("Web服务错误：{}", err);
                }
            }
            Err(err) => {
                tracing::error!("Web服务启动失败：{}", err);
            }
        }
    })
}
