mod api;
mod config;
mod config_cache;
mod eligibility;
mod entity;
mod error;
mod migration;
mod node_config;
mod occupancy;
mod relay_config;
mod subscription;
mod traffic_sync;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config_cache::ProxyConfigCache;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub sync_token: String,
    pub proxy_config_cache: ProxyConfigCache,
}

#[derive(Parser, Debug)]
#[command(name = "sspanel", about = "代理节点集群控制面板")]
struct Cli {
    /// 配置文件路径（默认读取 ./config.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖 Web API 端口
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化 tracing 日志系统
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Some(path) = &cli.config {
        let mut cfg = config::Config::load_from(path)?;
        if let Some(port) = cli.port {
            cfg.web_port = port;
        }
        config::init_config(cfg);
    } else if let Some(port) = cli.port {
        let mut cfg = config::Config::default();
        cfg.web_port = port;
        config::init_config(cfg);
    }

    let cfg = config::get_config().await;
    info!("📋 sspanel 启动");
    info!("🌐 Web API 端口: {}", cfg.web_port);

    // 初始化数据库并运行迁移
    let db = migration::get_connection().await;
    migration::Migrator::up(db, None).await?;
    info!("✅ 数据库初始化完成");

    let sync_token = cfg.get_sync_token();
    info!("🔑 边缘节点同步令牌: {}", sync_token);

    let app_state = AppState {
        config: Arc::new(cfg.clone()),
        sync_token,
        proxy_config_cache: ProxyConfigCache::new(),
    };

    // 启动 Web API 服务
    let _web_handle = api::start_web_server(app_state.clone());

    // 启动占用过期巡检（正确性不依赖它，只做运维可见性）
    start_occupancy_sweeper(cfg.occupancy_sweep_interval_secs);

    info!("✅ 所有服务已启动，等待终止信号...");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("收到 Ctrl+C 信号，正在关闭服务...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("收到 SIGTERM 信号，正在关闭服务...");
        }
    }

    Ok(())
}

/// 启动占用过期巡检后台任务
fn start_occupancy_sweeper(interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let db = migration::get_connection().await;
            if let Err(e) = occupancy::sweep_expired(db, interval_secs).await {
                tracing::error!("占用过期巡检失败: {}", e);
            }
        }
    });
}
