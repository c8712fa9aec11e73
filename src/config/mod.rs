//! 面板服务配置模块

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tokio::sync::OnceCell;

/// 面板服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Web API 端口
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// 数据库路径
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// 边缘节点同步共享令牌（为空则启动时随机生成）
    #[serde(default)]
    pub sync_token: Option<String>,

    /// 占用过期巡检间隔（秒），仅做日志巡检，正确性不依赖它
    #[serde(default = "default_sweep_interval")]
    pub occupancy_sweep_interval_secs: u64,
}

fn default_web_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "./data/sspanel.db".to_string()
}

fn default_sweep_interval() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_port: default_web_port(),
            db_path: default_db_path(),
            sync_token: None,
            occupancy_sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn load_from(path: &Path) -> anyhow::Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 获取同步令牌，未配置时生成一个随机令牌
    pub fn get_sync_token(&self) -> String {
        if let Some(ref token) = self.sync_token {
            if !token.is_empty() {
                return token.clone();
            }
        }
        generate_random_token(32)
    }
}

/// 生成随机令牌
fn generate_random_token(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

static CONFIG: OnceCell<Config> = OnceCell::const_new();

/// 以显式配置初始化全局配置，仅允许调用一次（由 main 调用）
pub fn init_config(config: Config) {
    if CONFIG.set(config).is_err() {
        tracing::warn!("全局配置已初始化，忽略重复初始化");
    }
}

/// 获取全局配置
pub async fn get_config() -> &'static Config {
    CONFIG
        .get_or_init(|| async {
            let path = Path::new("config.toml");
            if path.exists() {
                Config::load_from(path).unwrap_or_else(|e| {
                    tracing::warn!("加载 config.toml 失败，使用默认配置: {}", e);
                    Config::default()
                })
            } else {
                Config::default()
            }
        })
        .await
}
