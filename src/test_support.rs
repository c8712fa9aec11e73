//! 测试夹具：内存数据库 + 常用实体的默认 ActiveModel

use chrono::Utc;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use crate::entity::{
    occupancy_config, proxy_node, relay_node, relay_rule, ss_config, trojan_config, user,
};
use crate::migration::Migrator;

pub const GB: i64 = 1024 * 1024 * 1024;

/// 全新的内存数据库，跑完全部迁移
///
/// 限制单连接，保证内存库在并发任务间共享同一份数据
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.expect("connect test db");
    Migrator::up(&db, None).await.expect("migrate test db");
    db
}

fn now() -> chrono::NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn node_fixture(name: &str, node_type: &str) -> proxy_node::ActiveModel {
    proxy_node::ActiveModel {
        name: Set(name.to_string()),
        server: Set("proxy.example.com".to_string()),
        node_type: Set(node_type.to_string()),
        level: Set(0),
        enable: Set(true),
        total_traffic: Set(100 * GB),
        used_traffic: Set(0),
        enlarge_scale: Set(1.0),
        enable_udp: Set(true),
        enable_direct: Set(true),
        sequence: Set(0),
        remark: Set(None),
        ehco_listen_host: Set(None),
        ehco_listen_port: Set(None),
        ehco_transport_type: Set(None),
        created_at: Set(now()),
        ..Default::default()
    }
}

pub fn user_fixture(username: &str, level: i32) -> user::ActiveModel {
    user::ActiveModel {
        username: Set(username.to_string()),
        level: Set(level),
        proxy_password: Set(uuid::Uuid::new_v4().to_string()),
        upload_traffic: Set(0),
        download_traffic: Set(0),
        total_traffic: Set(10 * GB),
        enable: Set(true),
        balance: Set(0.0),
        last_use_time: Set(None),
        created_at: Set(now()),
        ..Default::default()
    }
}

pub fn ss_config_fixture(node_id: i64) -> ss_config::ActiveModel {
    ss_config::ActiveModel {
        node_id: Set(node_id),
        method: Set("aes-256-gcm".to_string()),
        multi_user_port: Set(8388),
        enable: Set(true),
        ..Default::default()
    }
}

pub fn trojan_config_fixture(node_id: i64) -> trojan_config::ActiveModel {
    trojan_config::ActiveModel {
        node_id: Set(node_id),
        multi_user_port: Set(8443),
        fallback_addr: Set("127.0.0.1:80".to_string()),
        enable: Set(true),
        ..Default::default()
    }
}

pub fn relay_node_fixture(name: &str) -> relay_node::ActiveModel {
    relay_node::ActiveModel {
        name: Set(name.to_string()),
        server: Set("relay.example.com".to_string()),
        isp: Set(None),
        enable: Set(true),
        remark: Set(None),
        web_port: Set(1818),
        created_at: Set(now()),
        ..Default::default()
    }
}

pub fn relay_rule_fixture(
    proxy_node_id: i64,
    relay_node_id: i64,
    relay_port: i32,
) -> relay_rule::ActiveModel {
    relay_rule::ActiveModel {
        proxy_node_id: Set(proxy_node_id),
        relay_node_id: Set(relay_node_id),
        relay_port: Set(relay_port),
        listen_type: Set("raw".to_string()),
        transport_type: Set("raw".to_string()),
        created_at: Set(now()),
        ..Default::default()
    }
}

/// 未入库的占用策略（create_by_occupancy_config 只读取字段）
pub fn occupancy_config_fixture(
    node_id: i64,
    max_occupancy_user_count: i32,
    occupancy_traffic: i64,
) -> occupancy_config::Model {
    occupancy_config::Model {
        id: 0,
        node_id,
        price: 9.9,
        occupancy_traffic,
        max_occupancy_user_count,
    }
}
