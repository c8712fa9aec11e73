use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 代理节点
///
/// used_traffic 只增不减（仅显式重置时清零），超过 total_traffic 后节点自动下线。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proxy_node")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub server: String,
    /// 协议类型: ss / ssr / trojan / vmess / vless
    #[serde(rename = "nodeType")]
    pub node_type: String,
    pub level: i32,
    pub enable: bool,
    /// 流量配额（字节）
    #[serde(rename = "totalTraffic")]
    pub total_traffic: i64,
    /// 已用流量（字节）
    #[serde(rename = "usedTraffic")]
    pub used_traffic: i64,
    /// 流量计费倍率
    #[serde(rename = "enlargeScale")]
    pub enlarge_scale: f64,
    #[serde(rename = "enableUdp")]
    pub enable_udp: bool,
    /// 是否允许直连（不经过中转隧道）
    #[serde(rename = "enableDirect")]
    pub enable_direct: bool,
    /// 订阅输出中的稳定排序
    pub sequence: i32,
    pub remark: Option<String>,
    /// ehco 隧道监听地址
    #[serde(rename = "ehcoListenHost")]
    pub ehco_listen_host: Option<String>,
    #[serde(rename = "ehcoListenPort")]
    pub ehco_listen_port: Option<i32>,
    /// ehco 隧道传输类型: raw / ws / wss / mwss
    #[serde(rename = "ehcoTransportType")]
    pub ehco_transport_type: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::relay_rule::Entity")]
    RelayRules,
    #[sea_orm(has_many = "super::user_occupancy::Entity")]
    UserOccupancies,
}

impl Related<super::relay_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RelayRules.def()
    }
}

impl Related<super::user_occupancy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserOccupancies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
