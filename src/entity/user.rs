use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 订阅用户
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    pub level: i32,
    /// 代理连接密码（trojan/vmess 下作为 uuid 凭据）
    #[serde(rename = "proxyPassword")]
    pub proxy_password: String,
    #[serde(rename = "uploadTraffic")]
    pub upload_traffic: i64,
    #[serde(rename = "downloadTraffic")]
    pub download_traffic: i64,
    /// 流量配额（字节）
    #[serde(rename = "totalTraffic")]
    pub total_traffic: i64,
    pub enable: bool,
    pub balance: f64,
    #[serde(rename = "lastUseTime")]
    pub last_use_time: Option<DateTime>,
    pub created_at: DateTime,
}

impl Model {
    /// 已消耗流量（上行 + 下行）
    pub fn used_traffic(&self) -> i64 {
        self.upload_traffic + self.download_traffic
    }

    /// 流量是否未耗尽
    pub fn has_traffic_left(&self) -> bool {
        self.used_traffic() < self.total_traffic
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_occupancy::Entity")]
    UserOccupancies,
    #[sea_orm(has_many = "super::user_traffic_log::Entity")]
    TrafficLogs,
}

impl Related<super::user_occupancy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserOccupancies.def()
    }
}

impl Related<super::user_traffic_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrafficLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
