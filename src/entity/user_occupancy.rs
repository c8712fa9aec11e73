use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户对节点的独占占用记录
///
/// 活跃 = end_time 未过期且未标记流量耗尽。记录从不删除，
/// 过期/耗尽后只会被更晚的活跃记录取代。
/// config_snapshot 冻结创建时的占用策略，后续修改策略不影响已占用用户。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_occupancy")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "nodeId")]
    pub node_id: i64,
    #[serde(rename = "startTime")]
    pub start_time: DateTime,
    #[serde(rename = "endTime")]
    pub end_time: DateTime,
    /// 创建时从占用策略快照下来的流量额度（字节）
    #[serde(rename = "occupancyTraffic")]
    pub occupancy_traffic: i64,
    /// 占用期内已消耗流量（字节），仅由流量结转更新
    #[serde(rename = "usedTraffic")]
    pub used_traffic: i64,
    #[serde(rename = "outOfTraffic")]
    pub out_of_traffic: bool,
    /// 创建时占用策略的 JSON 快照
    #[serde(rename = "configSnapshot")]
    pub config_snapshot: String,
    pub created_at: DateTime,
}

impl Model {
    /// 指定时刻是否仍处于活跃占用
    pub fn is_active_at(&self, now: DateTime) -> bool {
        self.end_time >= now && !self.out_of_traffic
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::proxy_node::Entity",
        from = "Column::NodeId",
        to = "super::proxy_node::Column::Id",
        on_delete = "Cascade"
    )]
    ProxyNode,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::proxy_node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProxyNode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
