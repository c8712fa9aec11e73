use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 节点占用策略：价格、流量额度、最大并发占用人数
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "occupancy_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    #[serde(rename = "nodeId")]
    pub node_id: i64,
    pub price: f64,
    /// 占用期内的流量额度（字节）
    #[serde(rename = "occupancyTraffic")]
    pub occupancy_traffic: i64,
    #[serde(rename = "maxOccupancyUserCount")]
    pub max_occupancy_user_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::proxy_node::Entity",
        from = "Column::NodeId",
        to = "super::proxy_node::Column::Id",
        on_delete = "Cascade"
    )]
    ProxyNode,
}

impl Related<super::proxy_node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProxyNode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
