use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 中转规则：把一个代理节点绑定到一个中转节点的指定端口
///
/// 实际生效 = 代理节点与中转节点均启用。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relay_rule")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[serde(rename = "proxyNodeId")]
    pub proxy_node_id: i64,
    #[serde(rename = "relayNodeId")]
    pub relay_node_id: i64,
    /// 中转侧监听端口
    #[serde(rename = "relayPort")]
    pub relay_port: i32,
    #[serde(rename = "listenType")]
    pub listen_type: String,
    /// raw / ws / wss / mwss
    #[serde(rename = "transportType")]
    pub transport_type: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::proxy_node::Entity",
        from = "Column::ProxyNodeId",
        to = "super::proxy_node::Column::Id",
        on_delete = "Cascade"
    )]
    ProxyNode,
    #[sea_orm(
        belongs_to = "super::relay_node::Entity",
        from = "Column::RelayNodeId",
        to = "super::relay_node::Column::Id",
        on_delete = "Cascade"
    )]
    RelayNode,
}

impl Related<super::proxy_node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProxyNode.def()
    }
}

impl Related<super::relay_node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RelayNode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
