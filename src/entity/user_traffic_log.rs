use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 流量上报审计日志，只增不改
///
/// user_id 为空表示空批次的心跳占位行，在线检测按 created_at 判断节点是否活跃。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_traffic_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    #[serde(rename = "nodeId")]
    pub node_id: i64,
    #[serde(rename = "uploadTraffic")]
    pub upload_traffic: i64,
    #[serde(rename = "downloadTraffic")]
    pub download_traffic: i64,
    /// 上报的客户端 IP 列表（JSON 数组字符串）
    #[serde(rename = "ipList")]
    pub ip_list: String,
    pub created_at: DateTime,
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
