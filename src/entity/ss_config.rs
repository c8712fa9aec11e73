use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// shadowsocks 协议配置，与 ss/ssr 节点一对一
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ss_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    #[serde(rename = "nodeId")]
    pub node_id: i64,
    /// 加密方式
    pub method: String,
    /// 单端口多用户监听端口
    #[serde(rename = "multiUserPort")]
    pub multi_user_port: i32,
    pub enable: bool,
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
