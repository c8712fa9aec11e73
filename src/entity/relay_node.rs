use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 中转（隧道转发）节点
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relay_node")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub server: String,
    pub isp: Option<String>,
    pub enable: bool,
    pub remark: Option<String>,
    /// 中转节点自身配置拉取服务的端口
    #[serde(rename = "webPort")]
    pub web_port: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::relay_rule::Entity")]
    RelayRules,
}

impl Related<super::relay_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RelayRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
