use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 relay_node 表（中转节点）
        manager
            .create_table(
                Table::create()
                    .table(RelayNode::Table)
                    .if_not_exists()
                    .col(big_integer(RelayNode::Id).auto_increment().primary_key())
                    .col(string(RelayNode::Name))
                    .col(string(RelayNode::Server))
                    .col(string_null(RelayNode::Isp))
                    .col(boolean(RelayNode::Enable).default(true))
                    .col(string_null(RelayNode::Remark))
                    .col(integer(RelayNode::WebPort).default(0))
                    .col(timestamp(RelayNode::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // 创建 relay_rule 表（代理节点 -> 中转节点 的转发规则）
        manager
            .create_table(
                Table::create()
                    .table(RelayRule::Table)
                    .if_not_exists()
                    .col(big_integer(RelayRule::Id).auto_increment().primary_key())
                    .col(big_integer(RelayRule::ProxyNodeId))
                    .col(big_integer(RelayRule::RelayNodeId))
                    .col(integer(RelayRule::RelayPort))
                    .col(string(RelayRule::ListenType).default("raw"))
                    .col(string(RelayRule::TransportType).default("raw"))
                    .col(timestamp(RelayRule::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_relay_rule_proxy_node")
                            .from(RelayRule::Table, RelayRule::ProxyNodeId)
                            .to(ProxyNode::Table, ProxyNode::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_relay_rule_relay_node")
                            .from(RelayRule::Table, RelayRule::RelayNodeId)
                            .to(RelayNode::Table, RelayNode::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_relay_rule_relay_node")
                    .table(RelayRule::Table)
                    .col(RelayRule::RelayNodeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RelayRule::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RelayNode::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum RelayNode {
    Table,
    Id,
    Name,
    Server,
    Isp,
    Enable,
    Remark,
    WebPort,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RelayRule {
    Table,
    Id,
    ProxyNodeId,
    RelayNodeId,
    RelayPort,
    ListenType,
    TransportType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProxyNode {
    Table,
    Id,
}
