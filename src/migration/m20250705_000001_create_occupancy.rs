use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 occupancy_config 表（节点占用策略，每节点至多一份）
        manager
            .create_table(
                Table::create()
                    .table(OccupancyConfig::Table)
                    .if_not_exists()
                    .col(big_integer(OccupancyConfig::Id).auto_increment().primary_key())
                    .col(big_integer(OccupancyConfig::NodeId).unique_key())
                    .col(double(OccupancyConfig::Price).default(0.0))
                    .col(big_integer(OccupancyConfig::OccupancyTraffic).default(0))
                    .col(integer(OccupancyConfig::MaxOccupancyUserCount).default(1))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_occupancy_config_node")
                            .from(OccupancyConfig::Table, OccupancyConfig::NodeId)
                            .to(ProxyNode::Table, ProxyNode::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 user_occupancy 表（占用记录，只追加不删除）
        manager
            .create_table(
                Table::create()
                    .table(UserOccupancy::Table)
                    .if_not_exists()
                    .col(big_integer(UserOccupancy::Id).auto_increment().primary_key())
                    .col(big_integer(UserOccupancy::UserId))
                    .col(big_integer(UserOccupancy::NodeId))
                    .col(timestamp(UserOccupancy::StartTime))
                    .col(timestamp(UserOccupancy::EndTime))
                    .col(big_integer(UserOccupancy::OccupancyTraffic).default(0))
                    .col(big_integer(UserOccupancy::UsedTraffic).default(0))
                    .col(boolean(UserOccupancy::OutOfTraffic).default(false))
                    .col(string(UserOccupancy::ConfigSnapshot))
                    .col(timestamp(UserOccupancy::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_occupancy_user")
                            .from(UserOccupancy::Table, UserOccupancy::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_occupancy_node")
                            .from(UserOccupancy::Table, UserOccupancy::NodeId)
                            .to(ProxyNode::Table, ProxyNode::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 活跃占用按 (node_id, end_time) 过滤
        manager
            .create_index(
                Index::create()
                    .name("idx_user_occupancy_node_end")
                    .table(UserOccupancy::Table)
                    .col(UserOccupancy::NodeId)
                    .col(UserOccupancy::EndTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserOccupancy::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OccupancyConfig::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum OccupancyConfig {
    Table,
    Id,
    NodeId,
    Price,
    OccupancyTraffic,
    MaxOccupancyUserCount,
}

#[derive(DeriveIden)]
enum UserOccupancy {
    Table,
    Id,
    UserId,
    NodeId,
    StartTime,
    EndTime,
    OccupancyTraffic,
    UsedTraffic,
    OutOfTraffic,
    ConfigSnapshot,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProxyNode {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}
