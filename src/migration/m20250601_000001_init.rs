use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 proxy_node 表（代理节点）
        manager
            .create_table(
                Table::create()
                    .table(ProxyNode::Table)
                    .if_not_exists()
                    .col(big_integer(ProxyNode::Id).auto_increment().primary_key())
                    .col(string(ProxyNode::Name))
                    .col(string(ProxyNode::Server))
                    .col(string(ProxyNode::NodeType))
                    .col(integer(ProxyNode::Level).default(0))
                    .col(boolean(ProxyNode::Enable).default(true))
                    .col(big_integer(ProxyNode::TotalTraffic).default(0))
                    .col(big_integer(ProxyNode::UsedTraffic).default(0))
                    .col(double(ProxyNode::EnlargeScale).default(1.0))
                    .col(boolean(ProxyNode::EnableUdp).default(true))
                    .col(boolean(ProxyNode::EnableDirect).default(true))
                    .col(integer(ProxyNode::Sequence).default(0))
                    .col(string_null(ProxyNode::Remark))
                    .col(string_null(ProxyNode::EhcoListenHost))
                    .col(integer_null(ProxyNode::EhcoListenPort))
                    .col(string_null(ProxyNode::EhcoTransportType))
                    .col(timestamp(ProxyNode::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // 创建 ss_config 表，node_id 唯一（每个节点至多一份协议配置）
        manager
            .create_table(
                Table::create()
                    .table(SsConfig::Table)
                    .if_not_exists()
                    .col(big_integer(SsConfig::Id).auto_increment().primary_key())
                    .col(big_integer(SsConfig::NodeId).unique_key())
                    .col(string(SsConfig::Method))
                    .col(integer(SsConfig::MultiUserPort))
                    .col(boolean(SsConfig::Enable).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ss_config_node")
                            .from(SsConfig::Table, SsConfig::NodeId)
                            .to(ProxyNode::Table, ProxyNode::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 trojan_config 表
        manager
            .create_table(
                Table::create()
                    .table(TrojanConfig::Table)
                    .if_not_exists()
                    .col(big_integer(TrojanConfig::Id).auto_increment().primary_key())
                    .col(big_integer(TrojanConfig::NodeId).unique_key())
                    .col(integer(TrojanConfig::MultiUserPort))
                    .col(string(TrojanConfig::FallbackAddr))
                    .col(boolean(TrojanConfig::Enable).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trojan_config_node")
                            .from(TrojanConfig::Table, TrojanConfig::NodeId)
                            .to(ProxyNode::Table, ProxyNode::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 user 表
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(big_integer(User::Id).auto_increment().primary_key())
                    .col(string(User::Username))
                    .col(integer(User::Level).default(0))
                    .col(string(User::ProxyPassword))
                    .col(big_integer(User::UploadTraffic).default(0))
                    .col(big_integer(User::DownloadTraffic).default(0))
                    .col(big_integer(User::TotalTraffic).default(0))
                    .col(boolean(User::Enable).default(true))
                    .col(double(User::Balance).default(0.0))
                    .col(timestamp_null(User::LastUseTime))
                    .col(timestamp(User::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // 创建 user_traffic_log 表（user_id 可空，空批次写心跳占位行）
        manager
            .create_table(
                Table::create()
                    .table(UserTrafficLog::Table)
                    .if_not_exists()
                    .col(big_integer(UserTrafficLog::Id).auto_increment().primary_key())
                    .col(big_integer_null(UserTrafficLog::UserId))
                    .col(big_integer(UserTrafficLog::NodeId))
                    .col(big_integer(UserTrafficLog::UploadTraffic).default(0))
                    .col(big_integer(UserTrafficLog::DownloadTraffic).default(0))
                    .col(string(UserTrafficLog::IpList).default("[]"))
                    .col(timestamp(UserTrafficLog::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_traffic_log_user")
                            .from(UserTrafficLog::Table, UserTrafficLog::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_traffic_log_node")
                            .from(UserTrafficLog::Table, UserTrafficLog::NodeId)
                            .to(ProxyNode::Table, ProxyNode::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 在线检测按 (node_id, created_at) 查询
        manager
            .create_index(
                Index::create()
                    .name("idx_traffic_log_node_created")
                    .table(UserTrafficLog::Table)
                    .col(UserTrafficLog::NodeId)
                    .col(UserTrafficLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserTrafficLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrojanConfig::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SsConfig::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProxyNode::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ProxyNode {
    Table,
    Id,
    Name,
    Server,
    NodeType,
    Level,
    Enable,
    TotalTraffic,
    UsedTraffic,
    EnlargeScale,
    EnableUdp,
    EnableDirect,
    Sequence,
    Remark,
    EhcoListenHost,
    EhcoListenPort,
    EhcoTransportType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SsConfig {
    Table,
    Id,
    NodeId,
    Method,
    MultiUserPort,
    Enable,
}

#[derive(DeriveIden)]
enum TrojanConfig {
    Table,
    Id,
    NodeId,
    MultiUserPort,
    FallbackAddr,
    Enable,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    Level,
    ProxyPassword,
    UploadTraffic,
    DownloadTraffic,
    TotalTraffic,
    Enable,
    Balance,
    LastUseTime,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserTrafficLog {
    Table,
    Id,
    UserId,
    NodeId,
    UploadTraffic,
    DownloadTraffic,
    IpList,
    CreatedAt,
}
