use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::entity::{user, user_traffic_log, ProxyNode, User, UserTrafficLog};
use crate::error::PanelError;
use crate::occupancy;

/// 边缘节点上报的单个用户流量行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub user_id: i64,
    #[serde(default)]
    pub upload_traffic: i64,
    #[serde(default)]
    pub download_traffic: i64,
    #[serde(default)]
    pub tcp_conn_num: i32,
    #[serde(default)]
    pub ip_list: Vec<String>,
}

/// 一次同步的结果摘要
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncSummary {
    /// 本批次更新的用户数
    pub user_count: usize,
    /// 计入节点的流量总增量（已乘倍率，字节）
    pub traffic_added: i64,
    /// 本批次是否触发节点超额下线
    pub node_disabled: bool,
}

/// 按节点倍率放大上报流量，截断取整
///
/// 负值按 0 处理，used_traffic 只增不减，不给异常的边缘进程回退
/// 计数的机会；放大溢出时饱和到 i64::MAX。
pub fn scale_traffic(value: i64, scale: f64) -> i64 {
    if value <= 0 {
        return 0;
    }
    let scaled = value as f64 * scale;
    if scaled >= i64::MAX as f64 {
        i64::MAX
    } else {
        scaled as i64
    }
}

/// 处理一个边缘节点的一批流量上报
///
/// 整批在一个事务内完成。重放同一批次会重复计数，调用方不得重试。
/// 边缘进程对同一节点是单写者，节点间批次天然不相交。
pub async fn sync_node_traffic(
    db: &DatabaseConnection,
    node_id: i64,
    records: Vec<TrafficRecord>,
) -> Result<SyncSummary> {
    let node = ProxyNode::find_by_id(node_id)
        .one(db)
        .await?
        .ok_or(PanelError::NodeNotFound { node_id })?;

    let txn = db.begin().await?;
    let now = Utc::now().naive_utc();

    // 空批次也写一条占位日志行，在线检测按日志时间判断节点仍然活跃
    if records.is_empty() {
        user_traffic_log::ActiveModel {
            user_id: Set(None),
            node_id: Set(node.id),
            upload_traffic: Set(0),
            download_traffic: Set(0),
            ip_list: Set("[]".to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        return Ok(SyncSummary::default());
    }

    let mut log_rows = Vec::with_capacity(records.len());
    let mut total_added: i64 = 0;

    for record in &records {
        let upload = scale_traffic(record.upload_traffic, node.enlarge_scale);
        let download = scale_traffic(record.download_traffic, node.enlarge_scale);
        total_added += upload + download;

        // 用户计数器用原子自增表达式，批内全部是交换律加法
        User::update_many()
            .col_expr(
                user::Column::UploadTraffic,
                Expr::col(user::Column::UploadTraffic).add(upload),
            )
            .col_expr(
                user::Column::DownloadTraffic,
                Expr::col(user::Column::DownloadTraffic).add(download),
            )
            .col_expr(user::Column::LastUseTime, Expr::value(now))
            .filter(user::Column::Id.eq(record.user_id))
            .exec(&txn)
            .await?;

        // 活跃占用记录同步结转
        occupancy::check_and_incr_traffic(&txn, record.user_id, node.id, upload + download)
            .await?;

        log_rows.push(user_traffic_log::ActiveModel {
            user_id: Set(Some(record.user_id)),
            node_id: Set(node.id),
            upload_traffic: Set(upload),
            download_traffic: Set(download),
            ip_list: Set(serde_json::to_string(&record.ip_list)?),
            created_at: Set(now),
            ..Default::default()
        });
    }

    let user_count = log_rows.len();
    UserTrafficLog::insert_many(log_rows).exec(&txn).await?;

    // 节点计数与超额下线在同一条更新语句内完成
    let new_used = node.used_traffic + total_added;
    let disable = new_used > node.total_traffic;
    let mut update = ProxyNode::update_many()
        .col_expr(
            crate::entity::proxy_node::Column::UsedTraffic,
            Expr::value(new_used),
        )
        .filter(crate::entity::proxy_node::Column::Id.eq(node.id));
    if disable {
        update = update.col_expr(
            crate::entity::proxy_node::Column::Enable,
            Expr::value(false),
        );
    }
    update.exec(&txn).await?;

    txn.commit().await?;

    if disable {
        warn!(
            "节点 #{} 流量超额（{} > {}），已自动下线",
            node.id, new_used, node.total_traffic
        );
    } else {
        info!(
            "节点 #{} 同步 {} 个用户，流量 +{} 字节",
            node.id, user_count, total_added
        );
    }

    Ok(SyncSummary {
        user_count,
        traffic_added: total_added,
        node_disabled: disable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{user_occupancy, UserOccupancy};
    use crate::occupancy::create_by_occupancy_config;
    use crate::test_support::{
        node_fixture, occupancy_config_fixture, test_db, user_fixture, GB,
    };
    use sea_orm::{ActiveModelTrait, PaginatorTrait, QueryFilter, Set};

    fn record(user_id: i64, upload: i64, download: i64) -> TrafficRecord {
        TrafficRecord {
            user_id,
            upload_traffic: upload,
            download_traffic: download,
            tcp_conn_num: 1,
            ip_list: vec!["10.0.0.1".to_string()],
        }
    }

    #[test]
    fn test_scale_truncates() {
        assert_eq!(scale_traffic(100, 1.5), 150);
        assert_eq!(scale_traffic(3, 1.5), 4);
        assert_eq!(scale_traffic(3, 0.5), 1);
        assert_eq!(scale_traffic(0, 2.0), 0);
    }

    #[test]
    fn test_scale_clamps_negative_and_saturates() {
        assert_eq!(scale_traffic(-100, 1.0), 0);
        assert_eq!(scale_traffic(-1, 2.0), 0);
        assert_eq!(scale_traffic(i64::MAX, 2.0), i64::MAX);
        assert_eq!(scale_traffic(i64::MAX, 1.0), i64::MAX);
    }

    #[tokio::test]
    async fn test_unknown_node_is_fatal() {
        let db = test_db().await;
        let err = sync_node_traffic(&db, 404, vec![]).await.unwrap_err();
        let panel_err = err.downcast_ref::<PanelError>().unwrap();
        assert_eq!(panel_err, &PanelError::NodeNotFound { node_id: 404 });
    }

    // 空批次写一条心跳占位行
    #[tokio::test]
    async fn test_empty_batch_writes_placeholder_row() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();

        let summary = sync_node_traffic(&db, node.id, vec![]).await.unwrap();
        assert_eq!(summary.user_count, 0);

        let logs = UserTrafficLog::find().all(&db).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user_id, None);
        assert_eq!(logs[0].node_id, node.id);
    }

    // 端到端：level 2 节点，倍率 2，10 GiB 配额；上报 1 GiB 上行 + 1 GiB 下行
    // => 用户各 +2 GiB，节点 +4 GiB，仍然在线
    #[tokio::test]
    async fn test_scaled_accounting_keeps_node_enabled() {
        let db = test_db().await;
        let mut node = node_fixture("n1", "ss");
        node.level = Set(2);
        node.total_traffic = Set(10 * GB);
        node.enlarge_scale = Set(2.0);
        let node = node.insert(&db).await.unwrap();
        let user_row = user_fixture("u", 3).insert(&db).await.unwrap();

        let summary = sync_node_traffic(&db, node.id, vec![record(user_row.id, GB, GB)])
            .await
            .unwrap();

        assert_eq!(summary.user_count, 1);
        assert_eq!(summary.traffic_added, 4 * GB);
        assert!(!summary.node_disabled);

        let user_row = User::find_by_id(user_row.id).one(&db).await.unwrap().unwrap();
        assert_eq!(user_row.upload_traffic, 2 * GB);
        assert_eq!(user_row.download_traffic, 2 * GB);
        assert!(user_row.last_use_time.is_some());

        let node = ProxyNode::find_by_id(node.id).one(&db).await.unwrap().unwrap();
        assert_eq!(node.used_traffic, 4 * GB);
        assert!(node.enable);

        // 用户增量之和等于节点增量
        assert_eq!(
            user_row.upload_traffic + user_row.download_traffic,
            node.used_traffic
        );
    }

    // 同一批次打在 used=9GiB 的节点上 => used=13GiB 且 enable 翻转为 false
    #[tokio::test]
    async fn test_overflow_disables_node() {
        let db = test_db().await;
        let mut node = node_fixture("n1", "ss");
        node.total_traffic = Set(10 * GB);
        node.used_traffic = Set(9 * GB);
        node.enlarge_scale = Set(2.0);
        let node = node.insert(&db).await.unwrap();
        let user_row = user_fixture("u", 3).insert(&db).await.unwrap();

        let summary = sync_node_traffic(&db, node.id, vec![record(user_row.id, GB, GB)])
            .await
            .unwrap();
        assert!(summary.node_disabled);

        let node = ProxyNode::find_by_id(node.id).one(&db).await.unwrap().unwrap();
        assert_eq!(node.used_traffic, 13 * GB);
        assert!(!node.enable);
    }

    // 上报负值不得回退任何计数器
    #[tokio::test]
    async fn test_negative_report_does_not_decrease_counters() {
        let db = test_db().await;
        let mut node = node_fixture("n1", "ss");
        node.used_traffic = Set(5 * GB);
        let node = node.insert(&db).await.unwrap();
        let mut user_row = user_fixture("u", 1);
        user_row.upload_traffic = Set(GB);
        let user_row = user_row.insert(&db).await.unwrap();

        let summary = sync_node_traffic(&db, node.id, vec![record(user_row.id, -GB, -GB)])
            .await
            .unwrap();
        assert_eq!(summary.traffic_added, 0);

        let user_row = User::find_by_id(user_row.id).one(&db).await.unwrap().unwrap();
        assert_eq!(user_row.upload_traffic, GB);
        assert_eq!(user_row.download_traffic, 0);

        let node = ProxyNode::find_by_id(node.id).one(&db).await.unwrap().unwrap();
        assert_eq!(node.used_traffic, 5 * GB);
    }

    #[tokio::test]
    async fn test_one_log_row_per_user() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let a = user_fixture("a", 1).insert(&db).await.unwrap();
        let b = user_fixture("b", 1).insert(&db).await.unwrap();

        sync_node_traffic(
            &db,
            node.id,
            vec![record(a.id, 100, 200), record(b.id, 300, 400)],
        )
        .await
        .unwrap();

        let logs = UserTrafficLog::find().count(&db).await.unwrap();
        assert_eq!(logs, 2);
    }

    // 有活跃占用的用户，流量同步同时结转占用额度
    #[tokio::test]
    async fn test_occupancy_accrual_via_sync() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let user_row = user_fixture("u", 1).insert(&db).await.unwrap();

        let config = occupancy_config_fixture(node.id, 1, GB);
        create_by_occupancy_config(&db, user_row.id, node.id, &config)
            .await
            .unwrap();

        sync_node_traffic(&db, node.id, vec![record(user_row.id, GB, GB)])
            .await
            .unwrap();

        let occ = UserOccupancy::find()
            .filter(user_occupancy::Column::UserId.eq(user_row.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(occ.used_traffic, 2 * GB);
        assert!(occ.out_of_traffic); // 2 GiB > 1 GiB 额度
    }
}
