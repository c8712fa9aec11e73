use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::info;

use crate::entity::{occupancy_config, user_occupancy, UserOccupancy};
use crate::error::PanelError;

/// 占用有效期：30 天
const OCCUPANCY_DAYS: i64 = 30;

/// 查询某节点当前活跃的占用记录（未过期且未耗尽流量）
pub async fn active_occupancies_for_node<C: ConnectionTrait>(
    conn: &C,
    node_id: i64,
) -> Result<Vec<user_occupancy::Model>> {
    let now = Utc::now().naive_utc();
    let records = UserOccupancy::find()
        .filter(user_occupancy::Column::NodeId.eq(node_id))
        .filter(user_occupancy::Column::EndTime.gte(now))
        .filter(user_occupancy::Column::OutOfTraffic.eq(false))
        .order_by_asc(user_occupancy::Column::Id)
        .all(conn)
        .await?;
    Ok(records)
}

/// 查询全部活跃占用记录
pub async fn all_active_occupancies<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<user_occupancy::Model>> {
    let now = Utc::now().naive_utc();
    let records = UserOccupancy::find()
        .filter(user_occupancy::Column::EndTime.gte(now))
        .filter(user_occupancy::Column::OutOfTraffic.eq(false))
        .order_by_asc(user_occupancy::Column::Id)
        .all(conn)
        .await?;
    Ok(records)
}

/// 按占用策略创建占用记录
///
/// 容量检查与插入在同一事务内完成，并发创建同一节点的占用时
/// 成功数不会超过 max_occupancy_user_count。
/// 策略被冻结为 JSON 快照，创建后修改共享策略不影响已有记录。
pub async fn create_by_occupancy_config(
    db: &DatabaseConnection,
    user_id: i64,
    node_id: i64,
    config: &occupancy_config::Model,
) -> Result<user_occupancy::Model> {
    if config.max_occupancy_user_count <= 0 {
        return Err(PanelError::ZeroOccupancyCapacity { node_id }.into());
    }

    let snapshot = serde_json::to_string(config)?;
    let txn = db.begin().await?;
    let now = Utc::now().naive_utc();

    let active_count = UserOccupancy::find()
        .filter(user_occupancy::Column::NodeId.eq(node_id))
        .filter(user_occupancy::Column::EndTime.gte(now))
        .filter(user_occupancy::Column::OutOfTraffic.eq(false))
        .count(&txn)
        .await?;

    if active_count >= config.max_occupancy_user_count as u64 {
        txn.rollback().await?;
        return Err(PanelError::OccupancyCapacityExceeded {
            node_id,
            max: config.max_occupancy_user_count,
        }
        .into());
    }

    let record = user_occupancy::ActiveModel {
        user_id: Set(user_id),
        node_id: Set(node_id),
        start_time: Set(now),
        end_time: Set(now + Duration::days(OCCUPANCY_DAYS)),
        occupancy_traffic: Set(config.occupancy_traffic),
        used_traffic: Set(0),
        out_of_traffic: Set(false),
        config_snapshot: Set(snapshot),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("用户 #{} 占用节点 #{}，到期时间 {}", user_id, node_id, record.end_time);
    Ok(record)
}

/// 为占用记录结转流量
///
/// 读取-修改-写回，无行锁；同一记录的并发结转可能丢失更新，
/// 单用户占用单节点的场景下争用极低，按现状保留。
/// 超出快照额度时置 out_of_traffic，返回是否发生翻转。
pub async fn check_and_incr_traffic<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    node_id: i64,
    traffic: i64,
) -> Result<bool> {
    let now = Utc::now().naive_utc();
    let record = UserOccupancy::find()
        .filter(user_occupancy::Column::UserId.eq(user_id))
        .filter(user_occupancy::Column::NodeId.eq(node_id))
        .filter(user_occupancy::Column::EndTime.gte(now))
        .filter(user_occupancy::Column::OutOfTraffic.eq(false))
        .order_by_desc(user_occupancy::Column::Id)
        .one(conn)
        .await?;

    let record = match record {
        Some(r) => r,
        None => return Ok(false),
    };

    let allowance = record.occupancy_traffic;
    let new_used = record.used_traffic + traffic;
    let exhausted = new_used > allowance;

    let mut active: user_occupancy::ActiveModel = record.into();
    active.used_traffic = Set(new_used);
    if exhausted {
        active.out_of_traffic = Set(true);
    }
    active.update(conn).await?;

    if exhausted {
        info!("用户 #{} 对节点 #{} 的占用流量已耗尽", user_id, node_id);
    }
    Ok(exhausted)
}

/// 巡检最近过期的占用并记录日志
///
/// 过期本身是被动的（查询按 end_time 过滤），巡检只做运维可见性。
pub async fn sweep_expired(db: &DatabaseConnection, window_secs: u64) -> Result<u64> {
    let now = Utc::now().naive_utc();
    let since = now - Duration::seconds(window_secs as i64);
    let expired = UserOccupancy::find()
        .filter(user_occupancy::Column::EndTime.lt(now))
        .filter(user_occupancy::Column::EndTime.gte(since))
        .filter(user_occupancy::Column::OutOfTraffic.eq(false))
        .count(db)
        .await?;
    if expired > 0 {
        info!("近 {} 秒内有 {} 条占用到期", window_secs, expired);
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{occupancy_config_fixture, test_db, user_fixture, node_fixture, GB};
    use sea_orm::ActiveModelTrait;

    #[tokio::test]
    async fn test_zero_capacity_is_fatal() {
        let db = test_db().await;
        let user = user_fixture("alice", 1).insert(&db).await.unwrap();
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let config = occupancy_config_fixture(node.id, 0, GB);

        let err = create_by_occupancy_config(&db, user.id, node.id, &config)
            .await
            .unwrap_err();
        let panel_err = err.downcast_ref::<PanelError>().unwrap();
        assert_eq!(
            panel_err,
            &PanelError::ZeroOccupancyCapacity { node_id: node.id }
        );
    }

    #[tokio::test]
    async fn test_capacity_enforced_sequentially() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let a = user_fixture("alice", 1).insert(&db).await.unwrap();
        let b = user_fixture("bob", 1).insert(&db).await.unwrap();
        let config = occupancy_config_fixture(node.id, 1, GB);

        create_by_occupancy_config(&db, a.id, node.id, &config)
            .await
            .unwrap();

        let err = create_by_occupancy_config(&db, b.id, node.id, &config)
            .await
            .unwrap_err();
        let panel_err = err.downcast_ref::<PanelError>().unwrap();
        assert!(panel_err.is_capacity_error());
    }

    // N+1 个并发创建请求打在 max=N 的节点上，恰好 N 个成功
    #[tokio::test]
    async fn test_concurrent_creation_respects_capacity() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let mut user_ids = Vec::new();
        for i in 0..3 {
            let u = user_fixture(&format!("user{}", i), 1)
                .insert(&db)
                .await
                .unwrap();
            user_ids.push(u.id);
        }
        let config = occupancy_config_fixture(node.id, 2, GB);

        let mut handles = Vec::new();
        for user_id in user_ids {
            let db = db.clone();
            let config = config.clone();
            let node_id = node.id;
            handles.push(tokio::spawn(async move {
                create_by_occupancy_config(&db, user_id, node_id, &config).await
            }));
        }

        let mut ok = 0;
        let mut capacity_errors = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => {
                    let panel_err = e.downcast_ref::<PanelError>().unwrap();
                    assert!(panel_err.is_capacity_error());
                    capacity_errors += 1;
                }
            }
        }
        assert_eq!(ok, 2);
        assert_eq!(capacity_errors, 1);
    }

    #[tokio::test]
    async fn test_incr_traffic_flips_out_of_traffic() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let user = user_fixture("alice", 1).insert(&db).await.unwrap();
        let config = occupancy_config_fixture(node.id, 1, GB);

        create_by_occupancy_config(&db, user.id, node.id, &config)
            .await
            .unwrap();

        // 额度以内不翻转
        let flipped = check_and_incr_traffic(&db, user.id, node.id, GB / 2)
            .await
            .unwrap();
        assert!(!flipped);

        // 超出额度后翻转，记录不再活跃
        let flipped = check_and_incr_traffic(&db, user.id, node.id, GB)
            .await
            .unwrap();
        assert!(flipped);

        let active = active_occupancies_for_node(&db, node.id).await.unwrap();
        assert!(active.is_empty());

        // 耗尽后继续结转不再命中任何记录
        let flipped = check_and_incr_traffic(&db, user.id, node.id, GB)
            .await
            .unwrap();
        assert!(!flipped);
    }

    #[tokio::test]
    async fn test_snapshot_freezes_config() {
        let db = test_db().await;
        let node = node_fixture("n1", "ss").insert(&db).await.unwrap();
        let user = user_fixture("alice", 1).insert(&db).await.unwrap();

        let config = occupancy_config_fixture(node.id, 1, 5 * GB);
        let record = create_by_occupancy_config(&db, user.id, node.id, &config)
            .await
            .unwrap();

        let snapshot: crate::entity::occupancy_config::Model =
            serde_json::from_str(&record.config_snapshot).unwrap();
        assert_eq!(snapshot.occupancy_traffic, 5 * GB);
        assert_eq!(snapshot.max_occupancy_user_count, 1);
        assert_eq!(record.occupancy_traffic, 5 * GB);
        assert_eq!(record.used_traffic, 0);
    }
}
