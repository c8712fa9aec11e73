use anyhow::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entity::{proxy_node, user, ProxyNode, User};
use crate::occupancy;

/// 计算某节点的可用用户集合
///
/// 节点禁用 => 空集。被管理员停用（user.enable = false）的用户在任何
/// 分支都不可用，包括占用者。存在活跃占用 => 仅占用者可用（等级门槛
/// 失效，节点变为独占）。否则按等级门槛 user.level >= node.level。
pub async fn get_users_for_node<C: ConnectionTrait>(
    conn: &C,
    node: &proxy_node::Model,
) -> Result<Vec<user::Model>> {
    if !node.enable {
        return Ok(Vec::new());
    }

    let occupancies = occupancy::active_occupancies_for_node(conn, node.id).await?;
    if !occupancies.is_empty() {
        let occupant_ids: Vec<i64> = occupancies.iter().map(|o| o.user_id).collect();
        let users = User::find()
            .filter(user::Column::Id.is_in(occupant_ids))
            .filter(user::Column::Enable.eq(true))
            .order_by_asc(user::Column::Id)
            .all(conn)
            .await?;
        return Ok(users);
    }

    let users = User::find()
        .filter(user::Column::Enable.eq(true))
        .filter(user::Column::Level.gte(node.level))
        .order_by_asc(user::Column::Id)
        .all(conn)
        .await?;
    Ok(users)
}

/// 计算某用户可用的节点列表（订阅用，按 sequence 稳定排序）
///
/// 停用的用户得到空集。基础集合 = 已启用且等级达标的节点；被他人
/// 占用的节点剔除；本人占用的节点强制并入，即使等级不够也可用。
pub async fn get_active_nodes_for_user<C: ConnectionTrait>(
    conn: &C,
    user: &user::Model,
) -> Result<Vec<proxy_node::Model>> {
    if !user.enable {
        return Ok(Vec::new());
    }

    let nodes = ProxyNode::find()
        .filter(proxy_node::Column::Enable.eq(true))
        .order_by_asc(proxy_node::Column::Sequence)
        .order_by_asc(proxy_node::Column::Id)
        .all(conn)
        .await?;

    let active = occupancy::all_active_occupancies(conn).await?;

    let mut result = Vec::new();
    for node in nodes {
        let occupants: Vec<i64> = active
            .iter()
            .filter(|o| o.node_id == node.id)
            .map(|o| o.user_id)
            .collect();

        if occupants.is_empty() {
            if user.level >= node.level {
                result.push(node);
            }
        } else if occupants.contains(&user.id) {
            result.push(node);
        }
    }
    Ok(result)
}
