use anyhow::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::entity::{
    proxy_node, relay_node, relay_rule, ProxyNode, RelayRule,
};
use crate::node_config;

/// 中转节点转发表中的一条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEntry {
    pub label: String,
    pub listen: String,
    pub listen_type: String,
    pub transport_type: String,
    pub tcp_remotes: Vec<String>,
    pub udp_remotes: Vec<String>,
}

/// 查询指向某代理节点的生效中转规则（两端节点均启用），按创建顺序
pub async fn effective_relay_rules_for_node<C: ConnectionTrait>(
    conn: &C,
    node: &proxy_node::Model,
) -> Result<Vec<(relay_rule::Model, relay_node::Model)>> {
    if !node.enable {
        return Ok(Vec::new());
    }
    let rules = RelayRule::find()
        .filter(relay_rule::Column::ProxyNodeId.eq(node.id))
        .find_also_related(crate::entity::RelayNode)
        .order_by_asc(relay_rule::Column::Id)
        .all(conn)
        .await?;

    Ok(rules
        .into_iter()
        .filter_map(|(rule, relay)| match relay {
            Some(relay) if relay.enable => Some((rule, relay)),
            _ => None,
        })
        .collect())
}

/// 计算中转到代理节点的 TCP 远端地址
///
/// 配置了非 raw 隧道时走隧道端点，ws 族传输加 scheme 前缀；
/// 否则直连多用户端口。
pub fn tcp_remote_for_node(node: &proxy_node::Model, multi_user_port: i32) -> String {
    let tunnel_port = match (node.ehco_listen_port, node.ehco_transport_type.as_deref()) {
        (Some(port), Some(t)) if t != "raw" => Some((port, t)),
        _ => None,
    };

    match tunnel_port {
        Some((port, "ws")) => format!("ws://{}:{}", node.server, port),
        Some((port, "wss")) | Some((port, "mwss")) => format!("wss://{}:{}", node.server, port),
        Some((port, _)) => format!("{}:{}", node.server, port),
        None => format!("{}:{}", node.server, multi_user_port),
    }
}

/// 为中转节点生成完整转发表：逐规则生成候选条目后按监听地址合并
pub async fn build_relay_config<C: ConnectionTrait>(
    conn: &C,
    relay: &relay_node::Model,
) -> Result<Vec<RelayEntry>> {
    let rules = RelayRule::find()
        .filter(relay_rule::Column::RelayNodeId.eq(relay.id))
        .order_by_asc(relay_rule::Column::Id)
        .all(conn)
        .await?;

    let mut entries = Vec::new();
    for rule in rules {
        let node = match ProxyNode::find_by_id(rule.proxy_node_id).one(conn).await? {
            Some(n) if n.enable && relay.enable => n,
            _ => continue,
        };
        let protocol_config = node_config::load_protocol_config(conn, &node).await?;
        let multi_user_port = protocol_config.multi_user_port();

        let mut udp_remotes = Vec::new();
        if node.enable_udp {
            udp_remotes.push(format!("{}:{}", node.server, multi_user_port));
        }

        entries.push(RelayEntry {
            label: node.name.clone(),
            listen: format!("0.0.0.0:{}", rule.relay_port),
            listen_type: rule.listen_type.clone(),
            transport_type: rule.transport_type.clone(),
            tcp_remotes: vec![tcp_remote_for_node(&node, multi_user_port)],
            udp_remotes,
        });
    }

    Ok(merge_relay_entries(entries))
}

/// 按监听地址合并条目
///
/// 单成员分组原样保留；多成员分组合并为一条：标签按组内顺序用连字符
/// 拼接，remotes 依次串接（保留重复），监听/传输类型取第一个成员
/// （不校验组内类型一致，首成员类型生效）。
pub fn merge_relay_entries(entries: Vec<RelayEntry>) -> Vec<RelayEntry> {
    let mut groups: Vec<(String, Vec<RelayEntry>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(listen, _)| *listen == entry.listen) {
            Some((_, members)) => members.push(entry),
            None => groups.push((entry.listen.clone(), vec![entry])),
        }
    }

    groups
        .into_iter()
        .map(|(listen, mut members)| {
            if members.len() == 1 {
                return members.pop().unwrap();
            }
            let label = members
                .iter()
                .map(|m| m.label.as_str())
                .collect::<Vec<_>>()
                .join("-");
            let mut tcp_remotes = Vec::new();
            let mut udp_remotes = Vec::new();
            for member in &members {
                tcp_remotes.extend(member.tcp_remotes.iter().cloned());
                udp_remotes.extend(member.udp_remotes.iter().cloned());
            }
            RelayEntry {
                label,
                listen,
                listen_type: members[0].listen_type.clone(),
                transport_type: members[0].transport_type.clone(),
                tcp_remotes,
                udp_remotes,
            }
        })
        .collect()
}
