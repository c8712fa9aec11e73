use anyhow::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};

use crate::eligibility;
use crate::entity::{proxy_node, ss_config, trojan_config, user, SsConfig, TrojanConfig};
use crate::error::PanelError;
use crate::relay_config;

/// 协议配置标签联合，由节点的协议类型选择对应的分支
///
/// ss/ssr 走 shadowsocks 配置；trojan/vmess/vless 共用 trojan 配置行
/// （端口 + 回落地址，用户凭据取自 proxy_password）。
#[derive(Debug, Clone)]
pub enum ProtocolConfig {
    Ss(ss_config::Model),
    Trojan(trojan_config::Model),
}

impl ProtocolConfig {
    pub fn enable(&self) -> bool {
        match self {
            ProtocolConfig::Ss(c) => c.enable,
            ProtocolConfig::Trojan(c) => c.enable,
        }
    }

    pub fn multi_user_port(&self) -> i32 {
        match self {
            ProtocolConfig::Ss(c) => c.multi_user_port,
            ProtocolConfig::Trojan(c) => c.multi_user_port,
        }
    }
}

/// 按节点协议类型加载协议配置，缺失视为节点配置错误（致命，不静默跳过）
pub async fn load_protocol_config<C: ConnectionTrait>(
    conn: &C,
    node: &proxy_node::Model,
) -> Result<ProtocolConfig> {
    match node.node_type.as_str() {
        "ss" | "ssr" => {
            let config = SsConfig::find()
                .filter(ss_config::Column::NodeId.eq(node.id))
                .one(conn)
                .await?
                .ok_or(PanelError::ProtocolConfigMissing {
                    node_id: node.id,
                    node_type: node.node_type.clone(),
                })?;
            Ok(ProtocolConfig::Ss(config))
        }
        "trojan" | "vmess" | "vless" => {
            let config = TrojanConfig::find()
                .filter(trojan_config::Column::NodeId.eq(node.id))
                .one(conn)
                .await?
                .ok_or(PanelError::ProtocolConfigMissing {
                    node_id: node.id,
                    node_type: node.node_type.clone(),
                })?;
            Ok(ProtocolConfig::Trojan(config))
        }
        _ => Err(PanelError::UnknownNodeType {
            node_id: node.id,
            node_type: node.node_type.clone(),
        }
        .into()),
    }
}

/// 为节点合成完整的代理服务配置文档
///
/// 节点禁用时 users 为空，但入站块仍然下发，保证边缘进程可以继续心跳。
pub async fn build_proxy_config<C: ConnectionTrait>(
    conn: &C,
    node: &proxy_node::Model,
) -> Result<Value> {
    let protocol_config = load_protocol_config(conn, node).await?;

    let users = if node.enable {
        eligibility::get_users_for_node(conn, node).await?
    } else {
        Vec::new()
    };

    // 有直连或任一生效的 raw 中转规则指向本节点时监听全网卡，
    // 否则只监听环回，强制流量走中转隧道
    let rules = relay_config::effective_relay_rules_for_node(conn, node).await?;
    let has_raw_relay = rules.iter().any(|(rule, _)| rule.transport_type == "raw");
    let listen = if node.enable_direct || has_raw_relay {
        "0.0.0.0"
    } else {
        "127.0.0.1"
    };

    let inbound = build_inbound(node, &protocol_config, listen);
    let user_entries = build_user_entries(node, &protocol_config, &users);

    let mut doc = json!({
        "log": {
            "loglevel": "warning",
            "access": "none",
        },
        "api": {
            "tag": "api",
            "listen": "127.0.0.1:8080",
            "services": ["HandlerService", "StatsService"],
        },
        "policy": {
            "levels": {
                "0": {"statsUserUplink": true, "statsUserDownlink": true},
            },
            "system": {"statsInboundUplink": true, "statsInboundDownlink": true},
        },
        "inbounds": [inbound],
        "users": user_entries,
    });

    if let Some(ehco) = build_ehco_server_config(node, protocol_config.multi_user_port()) {
        doc["ehco_server_config"] = ehco;
    }

    Ok(doc)
}

fn network(node: &proxy_node::Model) -> &'static str {
    if node.enable_udp {
        "tcp,udp"
    } else {
        "tcp"
    }
}

fn build_inbound(node: &proxy_node::Model, config: &ProtocolConfig, listen: &str) -> Value {
    match config {
        ProtocolConfig::Ss(c) => json!({
            "tag": "ss_proxy",
            "protocol": "shadowsocks",
            "listen": listen,
            "port": c.multi_user_port,
            "settings": {
                "method": c.method,
                "network": network(node),
            },
        }),
        ProtocolConfig::Trojan(c) => {
            // trojan/vmess/vless 共用端口与回落配置，协议名按节点类型下发
            let protocol = match node.node_type.as_str() {
                "vmess" => "vmess",
                "vless" => "vless",
                _ => "trojan",
            };
            json!({
                "tag": format!("{}_proxy", protocol),
                "protocol": protocol,
                "listen": listen,
                "port": c.multi_user_port,
                "settings": {
                    "fallbacks": [{"dest": c.fallback_addr}],
                    "network": network(node),
                },
            })
        }
    }
}

fn build_user_entries(
    node: &proxy_node::Model,
    config: &ProtocolConfig,
    users: &[user::Model],
) -> Vec<Value> {
    users
        .iter()
        .map(|u| {
            let enable = node.enable && config.enable() && u.enable && u.has_traffic_left();
            let mut entry = json!({
                "user_id": u.id,
                "password": u.proxy_password,
                "enable": enable,
                "level": 0,
            });
            if let ProtocolConfig::Ss(c) = config {
                entry["method"] = Value::String(c.method.clone());
            }
            entry
        })
        .collect()
}

/// 节点配置了 ehco 隧道时，生成隧道服务端配置段
///
/// 隧道监听外部地址，转发到本机的多用户端口。
pub fn build_ehco_server_config(node: &proxy_node::Model, multi_user_port: i32) -> Option<Value> {
    let listen_port = node.ehco_listen_port?;
    let listen_host = node.ehco_listen_host.as_deref().unwrap_or("0.0.0.0");
    let transport_type = node.ehco_transport_type.as_deref().unwrap_or("raw");

    let mut udp_remotes: Vec<String> = Vec::new();
    if node.enable_udp {
        udp_remotes.push(format!("127.0.0.1:{}", multi_user_port));
    }

    Some(json!({
        "listen": format!("{}:{}", listen_host, listen_port),
        "listen_type": "raw",
        "transport_type": transport_type,
        "tcp_remotes": [format!("127.0.0.1:{}", multi_user_port)],
        "udp_remotes": udp_remotes,
    }))
}
