use anyhow::Result;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use sea_orm::ConnectionTrait;
use serde_json::{json, Value};

use crate::eligibility;
use crate::entity::{proxy_node, user};
use crate::node_config::{self, ProtocolConfig};
use crate::relay_config;

/// 订阅输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubType {
    /// 链接逐行拼接后整体 base64，通用客户端
    Normal,
    /// 结构化逐节点列表，clash 类客户端
    Clash,
}

impl SubType {
    pub fn parse(s: &str) -> SubType {
        match s {
            "clash" => SubType::Clash,
            _ => SubType::Normal,
        }
    }
}

/// 一个连接入口：直连为节点自身，中转为 (中转主机, 中转端口)
struct LinkTarget {
    host: String,
    port: i32,
    remark: String,
}

/// 枚举节点的连接入口
///
/// 有生效中转规则时每条规则一个入口（按规则创建顺序），替换为中转
/// 主机/端口/备注；否则一个直连入口。
async fn link_targets<C: ConnectionTrait>(
    conn: &C,
    node: &proxy_node::Model,
    multi_user_port: i32,
) -> Result<Vec<LinkTarget>> {
    let rules = relay_config::effective_relay_rules_for_node(conn, node).await?;
    if rules.is_empty() {
        return Ok(vec![LinkTarget {
            host: node.server.clone(),
            port: multi_user_port,
            remark: node.name.clone(),
        }]);
    }

    Ok(rules
        .into_iter()
        .map(|(rule, relay)| {
            let relay_label = relay.remark.clone().unwrap_or_else(|| relay.name.clone());
            LinkTarget {
                host: relay.server,
                port: rule.relay_port,
                remark: format!("{}-{}", node.name, relay_label),
            }
        })
        .collect())
}

/// 按协议类型渲染连接字符串
fn render_uri(
    node: &proxy_node::Model,
    config: &ProtocolConfig,
    user: &user::Model,
    target: &LinkTarget,
) -> String {
    match config {
        ProtocolConfig::Ss(c) => {
            let userinfo =
                URL_SAFE_NO_PAD.encode(format!("{}:{}", c.method, user.proxy_password));
            format!(
                "ss://{}@{}:{}#{}",
                userinfo, target.host, target.port, target.remark
            )
        }
        ProtocolConfig::Trojan(_) => match node.node_type.as_str() {
            "vmess" => {
                let payload = json!({
                    "v": "2",
                    "ps": target.remark,
                    "add": target.host,
                    "port": target.port,
                    "id": user.proxy_password,
                    "aid": "0",
                    "net": "tcp",
                    "type": "none",
                    "tls": "tls",
                });
                format!("vmess://{}", STANDARD.encode(payload.to_string()))
            }
            "vless" => format!(
                "vless://{}@{}:{}?encryption=none#{}",
                user.proxy_password, target.host, target.port, target.remark
            ),
            _ => format!(
                "trojan://{}@{}:{}#{}",
                user.proxy_password, target.host, target.port, target.remark
            ),
        },
    }
}

/// clash 类客户端的结构化条目
fn render_clash_entry(
    node: &proxy_node::Model,
    config: &ProtocolConfig,
    user: &user::Model,
    target: &LinkTarget,
) -> Value {
    match config {
        ProtocolConfig::Ss(c) => json!({
            "name": target.remark,
            "type": "ss",
            "server": target.host,
            "port": target.port,
            "cipher": c.method,
            "password": user.proxy_password,
            "udp": node.enable_udp,
        }),
        ProtocolConfig::Trojan(_) => match node.node_type.as_str() {
            "vmess" => json!({
                "name": target.remark,
                "type": "vmess",
                "server": target.host,
                "port": target.port,
                "uuid": user.proxy_password,
                "alterId": 0,
                "cipher": "auto",
                "udp": node.enable_udp,
            }),
            "vless" => json!({
                "name": target.remark,
                "type": "vless",
                "server": target.host,
                "port": target.port,
                "uuid": user.proxy_password,
                "udp": node.enable_udp,
            }),
            _ => json!({
                "name": target.remark,
                "type": "trojan",
                "server": target.host,
                "port": target.port,
                "password": user.proxy_password,
                "udp": node.enable_udp,
            }),
        },
    }
}

/// 为用户生成订阅输出
///
/// 节点顺序按持久化的 sequence 字段稳定排序（由可用性计算保证）。
pub async fn generate_subscription<C: ConnectionTrait>(
    conn: &C,
    user: &user::Model,
    sub_type: SubType,
) -> Result<String> {
    let nodes = eligibility::get_active_nodes_for_user(conn, user).await?;

    let mut links: Vec<String> = Vec::new();
    let mut clash_entries: Vec<Value> = Vec::new();

    for node in &nodes {
        let config = node_config::load_protocol_config(conn, node).await?;
        let targets = link_targets(conn, node, config.multi_user_port()).await?;
        for target in &targets {
            match sub_type {
                SubType::Normal => links.push(render_uri(node, &config, user, target)),
                SubType::Clash => {
                    clash_entries.push(render_clash_entry(node, &config, user, target))
                }
            }
        }
    }

    match sub_type {
        SubType::Normal => Ok(STANDARD.encode(links.join("\n"))),
        SubType::Clash => Ok(json!({ "proxies": clash_entries }).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        node_fixture, relay_node_fixture, relay_rule_fixture, ss_config_fixture, test_db,
        trojan_config_fixture, user_fixture,
    };
    use sea_orm::{ActiveModelTrait, Set};

    #[tokio::test]
    async fn test_direct_ss_link() {
        let db = test_db().await;
        let node = node_fixture("HK-1", "ss").insert(&db).await.unwrap();
        ss_config_fixture(node.id).insert(&db).await.unwrap();
        let mut user = user_fixture("alice", 1);
        user.proxy_password = Set("secret".to_string());
        let user = user.insert(&db).await.unwrap();

        let blob = generate_subscription(&db, &user, SubType::Normal)
            .await
            .unwrap();
        let body = String::from_utf8(STANDARD.decode(blob).unwrap()).unwrap();

        let userinfo = URL_SAFE_NO_PAD.encode("aes-256-gcm:secret");
        assert_eq!(
            body,
            format!("ss://{}@proxy.example.com:8388#HK-1", userinfo)
        );
    }

    // 有生效中转规则时按规则展开，替换中转主机/端口/备注
    #[tokio::test]
    async fn test_relay_substitution() {
        let db = test_db().await;
        let node = node_fixture("HK-1", "ss").insert(&db).await.unwrap();
        ss_config_fixture(node.id).insert(&db).await.unwrap();

        let mut relay = relay_node_fixture("jp-relay");
        relay.server = Set("relay.example.com".to_string());
        relay.remark = Set(Some("JP".to_string()));
        let relay = relay.insert(&db).await.unwrap();

        relay_rule_fixture(node.id, relay.id, 20001)
            .insert(&db)
            .await
            .unwrap();
        relay_rule_fixture(node.id, relay.id, 20002)
            .insert(&db)
            .await
            .unwrap();

        let user = user_fixture("alice", 1).insert(&db).await.unwrap();
        let blob = generate_subscription(&db, &user, SubType::Normal)
            .await
            .unwrap();
        let body = String::from_utf8(STANDARD.decode(blob).unwrap()).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        // 规则创建顺序展开，不再出现直连入口
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("@relay.example.com:20001#HK-1-JP"));
        assert!(lines[1].contains("@relay.example.com:20002#HK-1-JP"));
    }

    #[tokio::test]
    async fn test_clash_output_is_structured() {
        let db = test_db().await;
        let ss_node = node_fixture("HK-1", "ss").insert(&db).await.unwrap();
        ss_config_fixture(ss_node.id).insert(&db).await.unwrap();
        let trojan_node = node_fixture("US-1", "trojan").insert(&db).await.unwrap();
        trojan_config_fixture(trojan_node.id).insert(&db).await.unwrap();

        let user = user_fixture("alice", 1).insert(&db).await.unwrap();
        let out = generate_subscription(&db, &user, SubType::Clash)
            .await
            .unwrap();

        let doc: Value = serde_json::from_str(&out).unwrap();
        let proxies = doc["proxies"].as_array().unwrap();
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[0]["type"], "ss");
        assert_eq!(proxies[0]["cipher"], "aes-256-gcm");
        assert_eq!(proxies[1]["type"], "trojan");
        assert_eq!(proxies[1]["port"], 8443);
    }

    #[tokio::test]
    async fn test_trojan_and_vmess_links() {
        let db = test_db().await;
        let trojan_node = node_fixture("T", "trojan").insert(&db).await.unwrap();
        trojan_config_fixture(trojan_node.id).insert(&db).await.unwrap();
        let vmess_node = node_fixture("V", "vmess").insert(&db).await.unwrap();
        trojan_config_fixture(vmess_node.id).insert(&db).await.unwrap();

        let mut user = user_fixture("alice", 1);
        user.proxy_password = Set("uuid-1234".to_string());
        let user = user.insert(&db).await.unwrap();

        let blob = generate_subscription(&db, &user, SubType::Normal)
            .await
            .unwrap();
        let body = String::from_utf8(STANDARD.decode(blob).unwrap()).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "trojan://uuid-1234@proxy.example.com:8443#T");
        assert!(lines[1].starts_with("vmess://"));
        let payload = STANDARD
            .decode(lines[1].trim_start_matches("vmess://"))
            .unwrap();
        let payload: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(payload["id"], "uuid-1234");
        assert_eq!(payload["port"], 8443);
    }
}
