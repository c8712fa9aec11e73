pub mod occupancy_config;
pub mod proxy_node;
pub mod relay_node;
pub mod relay_rule;
pub mod ss_config;
pub mod trojan_config;
pub mod user;
pub mod user_occupancy;
pub mod user_traffic_log;

pub use occupancy_config::Entity as OccupancyConfig;
pub use proxy_node::Entity as ProxyNode;
pub use relay_node::Entity as RelayNode;
pub use relay_rule::Entity as RelayRule;
pub use ss_config::Entity as SsConfig;
pub use trojan_config::Entity as TrojanConfig;
pub use user::Entity as User;
pub use user_occupancy::Entity as UserOccupancy;
pub use user_traffic_log::Entity as UserTrafficLog;
