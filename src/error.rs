use std::fmt;

/// 核心业务错误
///
/// 配置类错误（节点缺少协议配置等）属于致命错误，直接返回给调用方；
/// 容量类错误（占用数已满）属于正常业务拒绝，映射为 4xx。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// 节点不存在
    NodeNotFound { node_id: i64 },
    /// 中转节点不存在
    RelayNodeNotFound { relay_node_id: i64 },
    /// 节点缺少与其协议类型匹配的配置
    ProtocolConfigMissing { node_id: i64, node_type: String },
    /// 不支持的协议类型
    UnknownNodeType { node_id: i64, node_type: String },
    /// 节点未配置占用策略
    OccupancyConfigMissing { node_id: i64 },
    /// 占用策略的最大占用人数为 0，节点不可被占用
    ZeroOccupancyCapacity { node_id: i64 },
    /// 节点占用人数已达上限
    OccupancyCapacityExceeded { node_id: i64, max: i32 },
}

impl PanelError {
    /// 是否为业务容量拒绝（而非服务端配置错误）
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            PanelError::ZeroOccupancyCapacity { .. }
                | PanelError::OccupancyCapacityExceeded { .. }
        )
    }
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::NodeNotFound { node_id } => {
                write!(f, "节点 #{} 不存在", node_id)
            }
            PanelError::RelayNodeNotFound { relay_node_id } => {
                write!(f, "中转节点 #{} 不存在", relay_node_id)
            }
            PanelError::ProtocolConfigMissing { node_id, node_type } => {
                write!(f, "节点 #{} (类型 {}) 缺少协议配置", node_id, node_type)
            }
            PanelError::UnknownNodeType { node_id, node_type } => {
                write!(f, "节点 #{} 的协议类型无效: {}", node_id, node_type)
            }
            PanelError::OccupancyConfigMissing { node_id } => {
                write!(f, "节点 #{} 未配置占用策略", node_id)
            }
            PanelError::ZeroOccupancyCapacity { node_id } => {
                write!(f, "节点 #{} 的最大占用人数为 0，不可被占用", node_id)
            }
            PanelError::OccupancyCapacityExceeded { node_id, max } => {
                write!(f, "节点 #{} 占用人数已达上限 {}", node_id, max)
            }
        }
    }
}

impl std::error::Error for PanelError {}
