// ==========================================
// 订单排产系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 状态机: pending <-> in-progress -> completed/cancelled
// 序列化格式: kebab-case (与数据库及前端一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,    // 待生产(排队中)
    InProgress, // 生产中
    Completed,  // 已完成
    Cancelled,  // 已取消
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::InProgress => write!(f, "in-progress"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl OrderStatus {
    /// 从字符串解析订单状态
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "in-progress" => OrderStatus::InProgress,
            "completed" => OrderStatus::Completed,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in-progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// 是否为活跃状态(占用队列位置)
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::InProgress)
    }

    /// 是否为终止状态(不可再转移)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::InProgress,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_str(status.to_db_str()), status);
        }
    }

    #[test]
    fn test_order_status_serde_format() {
        // 数据库与前端约定的 kebab-case 格式
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");

        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn test_order_status_unknown_falls_back_to_pending() {
        assert_eq!(OrderStatus::from_str("shipped"), OrderStatus::Pending);
    }

    #[test]
    fn test_active_and_terminal_partition() {
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::InProgress.is_active());
        assert!(!OrderStatus::Completed.is_active());
        assert!(!OrderStatus::Cancelled.is_active());

        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::InProgress.is_terminal());
    }
}
