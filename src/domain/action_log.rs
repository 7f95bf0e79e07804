// ==========================================
// 订单排产系统 - 操作日志领域模型
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪,看板最近操作列表
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    // ===== 主键 =====
    pub action_id: String,        // 日志ID (UUID)
    pub order_id: Option<String>, // 关联订单 (参数更新等操作可为None)
    pub owner_id: Option<String>, // 归属用户
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,    // 创建订单
    UpdateStatus,   // 订单状态变更
    StartNextOrder, // 启动队首订单
    MoveOrder,      // 调整队列位置
    DeleteOrder,    // 删除订单
    UpdateSettings, // 更新生产参数
}

// ==========================================
// ActionType 辅助方法
// ==========================================
impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateOrder => "CreateOrder",
            ActionType::UpdateStatus => "UpdateStatus",
            ActionType::StartNextOrder => "StartNextOrder",
            ActionType::MoveOrder => "MoveOrder",
            ActionType::DeleteOrder => "DeleteOrder",
            ActionType::UpdateSettings => "UpdateSettings",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CreateOrder" => Some(ActionType::CreateOrder),
            "UpdateStatus" => Some(ActionType::UpdateStatus),
            "StartNextOrder" => Some(ActionType::StartNextOrder),
            "MoveOrder" => Some(ActionType::MoveOrder),
            "DeleteOrder" => Some(ActionType::DeleteOrder),
            "UpdateSettings" => Some(ActionType::UpdateSettings),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `action_id`: 日志ID (通常使用UUID)
    /// - `action_type`: 操作类型
    /// - `actor`: 操作人
    pub fn new(action_id: String, action_type: ActionType, actor: String) -> Self {
        Self {
            action_id,
            order_id: None,
            owner_id: None,
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor,
            payload_json: None,
            detail: None,
        }
    }

    /// 关联订单与归属用户
    pub fn with_order(mut self, owner_id: &str, order_id: &str) -> Self {
        self.owner_id = Some(owner_id.to_string());
        self.order_id = Some(order_id.to_string());
        self
    }

    /// 仅关联归属用户 (无订单的操作，如参数更新)
    pub fn with_owner(mut self, owner_id: &str) -> Self {
        self.owner_id = Some(owner_id.to_string());
        self
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    /// 设置详细描述
    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }

    /// 生成唯一ID (用于显示)
    pub fn get_display_id(&self) -> String {
        let order_part = self.order_id.as_deref().unwrap_or("SYSTEM");
        let short = if self.action_id.len() >= 8 {
            &self.action_id[..8]
        } else {
            self.action_id.as_str()
        };
        format!("{}_{}", order_part, short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_roundtrip() {
        for t in [
            ActionType::CreateOrder,
            ActionType::UpdateStatus,
            ActionType::StartNextOrder,
            ActionType::MoveOrder,
            ActionType::DeleteOrder,
            ActionType::UpdateSettings,
        ] {
            assert_eq!(ActionType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(ActionType::from_str("Unknown"), None);
    }

    #[test]
    fn test_builder_chain() {
        let log = ActionLog::new(
            "a1b2c3d4e5".to_string(),
            ActionType::MoveOrder,
            "user".to_string(),
        )
        .with_order("user-1", "order-1")
        .with_payload(&serde_json::json!({"from": 3, "to": 1}))
        .with_detail("位置 3 -> 1".to_string());

        assert_eq!(log.order_id.as_deref(), Some("order-1"));
        assert_eq!(log.owner_id.as_deref(), Some("user-1"));
        assert!(log.payload_json.is_some());
        assert_eq!(log.get_display_id(), "order-1_a1b2c3d4");
    }
}
