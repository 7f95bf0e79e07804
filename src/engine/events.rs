// ==========================================
// 订单排产系统 - 引擎层事件发布
// ==========================================
// 职责: 定义订单事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，外层 (通知/推送) 实现适配器
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 订单事件类型
// ==========================================

/// 订单事件触发类型
///
/// Engine 层定义的事件类型，用于通知下游 (看板刷新、客户通知等)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventType {
    /// 订单创建
    OrderCreated,
    /// 订单状态变更
    OrderStatusChanged,
    /// 队列位置调整
    QueueReordered,
    /// 订单删除
    OrderDeleted,
    /// 生产参数更新
    SettingsUpdated,
}

impl OrderEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            OrderEventType::OrderCreated => "OrderCreated",
            OrderEventType::OrderStatusChanged => "OrderStatusChanged",
            OrderEventType::QueueReordered => "QueueReordered",
            OrderEventType::OrderDeleted => "OrderDeleted",
            OrderEventType::SettingsUpdated => "SettingsUpdated",
        }
    }
}

/// 订单事件
///
/// Engine 层发布的事件，包含归属用户、订单与事件负载
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// 归属用户
    pub owner_id: String,
    /// 关联订单 (参数更新等无订单事件为 None)
    pub order_id: Option<String>,
    /// 事件类型
    pub event_type: OrderEventType,
    /// 事件来源描述
    pub source: Option<String>,
    /// 事件发生时刻
    pub occurred_at: NaiveDateTime,
    /// 事件负载 (JSON)
    pub payload: Option<serde_json::Value>,
}

impl OrderEvent {
    /// 创建订单级事件
    pub fn for_order(
        owner_id: String,
        order_id: String,
        event_type: OrderEventType,
        source: Option<String>,
    ) -> Self {
        Self {
            owner_id,
            order_id: Some(order_id),
            event_type,
            source,
            occurred_at: chrono::Local::now().naive_local(),
            payload: None,
        }
    }

    /// 创建用户级事件 (无关联订单)
    pub fn for_owner(owner_id: String, event_type: OrderEventType, source: Option<String>) -> Self {
        Self {
            owner_id,
            order_id: None,
            event_type,
            source,
            occurred_at: chrono::Local::now().naive_local(),
            payload: None,
        }
    }

    /// 附加事件负载
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload = serde_json::to_value(payload).ok();
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 订单事件发布者 Trait
///
/// Engine 层定义，外层实现
/// 通过 trait 实现依赖倒置，解除 Engine 对外层的直接依赖
pub trait OrderEventPublisher: Send + Sync {
    /// 发布订单事件
    ///
    /// # 参数
    /// - `event`: 订单事件
    ///
    /// # 返回
    /// - `Ok(task_id)`: 任务 ID（如果支持）或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: OrderEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl OrderEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: OrderEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - owner_id={}, event_type={}",
            event.owner_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn OrderEventPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn OrderEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn OrderEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: OrderEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - owner_id={}, event_type={}",
                    event.owner_id,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
