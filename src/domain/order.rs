// ==========================================
// 订单排产系统 - 订单领域模型
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// OrderItem - 订单产品行
// ==========================================
// minutes_per_unit 为下单时从生产参数快照的值，
// 之后修改参数不回写已有订单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_key: String,      // 产品类型标识
    pub item_name: String,     // 产品显示名称
    pub quantity: i64,         // 数量 (>= 0)
    pub minutes_per_unit: i64, // 每单位生产时长快照 (分钟)
}

impl OrderItem {
    /// 本行合计生产时长 (分钟)
    pub fn total_minutes(&self) -> i64 {
        self.quantity * self.minutes_per_unit
    }
}

// ==========================================
// Order - 生产订单
// ==========================================
// 对齐: production_order / production_order_item 表
// 红线: total_production_minutes 与 estimated_completion_at
//       在创建时一次性计算，之后不随参数修改而变化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    // ===== 主键与归属 =====
    pub order_id: String, // UUID
    pub owner_id: String, // 归属用户

    // ===== 客户信息 =====
    pub customer_name: String,
    pub customer_email: String,

    // ===== 产品行 (快照) =====
    pub items: Vec<OrderItem>,

    // ===== 排产结果 =====
    pub status: OrderStatus,
    pub total_production_minutes: i64,          // 创建时计算，不可变
    pub estimated_completion_at: NaiveDateTime, // 创建时推算，不可变
    pub queue_position: i64,                    // 活跃订单间稠密 1..N

    // ===== 生产计时 =====
    pub production_started_at: Option<NaiveDateTime>, // 进入生产中时刻
    pub production_minutes_accumulated: i64,          // 已累计生产分钟 (单调不减)

    // ===== 审计时间 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Order {
    /// 创建新订单 (初始状态 pending)
    ///
    /// # 参数
    /// - `owner_id`: 归属用户
    /// - `customer_name` / `customer_email`: 客户信息
    /// - `items`: 产品行 (单位时长已快照)
    /// - `total_production_minutes`: 合计生产时长
    /// - `estimated_completion_at`: 推算完成时刻
    /// - `queue_position`: 队列位置 (活跃订单数 + 1)
    /// - `now`: 创建时刻
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: String,
        customer_name: String,
        customer_email: String,
        items: Vec<OrderItem>,
        total_production_minutes: i64,
        estimated_completion_at: NaiveDateTime,
        queue_position: i64,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            owner_id,
            customer_name,
            customer_email,
            items,
            status: OrderStatus::Pending,
            total_production_minutes,
            estimated_completion_at,
            queue_position,
            production_started_at: None,
            production_minutes_accumulated: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 短ID (展示用，取 UUID 前 8 位)
    pub fn short_id(&self) -> &str {
        if self.order_id.len() >= 8 {
            &self.order_id[..8]
        } else {
            &self.order_id
        }
    }

    /// 实际生产时长 (分钟，展示用派生值)
    ///
    /// # 返回
    /// 已累计分钟 + 当前生产中的已过分钟 (非生产中订单只取累计值)
    pub fn actual_production_minutes(&self, now: NaiveDateTime) -> i64 {
        let mut total = self.production_minutes_accumulated;
        if self.status == OrderStatus::InProgress {
            if let Some(started) = self.production_started_at {
                total += (now - started).num_minutes().max(0);
            }
        }
        total
    }

    /// 产品行摘要 (如 "2x Item 1, 1x Item 2")
    pub fn items_summary(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{}x {}", i.quantity, i.item_name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 生成订单完成通知草稿 (仅文本，不发送)
    ///
    /// 适用于已完成订单，由调用方决定何时展示
    pub fn completion_notice(&self) -> CompletionNotice {
        CompletionNotice {
            to: self.customer_email.clone(),
            subject: format!("Order {} Completion", self.short_id()),
            body: format!(
                "Dear {},\n\n\
                 We're pleased to inform you that your order ({}) has been completed \
                 and is ready for pickup/delivery.\n\n\
                 Thank you for your business!\n\n\
                 Best regards,\nOrder Production Team",
                self.customer_name,
                self.items_summary()
            ),
        }
    }
}

// ==========================================
// CompletionNotice - 完成通知草稿
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionNotice {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_order() -> Order {
        let now = NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Order::new(
            "user-1".to_string(),
            "张三".to_string(),
            "zhangsan@example.com".to_string(),
            vec![
                OrderItem {
                    item_key: "item-1".to_string(),
                    item_name: "Item 1".to_string(),
                    quantity: 2,
                    minutes_per_unit: 10,
                },
                OrderItem {
                    item_key: "item-2".to_string(),
                    item_name: "Item 2".to_string(),
                    quantity: 1,
                    minutes_per_unit: 15,
                },
            ],
            35,
            now,
            1,
            now,
        )
    }

    #[test]
    fn test_new_order_defaults() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.production_minutes_accumulated, 0);
        assert!(order.production_started_at.is_none());
        assert_eq!(order.queue_position, 1);
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn test_item_total_minutes() {
        let order = sample_order();
        assert_eq!(order.items[0].total_minutes(), 20);
        assert_eq!(order.items[1].total_minutes(), 15);
    }

    #[test]
    fn test_actual_minutes_for_in_progress() {
        let mut order = sample_order();
        order.status = OrderStatus::InProgress;
        order.production_minutes_accumulated = 5;
        order.production_started_at = Some(
            NaiveDate::from_ymd_opt(2024, 1, 9)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap(),
        );
        let now = NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(11, 10, 0)
            .unwrap();
        assert_eq!(order.actual_production_minutes(now), 15, "累计5 + 进行中10");
    }

    #[test]
    fn test_actual_minutes_ignores_span_when_not_in_progress() {
        let mut order = sample_order();
        order.production_minutes_accumulated = 7;
        // 残留的 started_at 不参与计算
        order.production_started_at = Some(order.created_at);
        let later = order.created_at + chrono::Duration::minutes(30);
        assert_eq!(order.actual_production_minutes(later), 7);
    }

    #[test]
    fn test_completion_notice_content() {
        let order = sample_order();
        let notice = order.completion_notice();
        assert_eq!(notice.to, "zhangsan@example.com");
        assert!(notice.subject.starts_with("Order "));
        assert!(notice.subject.ends_with(" Completion"));
        assert!(notice.body.contains("Dear 张三"));
        assert!(notice.body.contains("2x Item 1, 1x Item 2"));
    }

    #[test]
    fn test_items_summary_format() {
        let order = sample_order();
        assert_eq!(order.items_summary(), "2x Item 1, 1x Item 2");
    }
}
