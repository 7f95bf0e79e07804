// ==========================================
// 订单排产系统 - 订单生命周期引擎
// ==========================================
// 红线: production_minutes_accumulated 单调不减
// 红线: 终止状态 (completed/cancelled) 不可再转移
// ==========================================
// 职责: 状态转移合法性判定 + 生产计时结算
// 输入: 订单当前状态 + 目标状态 + 当前时刻
// 输出: 转移结果 (新计时字段)，由 API 层落库
// ==========================================
// 状态机:
//   pending <-> in-progress   (暂停/恢复，次数不限)
//   pending / in-progress -> completed | cancelled
// 计时规则:
//   进入 in-progress: production_started_at = now
//   离开 in-progress: accumulated += 本段已过分钟，清空 started_at
// ==========================================

use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use chrono::NaiveDateTime;
use tracing::instrument;

// ==========================================
// TransitionOutcome - 状态转移结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub production_started_at: Option<NaiveDateTime>,
    pub production_minutes_accumulated: i64,
}

// ==========================================
// LifecycleEngine - 订单生命周期引擎
// ==========================================
pub struct LifecycleEngine {
    // 无状态引擎，不需要注入依赖
}

impl LifecycleEngine {
    /// 创建新的订单生命周期引擎
    pub fn new() -> Self {
        Self {}
    }

    /// 判定状态转移是否合法
    ///
    /// 同状态转移视为非法 (无意义，且避免重复进入生产中扰乱计时)
    pub fn can_transition(&self, from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (from, to),
            (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (InProgress, Pending)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    /// 执行状态转移并结算生产计时
    ///
    /// # 参数
    /// - `order`: 当前订单
    /// - `to`: 目标状态
    /// - `now`: 转移时刻
    ///
    /// # 返回
    /// - `Some(TransitionOutcome)`: 转移合法，含结算后的计时字段
    /// - `None`: 转移非法
    ///
    /// 分钟按截断计入，亚分钟余量不累计
    #[instrument(skip(self, order), fields(order_id = %order.order_id, from = %order.status, to = %to))]
    pub fn apply(
        &self,
        order: &Order,
        to: OrderStatus,
        now: NaiveDateTime,
    ) -> Option<TransitionOutcome> {
        let from = order.status;
        if !self.can_transition(from, to) {
            return None;
        }

        let mut started = order.production_started_at;
        let mut accumulated = order.production_minutes_accumulated;

        // 1. 离开生产中: 结算本段已过时间
        if from == OrderStatus::InProgress {
            if let Some(start) = started {
                accumulated += (now - start).num_minutes().max(0);
            }
            started = None;
        }

        // 2. 进入生产中: 记录起始时刻
        if to == OrderStatus::InProgress {
            started = Some(now);
        }

        Some(TransitionOutcome {
            from,
            to,
            production_started_at: started,
            production_minutes_accumulated: accumulated,
        })
    }
}

impl Default for LifecycleEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn order_in(status: OrderStatus) -> Order {
        let now = at(9, 0);
        let mut order = Order::new(
            "user-1".to_string(),
            "客户".to_string(),
            "c@example.com".to_string(),
            vec![],
            30,
            now,
            1,
            now,
        );
        order.status = status;
        order
    }

    #[test]
    fn test_transition_matrix() {
        use OrderStatus::*;
        let engine = LifecycleEngine::new();

        // 合法转移
        assert!(engine.can_transition(Pending, InProgress));
        assert!(engine.can_transition(Pending, Completed));
        assert!(engine.can_transition(Pending, Cancelled));
        assert!(engine.can_transition(InProgress, Pending));
        assert!(engine.can_transition(InProgress, Completed));
        assert!(engine.can_transition(InProgress, Cancelled));

        // 终止状态锁定
        for terminal in [Completed, Cancelled] {
            for to in [Pending, InProgress, Completed, Cancelled] {
                assert!(!engine.can_transition(terminal, to), "{} 不可再转移", terminal);
            }
        }

        // 同状态转移非法
        assert!(!engine.can_transition(Pending, Pending));
        assert!(!engine.can_transition(InProgress, InProgress));
    }

    #[test]
    fn test_enter_in_progress_sets_start_time() {
        let engine = LifecycleEngine::new();
        let order = order_in(OrderStatus::Pending);
        let outcome = engine.apply(&order, OrderStatus::InProgress, at(10, 0)).unwrap();
        assert_eq!(outcome.production_started_at, Some(at(10, 0)));
        assert_eq!(outcome.production_minutes_accumulated, 0);
    }

    #[test]
    fn test_pause_resume_accumulates_both_spans() {
        // 场景: 生产5分钟暂停，再生产10分钟完成 → 累计15分钟
        let engine = LifecycleEngine::new();
        let mut order = order_in(OrderStatus::Pending);

        // 10:00 开始生产
        let outcome = engine.apply(&order, OrderStatus::InProgress, at(10, 0)).unwrap();
        order.status = outcome.to;
        order.production_started_at = outcome.production_started_at;
        order.production_minutes_accumulated = outcome.production_minutes_accumulated;

        // 10:05 暂停
        let outcome = engine.apply(&order, OrderStatus::Pending, at(10, 5)).unwrap();
        assert_eq!(outcome.production_minutes_accumulated, 5, "第一段5分钟");
        assert!(outcome.production_started_at.is_none(), "暂停后清空起始时刻");
        order.status = outcome.to;
        order.production_started_at = outcome.production_started_at;
        order.production_minutes_accumulated = outcome.production_minutes_accumulated;

        // 10:20 恢复生产
        let outcome = engine.apply(&order, OrderStatus::InProgress, at(10, 20)).unwrap();
        assert_eq!(outcome.production_minutes_accumulated, 5, "恢复不结算");
        order.status = outcome.to;
        order.production_started_at = outcome.production_started_at;
        order.production_minutes_accumulated = outcome.production_minutes_accumulated;

        // 10:30 完成
        let outcome = engine.apply(&order, OrderStatus::Completed, at(10, 30)).unwrap();
        assert_eq!(outcome.production_minutes_accumulated, 15, "5 + 10 = 15分钟");
        assert!(outcome.production_started_at.is_none());
    }

    #[test]
    fn test_pending_to_terminal_keeps_accumulated() {
        // 未生产直接完成/取消: 计时字段原样保留
        let engine = LifecycleEngine::new();
        let mut order = order_in(OrderStatus::Pending);
        order.production_minutes_accumulated = 3;

        let outcome = engine.apply(&order, OrderStatus::Cancelled, at(11, 0)).unwrap();
        assert_eq!(outcome.production_minutes_accumulated, 3);
        assert!(outcome.production_started_at.is_none());
    }

    #[test]
    fn test_clock_skew_clamped_to_zero() {
        // 时钟回拨不允许产生负累计
        let engine = LifecycleEngine::new();
        let mut order = order_in(OrderStatus::InProgress);
        order.production_started_at = Some(at(12, 0));
        order.production_minutes_accumulated = 8;

        let outcome = engine.apply(&order, OrderStatus::Completed, at(11, 0)).unwrap();
        assert_eq!(outcome.production_minutes_accumulated, 8, "负时段按0计入");
    }

    #[test]
    fn test_illegal_transition_returns_none() {
        let engine = LifecycleEngine::new();
        let completed = order_in(OrderStatus::Completed);
        assert!(engine.apply(&completed, OrderStatus::Pending, at(10, 0)).is_none());

        let pending = order_in(OrderStatus::Pending);
        assert!(engine.apply(&pending, OrderStatus::Pending, at(10, 0)).is_none());
    }

    #[test]
    fn test_exit_without_start_time_accumulates_nothing() {
        // 异常数据: 生产中但无起始时刻，离开时不结算
        let engine = LifecycleEngine::new();
        let mut order = order_in(OrderStatus::InProgress);
        order.production_started_at = None;
        order.production_minutes_accumulated = 4;

        let outcome = engine.apply(&order, OrderStatus::Pending, at(10, 0)).unwrap();
        assert_eq!(outcome.production_minutes_accumulated, 4);
    }
}
