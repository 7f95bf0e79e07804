// ==========================================
// 订单排产系统 - 订单管理 API
// ==========================================
// 职责: 订单创建、查询、状态流转、队列调整、删除
// 约束: 同一订单的变更操作串行执行，入口处校验并记录审计日志
// ==========================================

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::OrderValidator;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::{CompletionNotice, Order, OrderItem};
use crate::domain::settings::ProductionSettings;
use crate::domain::types::OrderStatus;
use crate::engine::completion::CompletionEstimator;
use crate::engine::duration::{format_duration, DurationCalculator};
use crate::engine::events::{OptionalEventPublisher, OrderEvent, OrderEventType};
use crate::engine::lifecycle::LifecycleEngine;
use crate::engine::queue::QueuePlanner;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::settings_repo::SettingsRepository;

/// 事件来源标识
const EVENT_SOURCE: &str = "order_api";

// ==========================================
// OrderApi - 订单管理 API
// ==========================================

/// 订单管理API
///
/// 职责：
/// 1. 订单创建（参数快照、时长计算、完成日期推算、队尾入列）
/// 2. 订单查询（单个、全部、活跃队列）
/// 3. 状态流转（生产计时结算、完结后队列压实）
/// 4. 队列调整（夹取、重排、批量持久化）
/// 5. ActionLog记录与事件发布
pub struct OrderApi {
    order_repo: Arc<OrderRepository>,
    settings_repo: Arc<SettingsRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    validator: OrderValidator,
    duration_calc: DurationCalculator,
    estimator: CompletionEstimator,
    queue_planner: QueuePlanner,
    lifecycle: LifecycleEngine,
    events: OptionalEventPublisher,
    // 进行中的订单变更集合，重入直接拒绝
    in_flight: Mutex<HashSet<String>>,
}

impl OrderApi {
    /// 创建新的OrderApi实例
    pub fn new(
        order_repo: Arc<OrderRepository>,
        settings_repo: Arc<SettingsRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            order_repo,
            settings_repo,
            action_log_repo,
            validator: OrderValidator::new(),
            duration_calc: DurationCalculator::new(),
            estimator: CompletionEstimator::new(),
            queue_planner: QueuePlanner::new(),
            lifecycle: LifecycleEngine::new(),
            events,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    // ==========================================
    // 订单创建与预估
    // ==========================================

    /// 创建订单
    ///
    /// 产品单耗取创建时刻的生产参数快照，后续参数调整不回算已有订单。
    ///
    /// # 参数
    /// - owner_id: 归属用户
    /// - customer_name: 客户姓名
    /// - customer_email: 客户邮箱
    /// - quantities: 产品标识 -> 数量
    ///
    /// # 返回
    /// - Ok(Order): 创建完成的订单（含队列位置与预计完成时刻）
    /// - Err(ApiError): 校验失败或数据库错误
    pub fn create_order(
        &self,
        owner_id: &str,
        customer_name: &str,
        customer_email: &str,
        quantities: &HashMap<String, i64>,
    ) -> ApiResult<Order> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        self.validator.validate_customer(customer_name, customer_email)?;

        let settings = self.load_settings(owner_id)?;
        self.validator.validate_quantities(quantities, &settings)?;

        // 产品行快照 (沿用参数中的产品顺序，数量为零的行不入单)
        let items = build_items(quantities, &settings);
        let total_minutes = self.duration_calc.total_minutes(&items);

        let active = self.order_repo.list_active_by_owner(owner_id)?;
        let queued_minutes = self.duration_calc.total_queued_minutes(&active);

        let now = chrono::Local::now().naive_local();
        let estimated_completion_at = self
            .estimator
            .estimate(total_minutes, queued_minutes, &settings, now)
            .ok_or_else(|| {
                ApiError::ValidationError("生产参数无效: 无法推算完成日期".to_string())
            })?;

        let position = self.queue_planner.next_append_position(active.len() as i64);
        let order = Order::new(
            owner_id.to_string(),
            customer_name.trim().to_string(),
            customer_email.trim().to_string(),
            items,
            total_minutes,
            estimated_completion_at,
            position,
            now,
        );

        self.order_repo.insert(&order)?;

        // 记录 ActionLog（best-effort）
        let log = ActionLog::new(
            uuid::Uuid::new_v4().to_string(),
            ActionType::CreateOrder,
            owner_id.to_string(),
        )
        .with_order(owner_id, &order.order_id)
        .with_payload(&serde_json::json!({
            "total_production_minutes": total_minutes,
            "queued_minutes_ahead": queued_minutes,
            "queue_position": position,
            "estimated_completion_at": estimated_completion_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }))
        .with_detail(format!(
            "创建订单: {} ({})",
            order.short_id(),
            order.items_summary()
        ));
        self.log_action(log);

        self.publish_event(
            OrderEvent::for_order(
                owner_id.to_string(),
                order.order_id.clone(),
                OrderEventType::OrderCreated,
                Some(EVENT_SOURCE.to_string()),
            )
            .with_payload(&serde_json::json!({
                "queue_position": position,
                "total_production_minutes": total_minutes,
            })),
        );

        tracing::info!(
            "创建订单完成: order_id={}, 时长{}分钟, 队列位置{}",
            order.short_id(),
            total_minutes,
            position
        );
        Ok(order)
    }

    /// 预估订单完成时刻（不落库）
    ///
    /// 供订单表单实时展示，口径与 create_order 完全一致
    pub fn preview_estimate(
        &self,
        owner_id: &str,
        quantities: &HashMap<String, i64>,
    ) -> ApiResult<EstimatePreview> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }

        let settings = self.load_settings(owner_id)?;
        self.validator.validate_quantities(quantities, &settings)?;

        let items = build_items(quantities, &settings);
        let total_minutes = self.duration_calc.total_minutes(&items);

        let active = self.order_repo.list_active_by_owner(owner_id)?;
        let queued_minutes = self.duration_calc.total_queued_minutes(&active);

        let now = chrono::Local::now().naive_local();
        let estimated_completion_at = self
            .estimator
            .estimate(total_minutes, queued_minutes, &settings, now)
            .ok_or_else(|| {
                ApiError::ValidationError("生产参数无效: 无法推算完成日期".to_string())
            })?;

        Ok(EstimatePreview {
            total_production_minutes: total_minutes,
            queued_minutes_ahead: queued_minutes,
            estimated_completion_at: estimated_completion_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            duration_text: format_duration(total_minutes),
        })
    }

    // ==========================================
    // 订单查询
    // ==========================================

    /// 查询单个订单
    pub fn get_order(&self, owner_id: &str, order_id: &str) -> ApiResult<Order> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if order_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("订单ID不能为空".to_string()));
        }

        self.order_repo
            .find_by_id(owner_id, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单不存在: {}", order_id)))
    }

    /// 查询用户全部订单 (按队列位置升序)
    pub fn list_orders(&self, owner_id: &str) -> ApiResult<Vec<Order>> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        Ok(self.order_repo.list_by_owner(owner_id)?)
    }

    /// 查询用户活跃订单队列
    pub fn list_active_orders(&self, owner_id: &str) -> ApiResult<Vec<Order>> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        Ok(self.order_repo.list_active_by_owner(owner_id)?)
    }

    /// 生成已完成订单的完成通知草稿（仅文本，不发送）
    pub fn get_completion_notice(
        &self,
        owner_id: &str,
        order_id: &str,
    ) -> ApiResult<CompletionNotice> {
        let order = self.get_order(owner_id, order_id)?;
        if order.status != OrderStatus::Completed {
            return Err(ApiError::BusinessRuleViolation(
                "仅已完成订单可生成完成通知".to_string(),
            ));
        }
        Ok(order.completion_notice())
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 更新订单状态
    ///
    /// 进入/离开生产中状态时结算生产计时；转入完结状态后压实活跃队列。
    ///
    /// # 返回
    /// - Ok(Order): 更新后的订单
    /// - Err(ApiError::InvalidStateTransition): 非法状态转换（含同状态重复提交）
    /// - Err(ApiError::OperationInProgress): 同一订单的另一变更尚未结束
    pub fn update_order_status(
        &self,
        owner_id: &str,
        order_id: &str,
        new_status: OrderStatus,
    ) -> ApiResult<Order> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if order_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("订单ID不能为空".to_string()));
        }

        let _permit = self.acquire_permit(order_id)?;

        let order = self
            .order_repo
            .find_by_id(owner_id, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单不存在: {}", order_id)))?;

        let now = chrono::Local::now().naive_local();
        let outcome = self.lifecycle.apply(&order, new_status, now).ok_or_else(|| {
            ApiError::InvalidStateTransition {
                from: order.status.to_string(),
                to: new_status.to_string(),
            }
        })?;

        self.order_repo.update_status_and_timing(
            owner_id,
            order_id,
            new_status,
            outcome.production_started_at,
            outcome.production_minutes_accumulated,
            now,
        )?;

        // 完结订单退出队列，剩余活跃订单压实为 1..N
        if new_status.is_terminal() {
            self.renumber_active(owner_id, now)?;
        }

        if new_status == OrderStatus::Completed {
            let notice = order.completion_notice();
            tracing::info!(
                "订单完成通知草稿已生成: to={}, subject={}",
                notice.to,
                notice.subject
            );
        }

        // 记录 ActionLog（best-effort）
        let log = ActionLog::new(
            uuid::Uuid::new_v4().to_string(),
            ActionType::UpdateStatus,
            owner_id.to_string(),
        )
        .with_order(owner_id, order_id)
        .with_payload(&serde_json::json!({
            "from": outcome.from.to_string(),
            "to": outcome.to.to_string(),
            "production_minutes_accumulated": outcome.production_minutes_accumulated,
        }))
        .with_detail(format!(
            "订单状态变更: {} {} -> {}",
            order.short_id(),
            outcome.from,
            outcome.to
        ));
        self.log_action(log);

        self.publish_event(
            OrderEvent::for_order(
                owner_id.to_string(),
                order_id.to_string(),
                OrderEventType::OrderStatusChanged,
                Some(EVENT_SOURCE.to_string()),
            )
            .with_payload(&serde_json::json!({
                "from": outcome.from.to_string(),
                "to": outcome.to.to_string(),
            })),
        );

        tracing::info!(
            "订单状态变更完成: order_id={}, {} -> {}",
            order.short_id(),
            outcome.from,
            outcome.to
        );

        self.order_repo
            .find_by_id(owner_id, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单不存在: {}", order_id)))
    }

    /// 开始生产下一单
    ///
    /// 单条产线约束: 已有生产中订单时拒绝，否则启动队列位置最靠前的待生产订单。
    ///
    /// # 返回
    /// - Ok(Order): 已进入生产中的订单
    /// - Err(ApiError::BusinessRuleViolation): 已有订单在生产中
    /// - Err(ApiError::NotFound): 没有待生产订单
    pub fn start_next_order(&self, owner_id: &str) -> ApiResult<Order> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }

        let active = self.order_repo.list_active_by_owner(owner_id)?;
        if let Some(in_progress) = active
            .iter()
            .find(|o| o.status == OrderStatus::InProgress)
        {
            return Err(ApiError::BusinessRuleViolation(format!(
                "已有订单在生产中: {}",
                in_progress.short_id()
            )));
        }

        // 活跃队列按位置升序，首个待生产订单即队头
        let head = active
            .iter()
            .find(|o| o.status == OrderStatus::Pending)
            .ok_or_else(|| ApiError::NotFound("没有待生产的订单".to_string()))?;
        let head_id = head.order_id.clone();

        let _permit = self.acquire_permit(&head_id)?;

        let now = chrono::Local::now().naive_local();
        let outcome = self
            .lifecycle
            .apply(head, OrderStatus::InProgress, now)
            .ok_or_else(|| ApiError::InvalidStateTransition {
                from: head.status.to_string(),
                to: OrderStatus::InProgress.to_string(),
            })?;

        self.order_repo.update_status_and_timing(
            owner_id,
            &head_id,
            OrderStatus::InProgress,
            outcome.production_started_at,
            outcome.production_minutes_accumulated,
            now,
        )?;

        // 记录 ActionLog（best-effort）
        let log = ActionLog::new(
            uuid::Uuid::new_v4().to_string(),
            ActionType::StartNextOrder,
            owner_id.to_string(),
        )
        .with_order(owner_id, &head_id)
        .with_payload(&serde_json::json!({
            "queue_position": head.queue_position,
        }))
        .with_detail(format!("开始生产队头订单: {}", head.short_id()));
        self.log_action(log);

        self.publish_event(
            OrderEvent::for_order(
                owner_id.to_string(),
                head_id.clone(),
                OrderEventType::OrderStatusChanged,
                Some(EVENT_SOURCE.to_string()),
            )
            .with_payload(&serde_json::json!({
                "from": OrderStatus::Pending.to_string(),
                "to": OrderStatus::InProgress.to_string(),
            })),
        );

        tracing::info!("开始生产: order_id={}", head.short_id());

        self.order_repo
            .find_by_id(owner_id, &head_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单不存在: {}", head_id)))
    }

    // ==========================================
    // 队列调整
    // ==========================================

    /// 调整订单队列位置
    ///
    /// 请求位置先夹取到 [1, 活跃队长]，其余订单保持相对顺序后稠密重排。
    ///
    /// # 返回
    /// - Ok(MoveOrderOutcome): 实际生效位置与更新行数
    /// - Err(ApiError::BusinessRuleViolation): 订单已完结，不参与排队
    pub fn move_order(
        &self,
        owner_id: &str,
        order_id: &str,
        requested_position: i64,
    ) -> ApiResult<MoveOrderOutcome> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if order_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("订单ID不能为空".to_string()));
        }

        let _permit = self.acquire_permit(order_id)?;

        let order = self
            .order_repo
            .find_by_id(owner_id, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单不存在: {}", order_id)))?;
        if !order.status.is_active() {
            return Err(ApiError::BusinessRuleViolation(
                "已完结订单不参与队列调整".to_string(),
            ));
        }

        let active = self.order_repo.list_active_by_owner(owner_id)?;
        let plan = self
            .queue_planner
            .plan_move(&active, order_id, requested_position)
            .ok_or_else(|| ApiError::NotFound(format!("订单不在活跃队列中: {}", order_id)))?;

        let now = chrono::Local::now().naive_local();
        let positions_updated = if plan.changes.is_empty() {
            0
        } else {
            let pairs: Vec<(String, i64)> = plan
                .changes
                .iter()
                .map(|c| (c.order_id.clone(), c.to))
                .collect();
            self.order_repo.update_positions(owner_id, &pairs, now)?
        };

        // 记录 ActionLog（best-effort）
        let log = ActionLog::new(
            uuid::Uuid::new_v4().to_string(),
            ActionType::MoveOrder,
            owner_id.to_string(),
        )
        .with_order(owner_id, order_id)
        .with_payload(&serde_json::json!({
            "requested_position": requested_position,
            "applied_position": plan.clamped_to,
            "positions_updated": positions_updated,
        }))
        .with_detail(format!(
            "调整队列位置: {} -> {}",
            order.short_id(),
            plan.clamped_to
        ));
        self.log_action(log);

        self.publish_event(
            OrderEvent::for_order(
                owner_id.to_string(),
                order_id.to_string(),
                OrderEventType::QueueReordered,
                Some(EVENT_SOURCE.to_string()),
            )
            .with_payload(&serde_json::json!({
                "applied_position": plan.clamped_to,
            })),
        );

        tracing::info!(
            "队列调整完成: order_id={}, 请求位置{}, 生效位置{}",
            order.short_id(),
            requested_position,
            plan.clamped_to
        );

        Ok(MoveOrderOutcome {
            order_id: order_id.to_string(),
            requested_position,
            applied_position: plan.clamped_to,
            positions_updated,
        })
    }

    /// 删除订单
    ///
    /// 产品行经外键级联删除，剩余活跃订单压实为 1..N。
    pub fn delete_order(&self, owner_id: &str, order_id: &str) -> ApiResult<()> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if order_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("订单ID不能为空".to_string()));
        }

        let _permit = self.acquire_permit(order_id)?;

        let order = self
            .order_repo
            .find_by_id(owner_id, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单不存在: {}", order_id)))?;

        self.order_repo.delete(owner_id, order_id)?;

        let now = chrono::Local::now().naive_local();
        if order.status.is_active() {
            self.renumber_active(owner_id, now)?;
        }

        // 记录 ActionLog（best-effort）
        let log = ActionLog::new(
            uuid::Uuid::new_v4().to_string(),
            ActionType::DeleteOrder,
            owner_id.to_string(),
        )
        .with_order(owner_id, order_id)
        .with_payload(&serde_json::json!({
            "status": order.status.to_string(),
            "queue_position": order.queue_position,
        }))
        .with_detail(format!(
            "删除订单: {} ({})",
            order.short_id(),
            order.items_summary()
        ));
        self.log_action(log);

        self.publish_event(OrderEvent::for_order(
            owner_id.to_string(),
            order_id.to_string(),
            OrderEventType::OrderDeleted,
            Some(EVENT_SOURCE.to_string()),
        ));

        tracing::info!("删除订单完成: order_id={}", order.short_id());
        Ok(())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 读取用户生产参数，未保存过时回退默认值（不自动落库）
    fn load_settings(&self, owner_id: &str) -> ApiResult<ProductionSettings> {
        Ok(self
            .settings_repo
            .find_by_owner(owner_id)?
            .unwrap_or_else(|| ProductionSettings::default_for(owner_id)))
    }

    /// 获取订单操作许可，同一订单的并发变更直接拒绝
    fn acquire_permit(&self, order_id: &str) -> ApiResult<OperationPermit<'_>> {
        OperationPermit::acquire(&self.in_flight, order_id)
    }

    /// 活跃队列稠密重排并持久化
    fn renumber_active(
        &self,
        owner_id: &str,
        now: chrono::NaiveDateTime,
    ) -> ApiResult<usize> {
        let active = self.order_repo.list_active_by_owner(owner_id)?;
        let changes = self.queue_planner.plan_renumber(&active);
        if changes.is_empty() {
            return Ok(0);
        }
        let pairs: Vec<(String, i64)> = changes
            .iter()
            .map(|c| (c.order_id.clone(), c.to))
            .collect();
        Ok(self.order_repo.update_positions(owner_id, &pairs, now)?)
    }

    /// 写入操作日志，失败不阻断业务
    fn log_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            tracing::warn!("记录操作日志失败: {}", e);
        }
    }

    /// 发布事件，失败不阻断业务
    fn publish_event(&self, event: OrderEvent) {
        if let Err(e) = self.events.publish(event) {
            tracing::warn!("事件发布失败: {}", e);
        }
    }
}

// ==========================================
// 操作许可 (RAII)
// ==========================================

/// 订单操作许可
///
/// 持有期间同一订单的其他变更请求被拒绝，离开作用域自动释放
struct OperationPermit<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> OperationPermit<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<String>>, order_id: &str) -> ApiResult<Self> {
        let mut set = in_flight
            .lock()
            .map_err(|e| ApiError::InternalError(format!("操作许可锁获取失败: {}", e)))?;
        if !set.insert(order_id.to_string()) {
            return Err(ApiError::OperationInProgress(order_id.to_string()));
        }
        Ok(Self {
            in_flight,
            key: order_id.to_string(),
        })
    }
}

impl Drop for OperationPermit<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.key);
        }
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 按生产参数顺序构建产品行快照，数量为零的行不入单
fn build_items(
    quantities: &HashMap<String, i64>,
    settings: &ProductionSettings,
) -> Vec<OrderItem> {
    settings
        .items
        .iter()
        .filter_map(|item| {
            let quantity = quantities.get(&item.item_key).copied().unwrap_or(0);
            if quantity > 0 {
                Some(OrderItem {
                    item_key: item.item_key.clone(),
                    item_name: item.item_name.clone(),
                    quantity,
                    minutes_per_unit: item.minutes_per_unit,
                })
            } else {
                None
            }
        })
        .collect()
}

// ==========================================
// DTO 类型定义
// ==========================================

/// 订单完成时刻预估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatePreview {
    /// 本单生产时长 (分钟)
    pub total_production_minutes: i64,

    /// 前方活跃订单排队时长 (分钟)
    pub queued_minutes_ahead: i64,

    /// 预计完成时刻
    pub estimated_completion_at: String,

    /// 生产时长可读文本
    pub duration_text: String,
}

/// 队列调整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOrderOutcome {
    /// 订单ID
    pub order_id: String,

    /// 请求位置 (夹取前)
    pub requested_position: i64,

    /// 生效位置 (夹取后)
    pub applied_position: i64,

    /// 实际更新的订单数
    pub positions_updated: usize,
}
