// ==========================================
// 订单排产系统 - 生产参数 API
// ==========================================
// 职责: 生产参数查询与更新
// 说明: 参数调整只影响后续订单，已有订单保留创建时刻的单耗快照
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::OrderValidator;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::settings::ProductionSettings;
use crate::engine::events::{OptionalEventPublisher, OrderEvent, OrderEventType};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::settings_repo::SettingsRepository;

/// 事件来源标识
const EVENT_SOURCE: &str = "settings_api";

// ==========================================
// SettingsApi - 生产参数 API
// ==========================================

/// 生产参数API
///
/// 职责：
/// 1. 参数查询（未保存过的用户返回默认值，不自动落库）
/// 2. 参数更新（校验、整体替换、审计）
pub struct SettingsApi {
    settings_repo: Arc<SettingsRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    validator: OrderValidator,
    events: OptionalEventPublisher,
}

impl SettingsApi {
    /// 创建新的SettingsApi实例
    pub fn new(
        settings_repo: Arc<SettingsRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            settings_repo,
            action_log_repo,
            validator: OrderValidator::new(),
            events,
        }
    }

    /// 查询用户生产参数
    ///
    /// # 返回
    /// - Ok(ProductionSettings): 已保存的参数，或默认参数（未保存过时）
    pub fn get_settings(&self, owner_id: &str) -> ApiResult<ProductionSettings> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }

        Ok(self
            .settings_repo
            .find_by_owner(owner_id)?
            .unwrap_or_else(|| ProductionSettings::default_for(owner_id)))
    }

    /// 更新用户生产参数
    ///
    /// 产品单耗行整体替换。已有订单不受影响（创建时已快照单耗）。
    ///
    /// # 返回
    /// - Ok(ProductionSettings): 保存后的参数
    /// - Err(ApiError::ValidationError): 参数不满足约束
    pub fn update_settings(
        &self,
        owner_id: &str,
        settings: ProductionSettings,
    ) -> ApiResult<ProductionSettings> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }

        // 归属以路径参数为准，请求体中的 owner_id 不可信
        let mut settings = settings;
        settings.owner_id = owner_id.to_string();
        settings.updated_at = chrono::Local::now().naive_local();

        self.validator.validate_settings(&settings)?;
        self.settings_repo.upsert(&settings)?;

        // 记录 ActionLog（best-effort）
        let log = ActionLog::new(
            uuid::Uuid::new_v4().to_string(),
            ActionType::UpdateSettings,
            owner_id.to_string(),
        )
        .with_owner(owner_id)
        .with_payload(&serde_json::json!({
            "item_count": settings.items.len(),
            "working_hours_per_day": settings.working_hours_per_day,
            "start_time": settings.start_time,
            "end_time": settings.end_time,
            "working_days": settings.working_days,
        }))
        .with_detail(format!(
            "更新生产参数: {}类产品, 每日{}小时",
            settings.items.len(),
            settings.working_hours_per_day
        ));
        if let Err(e) = self.action_log_repo.insert(&log) {
            tracing::warn!("记录操作日志失败: {}", e);
        }

        let event = OrderEvent::for_owner(
            owner_id.to_string(),
            OrderEventType::SettingsUpdated,
            Some(EVENT_SOURCE.to_string()),
        )
        .with_payload(&serde_json::json!({
            "item_count": settings.items.len(),
        }));
        if let Err(e) = self.events.publish(event) {
            tracing::warn!("事件发布失败: {}", e);
        }

        tracing::info!(
            "生产参数更新完成: owner_id={}, {}类产品",
            owner_id,
            settings.items.len()
        );
        Ok(settings)
    }
}
