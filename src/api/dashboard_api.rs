// ==========================================
// 订单排产系统 - 统计看板 API
// ==========================================
// 职责: 订单统计、产量分析、完成日历、操作日志查询
// 说明: 实际生产时长口径为已结算累计分钟，预估时长不参与统计
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::order::Order;
use crate::domain::settings::ProductionSettings;
use crate::domain::types::OrderStatus;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::settings_repo::SettingsRepository;

// ==========================================
// DashboardApi - 统计看板 API
// ==========================================

/// 统计看板API
///
/// 职责：
/// 1. 订单状态统计（数量、队列规模、实际生产时长）
/// 2. 按日订单量序列（创建/完成曲线）
/// 3. 按产品产量统计（完成件数、实际时长分摊）
/// 4. 完成日历（按预计完成日期分组）
/// 5. 操作日志查询
pub struct DashboardApi {
    order_repo: Arc<OrderRepository>,
    settings_repo: Arc<SettingsRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl DashboardApi {
    /// 创建新的DashboardApi实例
    pub fn new(
        order_repo: Arc<OrderRepository>,
        settings_repo: Arc<SettingsRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            order_repo,
            settings_repo,
            action_log_repo,
        }
    }

    // ==========================================
    // 订单统计
    // ==========================================

    /// 查询订单统计概览
    ///
    /// # 返回
    /// - Ok(OrderStats): 状态计数、队列规模、实际生产时长、完成件数
    /// - Err(ApiError): API错误
    pub fn get_order_stats(&self, owner_id: &str) -> ApiResult<OrderStats> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }

        let orders = self.order_repo.list_by_owner(owner_id)?;

        let mut stats = OrderStats {
            total_orders: orders.len() as i64,
            pending_count: 0,
            in_progress_count: 0,
            completed_count: 0,
            cancelled_count: 0,
            active_queue_size: 0,
            total_production_minutes_actual: 0,
            average_production_minutes_actual: 0.0,
            total_items_produced: 0,
        };

        for order in &orders {
            match order.status {
                OrderStatus::Pending => stats.pending_count += 1,
                OrderStatus::InProgress => stats.in_progress_count += 1,
                OrderStatus::Completed => stats.completed_count += 1,
                OrderStatus::Cancelled => stats.cancelled_count += 1,
            }
            if order.status.is_active() {
                stats.active_queue_size += 1;
            }
            if order.status == OrderStatus::Completed {
                stats.total_production_minutes_actual += order.production_minutes_accumulated;
                stats.total_items_produced +=
                    order.items.iter().map(|i| i.quantity).sum::<i64>();
            }
        }

        if stats.completed_count > 0 {
            stats.average_production_minutes_actual =
                stats.total_production_minutes_actual as f64 / stats.completed_count as f64;
        }

        Ok(stats)
    }

    /// 查询按日订单量序列 (最近 N 天，含零值日)
    ///
    /// 创建量按创建日期归组，完成量按完结当日 (updated_at) 归组。
    ///
    /// # 参数
    /// - last_n_days: 统计天数 (1-366)
    ///
    /// # 返回
    /// - Ok(Vec<DailyOrderCounts>): 按日期升序的序列
    pub fn list_orders_by_day(
        &self,
        owner_id: &str,
        last_n_days: i64,
    ) -> ApiResult<Vec<DailyOrderCounts>> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if !(1..=366).contains(&last_n_days) {
            return Err(ApiError::InvalidInput(
                "统计天数必须在1-366之间".to_string(),
            ));
        }

        let orders = self.order_repo.list_by_owner(owner_id)?;

        let today = chrono::Local::now().date_naive();
        let first_day = today - Duration::days(last_n_days - 1);

        let mut created: HashMap<NaiveDate, i64> = HashMap::new();
        let mut completed: HashMap<NaiveDate, i64> = HashMap::new();
        for order in &orders {
            let created_on = order.created_at.date();
            if created_on >= first_day && created_on <= today {
                *created.entry(created_on).or_insert(0) += 1;
            }
            if order.status == OrderStatus::Completed {
                let completed_on = order.updated_at.date();
                if completed_on >= first_day && completed_on <= today {
                    *completed.entry(completed_on).or_insert(0) += 1;
                }
            }
        }

        // 序列连续，无订单的日期补零
        let mut series = Vec::with_capacity(last_n_days as usize);
        let mut day = first_day;
        while day <= today {
            series.push(DailyOrderCounts {
                date: day.to_string(),
                created_count: created.get(&day).copied().unwrap_or(0),
                completed_count: completed.get(&day).copied().unwrap_or(0),
            });
            day += Duration::days(1);
        }

        Ok(series)
    }

    /// 查询按产品产量统计 (仅已完成订单)
    ///
    /// 实际时长按产品行预估时长占比分摊到各产品。
    pub fn get_production_by_product(
        &self,
        owner_id: &str,
    ) -> ApiResult<Vec<ProductProduction>> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }

        let orders = self.order_repo.list_by_owner(owner_id)?;

        let mut units: HashMap<String, i64> = HashMap::new();
        let mut minutes: HashMap<String, f64> = HashMap::new();
        for order in orders
            .iter()
            .filter(|o| o.status == OrderStatus::Completed)
        {
            let actual = order.production_minutes_accumulated as f64;
            for item in &order.items {
                *units.entry(item.item_name.clone()).or_insert(0) += item.quantity;
                // 预估总时长为零时无法分摊，只累计件数
                if order.total_production_minutes > 0 {
                    let weight =
                        item.total_minutes() as f64 / order.total_production_minutes as f64;
                    *minutes.entry(item.item_name.clone()).or_insert(0.0) += actual * weight;
                }
            }
        }

        let mut rows: Vec<ProductProduction> = units
            .into_iter()
            .map(|(item_name, units_completed)| ProductProduction {
                actual_minutes: minutes.get(&item_name).copied().unwrap_or(0.0).round()
                    as i64,
                item_name,
                units_completed,
            })
            .collect();
        rows.sort_by(|a, b| b.units_completed.cmp(&a.units_completed));

        Ok(rows)
    }

    // ==========================================
    // 完成日历
    // ==========================================

    /// 查询完成日历 (按预计完成日期分组)
    ///
    /// # 参数
    /// - from / to: 日历区间 (闭区间，最长366天)
    ///
    /// # 返回
    /// - Ok(Vec<CalendarDay>): 日期升序，含工作日标记，无订单的日期补空组
    pub fn list_completion_calendar(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<CalendarDay>> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if from > to {
            return Err(ApiError::InvalidInput(
                "开始日期不能晚于结束日期".to_string(),
            ));
        }
        if (to - from).num_days() >= 366 {
            return Err(ApiError::InvalidInput(
                "日历区间不能超过366天".to_string(),
            ));
        }

        let settings = self
            .settings_repo
            .find_by_owner(owner_id)?
            .unwrap_or_else(|| ProductionSettings::default_for(owner_id));
        let orders = self.order_repo.list_by_owner(owner_id)?;

        let mut grouped: HashMap<NaiveDate, Vec<CalendarOrderInfo>> = HashMap::new();
        for order in &orders {
            let due = order.estimated_completion_at.date();
            if due >= from && due <= to {
                grouped
                    .entry(due)
                    .or_default()
                    .push(CalendarOrderInfo::from_order(order));
            }
        }

        let mut days = Vec::new();
        let mut day = from;
        while day <= to {
            let mut orders_of_day = grouped.remove(&day).unwrap_or_default();
            orders_of_day.sort_by(|a, b| a.estimated_completion_at.cmp(&b.estimated_completion_at));
            days.push(CalendarDay {
                date: day.to_string(),
                is_working_day: settings.is_working_day(day),
                orders: orders_of_day,
            });
            day += Duration::days(1);
        }

        Ok(days)
    }

    // ==========================================
    // 操作日志查询接口
    // ==========================================

    /// 查询最近操作
    ///
    /// # 参数
    /// - limit: 返回记录数上限
    ///
    /// # 返回
    /// - Ok(Vec<ActionLog>): 操作日志列表
    /// - Err(ApiError): API错误
    pub fn list_recent_actions(&self, owner_id: &str, limit: i32) -> ApiResult<Vec<ActionLog>> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if limit <= 0 || limit > 1000 {
            return Err(ApiError::InvalidInput(
                "limit必须在1-1000之间".to_string(),
            ));
        }

        Ok(self.action_log_repo.find_recent(owner_id, limit)?)
    }

    /// 查询指定订单的操作日志
    pub fn list_order_actions(
        &self,
        owner_id: &str,
        order_id: &str,
        limit: i32,
    ) -> ApiResult<Vec<ActionLog>> {
        if owner_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("用户ID不能为空".to_string()));
        }
        if order_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("订单ID不能为空".to_string()));
        }
        if limit <= 0 || limit > 1000 {
            return Err(ApiError::InvalidInput(
                "limit必须在1-1000之间".to_string(),
            ));
        }

        Ok(self.action_log_repo.find_by_order(owner_id, order_id, limit)?)
    }
}

// ==========================================
// DTO 类型定义
// ==========================================

/// 订单统计概览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStats {
    /// 订单总数
    pub total_orders: i64,

    /// 待生产数
    pub pending_count: i64,

    /// 生产中数
    pub in_progress_count: i64,

    /// 已完成数
    pub completed_count: i64,

    /// 已取消数
    pub cancelled_count: i64,

    /// 活跃队列规模
    pub active_queue_size: i64,

    /// 实际生产总时长 (分钟，已完成订单的结算累计)
    pub total_production_minutes_actual: i64,

    /// 平均实际生产时长 (分钟/单)
    pub average_production_minutes_actual: f64,

    /// 完成件数合计
    pub total_items_produced: i64,
}

/// 按日订单量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyOrderCounts {
    /// 日期 (YYYY-MM-DD)
    pub date: String,

    /// 当日创建订单数
    pub created_count: i64,

    /// 当日完成订单数
    pub completed_count: i64,
}

/// 按产品产量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductProduction {
    /// 产品名称
    pub item_name: String,

    /// 完成件数
    pub units_completed: i64,

    /// 分摊实际时长 (分钟)
    pub actual_minutes: i64,
}

/// 完成日历单日分组
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    /// 日期 (YYYY-MM-DD)
    pub date: String,

    /// 是否为工作日
    pub is_working_day: bool,

    /// 预计当日完成的订单
    pub orders: Vec<CalendarOrderInfo>,
}

/// 日历订单摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarOrderInfo {
    /// 订单ID
    pub order_id: String,

    /// 客户姓名
    pub customer_name: String,

    /// 订单状态
    pub status: String,

    /// 产品行摘要
    pub items_summary: String,

    /// 预计完成时刻
    pub estimated_completion_at: String,
}

impl CalendarOrderInfo {
    fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            customer_name: order.customer_name.clone(),
            status: order.status.to_string(),
            items_summary: order.items_summary(),
            estimated_completion_at: order
                .estimated_completion_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_api_structure() {
        // 这个测试只是验证结构是否正确定义
        // 实际的集成测试在 tests/ 目录
    }
}
