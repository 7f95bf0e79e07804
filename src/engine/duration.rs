// ==========================================
// 订单排产系统 - 生产时长计算引擎
// ==========================================
// 红线: 纯函数计算,不做输入校验 (校验在 API 层)
// ==========================================
// 职责: 订单合计生产时长 + 队列积压时长汇总
// 输入: 订单产品行 / 订单列表
// 输出: 分钟数
// ==========================================

use crate::domain::order::{Order, OrderItem};
use tracing::instrument;

// ==========================================
// DurationCalculator - 生产时长计算引擎
// ==========================================
pub struct DurationCalculator {
    // 无状态引擎，不需要注入依赖
}

impl DurationCalculator {
    /// 创建新的生产时长计算引擎
    pub fn new() -> Self {
        Self {}
    }

    /// 计算订单合计生产时长 (分钟)
    ///
    /// 规则: Σ (数量 × 单位时长)，数量为 0 的行贡献 0
    ///
    /// # 参数
    /// - `items`: 订单产品行 (单位时长已快照)
    ///
    /// # 返回
    /// 合计分钟数 (>= 0，前提是输入已通过校验)
    pub fn total_minutes(&self, items: &[OrderItem]) -> i64 {
        items.iter().map(|item| item.total_minutes()).sum()
    }

    /// 汇总队列积压时长 (分钟)
    ///
    /// 规则: 对 pending 与 in-progress 订单求 total_production_minutes 之和，
    /// 生产中订单不按已完成进度折减
    ///
    /// # 参数
    /// - `orders`: 订单列表 (任意状态，内部过滤)
    #[instrument(skip(self, orders), fields(order_count = orders.len()))]
    pub fn total_queued_minutes(&self, orders: &[Order]) -> i64 {
        orders
            .iter()
            .filter(|order| order.status.is_active())
            .map(|order| order.total_production_minutes)
            .sum()
    }
}

impl Default for DurationCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 时长人性化格式 (展示用)
// ==========================================

/// 格式化分钟数为可读文本
///
/// 规则:
/// - < 60 分钟: "X minute(s)"
/// - 整小时: "X hour(s)"
/// - 其他: "X hour(s) and Y minute(s)"
/// - 数值为 1 时用单数
pub fn format_duration(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{} minute{}", minutes, if minutes != 1 { "s" } else { "" });
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        return format!("{} hour{}", hours, if hours != 1 { "s" } else { "" });
    }
    format!(
        "{} hour{} and {} minute{}",
        hours,
        if hours != 1 { "s" } else { "" },
        remaining,
        if remaining != 1 { "s" } else { "" }
    )
}
