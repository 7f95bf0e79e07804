// ==========================================
// 订单排产系统 - 完成日期推算引擎
// ==========================================
// 红线: 纯函数,只依赖入参与传入的 now,不做 I/O
// 红线: 日历非法时返回 None,绝不死循环
// ==========================================
// 职责: 沿工作日历向前推演,将所需生产分钟消耗到
//       每日工作时间窗中,跨日结转剩余分钟
// 输入: 订单时长 + 前方队列积压 + 生产参数 + 当前时刻
// 输出: 预计完成时刻
// ==========================================

use crate::domain::settings::ProductionSettings;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::instrument;

// ==========================================
// CompletionEstimator - 完成日期推算引擎
// ==========================================
pub struct CompletionEstimator {
    // 无状态引擎，不需要注入依赖
}

impl CompletionEstimator {
    /// 创建新的完成日期推算引擎
    pub fn new() -> Self {
        Self {}
    }

    /// 推算预计完成时刻
    ///
    /// # 参数
    /// - `duration_minutes`: 本订单所需生产时长 (分钟)
    /// - `queued_minutes_ahead`: 前方活跃订单积压时长 (分钟)
    /// - `settings`: 工作日历
    /// - `now`: 推算基准时刻
    ///
    /// # 返回
    /// - `Some(时刻)`: 推算成功
    /// - `None`: 日历无法承载任何分钟 (工作日集合无有效项或时间窗非法)，
    ///   调用方应在参数校验阶段拦截此类配置
    ///
    /// 时长为 0 时不进入推演循环，直接返回起点时刻
    #[instrument(skip(self, settings), fields(duration_minutes, queued_minutes_ahead))]
    pub fn estimate(
        &self,
        duration_minutes: i64,
        queued_minutes_ahead: i64,
        settings: &ProductionSettings,
        now: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        let (start, end) = settings.working_window()?;
        // 集合中必须存在有效星期序号，否则逐日推进永不命中
        if !settings.working_days.iter().any(|d| *d <= 6) {
            return None;
        }

        let mut total = duration_minutes + queued_minutes_ahead;

        // 1. 确定推演起点
        let mut cursor = if now.time() < start {
            // 开工前: 当天开工时刻
            now.date().and_time(start)
        } else if now.time() >= end {
            // 收工后: 下一个工作日开工时刻
            self.next_working_date(settings, now.date())?.and_time(start)
        } else if settings.is_working_day(now.date()) {
            // 窗口内且当天为工作日: 从当前时刻起算
            now
        } else {
            // 时钟落在窗口内但当天非工作日: 推进到下一个工作日
            self.next_working_date(settings, now.date())?.and_time(start)
        };

        // 2. 逐日消耗工作分钟
        while total > 0 {
            if settings.is_working_day(cursor.date()) {
                let minutes_left_today = (end - cursor.time()).num_minutes().max(0);
                if total <= minutes_left_today {
                    // 当日剩余可承载，推进后结束
                    cursor += Duration::minutes(total);
                    total = 0;
                } else {
                    // 结转到下一日开工时刻
                    total -= minutes_left_today;
                    cursor = cursor.date().succ_opt()?.and_time(start);
                }
            } else {
                // 非工作日不消耗分钟
                cursor = cursor.date().succ_opt()?.and_time(start);
            }
        }

        Some(cursor)
    }

    /// 查找严格晚于 after 的第一个工作日
    ///
    /// 星期以 7 天为周期，扫描 7 天未命中即集合无有效项
    fn next_working_date(
        &self,
        settings: &ProductionSettings,
        after: NaiveDate,
    ) -> Option<NaiveDate> {
        let mut date = after.succ_opt()?;
        for _ in 0..7 {
            if settings.is_working_day(date) {
                return Some(date);
            }
            date = date.succ_opt()?;
        }
        None
    }
}

impl Default for CompletionEstimator {
    fn default() -> Self {
        Self::new()
    }
}
