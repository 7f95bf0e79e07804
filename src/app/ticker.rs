// ==========================================
// 订单排产系统 - 生产节拍巡检
// ==========================================
// 职责: 每分钟巡检生产中订单，输出实时生产耗时
// 红线: 只读，不修改任何订单数据（耗时为派生值，完成时才落库）
// ==========================================

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;

use crate::engine::format_duration;
use crate::repository::{OrderRepository, RepositoryError};

/// 默认巡检周期（秒）
pub const DEFAULT_TICK_SECS: u64 = 60;

/// 生产节拍巡检器
///
/// 生产中订单的实时耗时由 production_started_at 派生，
/// 巡检只负责周期性读取并输出日志，供运维观察生产进度。
pub struct ElapsedTicker {
    order_repo: Arc<OrderRepository>,
    tick: Duration,
}

impl ElapsedTicker {
    /// 创建巡检器（默认 60 秒周期）
    pub fn new(order_repo: Arc<OrderRepository>) -> Self {
        Self {
            order_repo,
            tick: Duration::from_secs(DEFAULT_TICK_SECS),
        }
    }

    /// 创建指定周期的巡检器
    pub fn with_tick(order_repo: Arc<OrderRepository>, tick: Duration) -> Self {
        Self { order_repo, tick }
    }

    /// 单次巡检
    ///
    /// # 返回
    /// - Ok(usize): 本次巡检到的生产中订单数
    /// - Err: 数据库错误
    pub fn refresh_once(&self, now: NaiveDateTime) -> Result<usize, RepositoryError> {
        let orders = self.order_repo.list_in_progress()?;

        for order in &orders {
            let elapsed = order.actual_production_minutes(now);
            tracing::info!(
                "生产进行中: 订单 {} ({}) 预计 {} 分钟，已进行 {}",
                order.short_id(),
                order.customer_name,
                order.total_production_minutes,
                format_duration(elapsed)
            );
        }

        Ok(orders.len())
    }

    /// 启动巡检循环
    ///
    /// 每个周期执行一次 refresh_once，收到关闭信号后退出。
    /// 巡检失败只告警，不中断循环。
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut timer = tokio::time::interval(self.tick);

        tracing::info!("生产节拍巡检已启动（周期: {:?}）", self.tick);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("生产节拍巡检收到关闭信号");
                    break;
                }
                _ = timer.tick() => {
                    let now = Local::now().naive_local();
                    match self.refresh_once(now) {
                        Ok(0) => {}
                        Ok(n) => tracing::debug!("本轮巡检到 {} 个生产中订单", n),
                        Err(e) => tracing::warn!("生产节拍巡检失败(下轮重试): {}", e),
                    }
                }
            }
        }

        tracing::info!("生产节拍巡检已停止");
    }
}
