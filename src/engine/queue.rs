// ==========================================
// 订单排产系统 - 队列位置规划引擎
// ==========================================
// 红线: 位置只在活跃订单 (pending/in-progress) 间维护,
//       任意操作后必须保持稠密 1..N
// 红线: 引擎只产出变更计划,持久化由仓储层在单事务内完成
// ==========================================
// 职责: 追加定位 / 拖动换位 / 稠密重排 / 不变量检查
// 输入: 活跃订单列表 (含当前位置)
// 输出: PositionChange 变更集
// ==========================================

use crate::domain::order::Order;
use tracing::instrument;

// ==========================================
// PositionChange - 位置变更记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionChange {
    pub order_id: String,
    pub from: i64, // 变更前位置
    pub to: i64,   // 变更后位置
}

// ==========================================
// MovePlan - 换位计划
// ==========================================
#[derive(Debug, Clone)]
pub struct MovePlan {
    pub clamped_to: i64,               // 夹取后的目标位置
    pub changes: Vec<PositionChange>,  // 需要落库的位置变更
}

// ==========================================
// QueuePlanner - 队列位置规划引擎
// ==========================================
pub struct QueuePlanner {
    // 无状态引擎，不需要注入依赖
}

impl QueuePlanner {
    /// 创建新的队列位置规划引擎
    pub fn new() -> Self {
        Self {}
    }

    /// 新订单追加位置
    ///
    /// # 参数
    /// - `active_count`: 当前活跃订单数
    ///
    /// # 返回
    /// 队尾位置 (活跃订单数 + 1)
    pub fn next_append_position(&self, active_count: i64) -> i64 {
        active_count + 1
    }

    /// 规划订单换位 (夹取 + 摘除重插 + 稠密重排)
    ///
    /// # 参数
    /// - `active_orders`: 活跃订单列表 (任意顺序)
    /// - `order_id`: 待移动订单
    /// - `requested_position`: 请求位置 (0 与负数夹取为 1，超过队长夹取为队尾)
    ///
    /// # 返回
    /// - `Some(MovePlan)`: 变更集只含位置实际变化的订单
    /// - `None`: 订单不在活跃集合中
    #[instrument(skip(self, active_orders), fields(order_id, requested_position))]
    pub fn plan_move(
        &self,
        active_orders: &[Order],
        order_id: &str,
        requested_position: i64,
    ) -> Option<MovePlan> {
        let mut queue = self.sorted_active(active_orders);
        let index = queue.iter().position(|o| o.0 == order_id)?;

        // 1. 夹取目标位置到 [1, N]
        let count = queue.len() as i64;
        let clamped_to = requested_position.clamp(1, count);

        // 2. 摘除后按目标序号重插，其余订单相对顺序不变
        let moved = queue.remove(index);
        queue.insert((clamped_to - 1) as usize, moved);

        // 3. 稠密重排 1..N
        Some(MovePlan {
            clamped_to,
            changes: self.dense_changes(&queue),
        })
    }

    /// 规划稠密重排 (状态变更/删除后调用)
    ///
    /// 保持现有相对顺序，把剩余活跃订单压实为 1..N。
    /// 位置重复或出现空洞时同样由本方法修复
    #[instrument(skip(self, active_orders), fields(active_count = active_orders.len()))]
    pub fn plan_renumber(&self, active_orders: &[Order]) -> Vec<PositionChange> {
        let queue = self.sorted_active(active_orders);
        self.dense_changes(&queue)
    }

    /// 检查活跃订单位置是否恰为 {1..N}
    pub fn is_dense(&self, active_orders: &[Order]) -> bool {
        let mut positions: Vec<i64> = active_orders
            .iter()
            .filter(|o| o.status.is_active())
            .map(|o| o.queue_position)
            .collect();
        positions.sort_unstable();
        positions
            .iter()
            .enumerate()
            .all(|(i, p)| *p == (i as i64) + 1)
    }

    /// 过滤活跃订单并按 (当前位置, 创建时间) 排序
    fn sorted_active(&self, orders: &[Order]) -> Vec<(String, i64)> {
        let mut queue: Vec<(&Order, i64)> = orders
            .iter()
            .filter(|o| o.status.is_active())
            .map(|o| (o, o.queue_position))
            .collect();
        queue.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| a.0.created_at.cmp(&b.0.created_at))
        });
        queue
            .into_iter()
            .map(|(o, p)| (o.order_id.clone(), p))
            .collect()
    }

    /// 生成把队列压实为 1..N 的变更集
    fn dense_changes(&self, queue: &[(String, i64)]) -> Vec<PositionChange> {
        queue
            .iter()
            .enumerate()
            .filter_map(|(i, (order_id, current))| {
                let target = (i as i64) + 1;
                if *current != target {
                    Some(PositionChange {
                        order_id: order_id.clone(),
                        from: *current,
                        to: target,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

impl Default for QueuePlanner {
    fn default() -> Self {
        Self::new()
    }
}
