// ==========================================
// 订单排产系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 纯函数计算由入参驱动
// ==========================================

pub mod completion;
pub mod duration;
pub mod events;
pub mod lifecycle;
pub mod queue;

// 重导出核心引擎
pub use completion::CompletionEstimator;
pub use duration::{format_duration, DurationCalculator};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, OrderEvent, OrderEventPublisher, OrderEventType,
};
pub use lifecycle::{LifecycleEngine, TransitionOutcome};
pub use queue::{MovePlan, PositionChange, QueuePlanner};
