// ==========================================
// 订单排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod order;
pub mod settings;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use order::{CompletionNotice, Order, OrderItem};
pub use settings::{ProductionSettings, SettingsItem};
pub use types::OrderStatus;
