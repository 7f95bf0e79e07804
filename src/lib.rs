// ==========================================
// 订单排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单生产排队与完成日期推算
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 数据库基础设施（连接初始化/PRAGMA/建表统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配与后台任务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::OrderStatus;

// 领域实体
pub use domain::{ActionLog, ActionType, Order, OrderItem, ProductionSettings, SettingsItem};

// 引擎
pub use engine::{
    format_duration, CompletionEstimator, DurationCalculator, LifecycleEngine, QueuePlanner,
};

// API
pub use api::{DashboardApi, OrderApi, SettingsApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "订单排产系统";

// ==========================================
// 预编译检查
// ==========================================
