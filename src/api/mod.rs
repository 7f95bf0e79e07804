// ==========================================
// 订单排产系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,负责校验、编排、审计与事件发布
// ==========================================

pub mod error;
pub mod dashboard_api;
pub mod order_api;
pub mod settings_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use dashboard_api::{
    CalendarDay, CalendarOrderInfo, DailyOrderCounts, DashboardApi, OrderStats,
    ProductProduction,
};
pub use order_api::{EstimatePreview, MoveOrderOutcome, OrderApi};
pub use settings_api::SettingsApi;
pub use validator::OrderValidator;
