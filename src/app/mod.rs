// ==========================================
// 订单排产系统 - 应用层
// ==========================================
// 职责: 装配共享状态与后台任务
// ==========================================

pub mod state;
pub mod ticker;

// 重导出
pub use state::{get_default_db_path, AppState};
pub use ticker::ElapsedTicker;
