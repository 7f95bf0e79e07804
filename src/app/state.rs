// ==========================================
// 订单排产系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{DashboardApi, OrderApi, SettingsApi};
use crate::db;
use crate::engine::OptionalEventPublisher;
use crate::repository::{ActionLogRepository, OrderRepository, SettingsRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 生产参数API
    pub settings_api: Arc<SettingsApi>,

    /// 驾驶舱API
    pub dashboard_api: Arc<DashboardApi>,

    /// 订单仓储（用于生产节拍巡检等只读任务）
    pub order_repo: Arc<OrderRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,

    /// 事件发布器
    pub event_publisher: OptionalEventPublisher,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化 schema
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        db::init_schema(&conn)
            .map_err(|e| format!("无法初始化数据库schema: {}", e))?;

        match db::read_schema_version(&conn) {
            Ok(Some(v)) if v != db::CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    "schema_version 不匹配: 期望 {}, 实际 {}（将继续启动）",
                    db::CURRENT_SCHEMA_VERSION,
                    v
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("读取 schema_version 失败(将继续启动): {}", e);
            }
        }

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let order_repo = Arc::new(OrderRepository::from_connection(conn.clone()));
        let settings_repo = Arc::new(SettingsRepository::from_connection(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // 初始化API层
        // ==========================================

        // 事件发布器（当前未接外部总线）
        let event_publisher = OptionalEventPublisher::none();

        // 订单API
        let order_api = Arc::new(OrderApi::new(
            order_repo.clone(),
            settings_repo.clone(),
            action_log_repo.clone(),
            event_publisher.clone(),
        ));

        // 生产参数API
        let settings_api = Arc::new(SettingsApi::new(
            settings_repo.clone(),
            action_log_repo.clone(),
            event_publisher.clone(),
        ));

        // 驾驶舱API
        let dashboard_api = Arc::new(DashboardApi::new(
            order_repo.clone(),
            settings_repo,
            action_log_repo.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            order_api,
            settings_api,
            dashboard_api,
            order_repo,
            action_log_repo,
            event_publisher,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 开发环境: 用户数据目录/order-queue-aps-dev/order_queue_aps.db
/// - 生产环境: 用户数据目录/order-queue-aps/order_queue_aps.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("ORDER_QUEUE_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 先给一个默认回退值，后续如果能拿到 data_dir 再覆盖。
    let mut path = PathBuf::from("./order_queue_aps.db");

    // 尝试获取用户数据目录
    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("order-queue-aps-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("order-queue-aps");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("order_queue_aps.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    // 注意：AppState::new() 的测试需要真实的数据库文件
    // 这些测试应该在集成测试中进行
}
