// ==========================================
// 订单排产系统 - 服务主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单生产排队与完成日期推算
// ==========================================

use std::sync::Arc;

use tokio::sync::mpsc;

use order_queue_aps::app::{get_default_db_path, AppState, ElapsedTicker};
use order_queue_aps::logging;

#[tokio::main]
async fn main() {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", order_queue_aps::APP_NAME);
    tracing::info!("系统版本: {}", order_queue_aps::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState
    tracing::info!("正在初始化AppState...");
    let app_state = match AppState::new(db_path) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("AppState初始化成功");

    // 启动生产节拍巡检
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let ticker = ElapsedTicker::new(app_state.order_repo.clone());
    let ticker_handle = tokio::spawn(ticker.run(shutdown_rx));

    tracing::info!("服务已启动，Ctrl-C 退出");

    // 等待退出信号
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("等待退出信号失败: {}", e);
    }

    tracing::info!("收到退出信号，正在关闭...");
    let _ = shutdown_tx.send(()).await;
    let _ = ticker_handle.await;

    tracing::info!("服务已退出");
}
