// ==========================================
// 演示数据种子工具
// ==========================================
// 用法: seed_demo_orders [db_path]
// 重置目标库（原库备份为 .bak.<时间戳>），并通过 API 层
// 生成一个演示用户的生产参数与多状态订单队列。
// ==========================================

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::Local;

use order_queue_aps::app::{get_default_db_path, AppState};
use order_queue_aps::domain::types::OrderStatus;
use order_queue_aps::domain::ProductionSettings;

const DEMO_OWNER: &str = "demo-user";

fn main() -> Result<(), Box<dyn Error>> {
    order_queue_aps::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;

    seed_demo_data(&state)?;
    print_quick_counts(&state)?;

    eprintln!("演示数据已写入: {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_demo_data(state: &AppState) -> Result<(), Box<dyn Error>> {
    // 生产参数：落库默认参数，演示队列基于该日历推算完成日期
    let settings = ProductionSettings::default_for(DEMO_OWNER);
    state.settings_api.update_settings(DEMO_OWNER, settings)?;

    // 多种产品组合的订单队列
    let customers: Vec<(&str, &str, Vec<(&str, i64)>)> = vec![
        ("Alice Chen", "alice@example.com", vec![("item-1", 2), ("item-2", 1)]),
        ("Bob Liu", "bob@example.com", vec![("item-1", 5)]),
        ("Carol Wang", "carol@example.com", vec![("item-2", 4)]),
        ("Dave Zhang", "dave@example.com", vec![("item-1", 1), ("item-2", 2)]),
        ("Erin Zhao", "erin@example.com", vec![("item-1", 3), ("item-2", 3)]),
        ("Frank Sun", "frank@example.com", vec![("item-2", 2)]),
    ];

    let mut order_ids = Vec::new();
    for (name, email, items) in customers {
        let quantities: HashMap<String, i64> = items
            .into_iter()
            .map(|(k, q)| (k.to_string(), q))
            .collect();
        let order = state
            .order_api
            .create_order(DEMO_OWNER, name, email, &quantities)?;
        eprintln!(
            "创建订单 {}: {} ({} 分钟, 队列位置 {})",
            order.short_id(),
            name,
            order.total_production_minutes,
            order.queue_position
        );
        order_ids.push(order.order_id);
    }

    // 队首开始生产并完成，展示实际生产耗时统计
    let first = state.order_api.start_next_order(DEMO_OWNER)?;
    state
        .order_api
        .update_order_status(DEMO_OWNER, &first.order_id, OrderStatus::Completed)?;

    // 下一单进入生产中
    state.order_api.start_next_order(DEMO_OWNER)?;

    // 末单取消，展示队列紧缩
    if let Some(last_id) = order_ids.last() {
        state
            .order_api
            .update_order_status(DEMO_OWNER, last_id, OrderStatus::Cancelled)?;
    }

    Ok(())
}

fn print_quick_counts(state: &AppState) -> Result<(), Box<dyn Error>> {
    let stats = state.dashboard_api.get_order_stats(DEMO_OWNER)?;
    eprintln!("--------------------------------------------------");
    eprintln!("订单总数: {}", stats.total_orders);
    eprintln!(
        "待生产: {} / 生产中: {} / 已完成: {} / 已取消: {}",
        stats.pending_count, stats.in_progress_count, stats.completed_count, stats.cancelled_count
    );
    eprintln!("活跃队列长度: {}", stats.active_queue_size);
    eprintln!("--------------------------------------------------");
    Ok(())
}
