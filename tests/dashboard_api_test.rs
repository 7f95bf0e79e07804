// ==========================================
// DashboardApi 集成测试
// ==========================================
// 测试目标: 验证订单统计/按日序列/产品产量/完成日历/操作日志查询
// 口径: 实际生产时长取已结算累计分钟，通过仓储层预置
// ==========================================


use chrono::NaiveDate;
use tempfile::NamedTempFile;

use order_queue_aps::api::ApiError;
use order_queue_aps::app::AppState;
use order_queue_aps::domain::types::OrderStatus;
use order_queue_aps::logging;

/// 创建完整测试环境 (临时数据库 + 装配好的应用状态)
fn setup_test_env() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let app = AppState::new(db_path).expect("Failed to build app state");
    (temp_file, app)
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_get_order_stats_over_lifecycle() {
    logging::init_test();

    println!("\n=== 测试：订单统计概览 ===");

    let (_temp_file, app) = setup_test_env();
    let owner = "user-stats";

    // 步骤 1: 空账户统计全为零
    let stats = app.dashboard_api.get_order_stats(owner).expect("查询统计失败");
    assert_eq!(stats.total_orders, 0);
    assert_eq!(stats.active_queue_size, 0);
    assert_eq!(stats.average_production_minutes_actual, 0.0);
    println!("✓ 步骤 1: 空账户统计为零");

    // 步骤 2: 准备 5 个订单并推进到不同状态
    let mut order_ids = Vec::new();
    for quantities in [
        test_helpers::quantities(&[("item-1", 2), ("item-2", 1)]), // 35 分钟
        test_helpers::quantities(&[("item-1", 1)]),                // 10 分钟
        test_helpers::quantities(&[("item-2", 1)]),                // 15 分钟
        test_helpers::quantities(&[("item-1", 1)]),                // 10 分钟
        test_helpers::quantities(&[("item-2", 2)]),                // 30 分钟
    ] {
        let order = app
            .order_api
            .create_order(owner, "Stats Customer", "stats@example.com", &quantities)
            .expect("创建订单失败");
        order_ids.push(order.order_id);
    }

    // 前两单直接预置为已完成并带结算时长 (40 + 20 分钟)
    let now = chrono::Local::now().naive_local();
    app.order_repo
        .update_status_and_timing(owner, &order_ids[0], OrderStatus::Completed, None, 40, now)
        .expect("预置完成订单失败");
    app.order_repo
        .update_status_and_timing(owner, &order_ids[1], OrderStatus::Completed, None, 20, now)
        .expect("预置完成订单失败");

    // 取消一单、启动一单，留一单待生产
    app.order_api
        .update_order_status(owner, &order_ids[4], OrderStatus::Cancelled)
        .expect("取消订单失败");
    app.order_api.start_next_order(owner).expect("开始生产失败");
    println!("✓ 步骤 2: 状态分布 2完成/1取消/1生产中/1待生产");

    // 步骤 3: 统计口径验证
    let stats = app.dashboard_api.get_order_stats(owner).expect("查询统计失败");
    assert_eq!(stats.total_orders, 5);
    assert_eq!(stats.pending_count, 1);
    assert_eq!(stats.in_progress_count, 1);
    assert_eq!(stats.completed_count, 2);
    assert_eq!(stats.cancelled_count, 1);
    assert_eq!(stats.active_queue_size, 2, "活跃队列 = 待生产 + 生产中");
    assert_eq!(
        stats.total_production_minutes_actual, 60,
        "实际时长只累计已完成订单的结算分钟"
    );
    assert_eq!(stats.average_production_minutes_actual, 30.0);
    assert_eq!(stats.total_items_produced, 4, "完成件数 = 3 + 1");
    println!("✓ 步骤 3: 统计口径正确");

    // 用户ID为空被拒绝
    let err = app
        .dashboard_api
        .get_order_stats("  ")
        .expect_err("空用户ID应被拒绝");
    assert!(matches!(err, ApiError::InvalidInput(_)));
    println!("✓ 空用户ID被拒绝");

    println!("=== 测试通过 ===\n");
}

#[test]
fn test_list_orders_by_day_zero_filled() {
    logging::init_test();

    println!("\n=== 测试：按日订单量序列 ===");

    let (_temp_file, app) = setup_test_env();
    let owner = "user-1";

    // 步骤 1: 天数参数越界被拒绝
    for bad_days in [0, 367] {
        let err = app
            .dashboard_api
            .list_orders_by_day(owner, bad_days)
            .expect_err("越界天数应被拒绝");
        match err {
            ApiError::InvalidInput(msg) => assert!(msg.contains("统计天数必须在1-366之间")),
            other => panic!("应返回 InvalidInput, 实际: {:?}", other),
        }
    }
    println!("✓ 步骤 1: 天数越界被拒绝");

    // 步骤 2: 今日创建两单，完成其中一单
    let first = app
        .order_api
        .create_order(
            owner,
            "Alice",
            "alice@example.com",
            &test_helpers::quantities(&[("item-1", 1)]),
        )
        .expect("创建订单失败");
    app.order_api
        .create_order(
            owner,
            "Bob",
            "bob@example.com",
            &test_helpers::quantities(&[("item-2", 1)]),
        )
        .expect("创建订单失败");
    let completed = app
        .order_api
        .update_order_status(owner, &first.order_id, OrderStatus::Completed)
        .expect("完成订单失败");

    // 窗口外的历史订单不应计入 (2024 年的种子订单)
    let old = test_helpers::sample_order(owner, 3, test_helpers::tuesday_10am());
    app.order_repo.insert(&old).expect("插入历史订单失败");
    println!("✓ 步骤 2: 今日 2 单创建、1 单完成，另有窗口外历史订单");

    // 步骤 3: 序列连续 7 天且计数归组正确
    let series = app
        .dashboard_api
        .list_orders_by_day(owner, 7)
        .expect("查询按日序列失败");
    assert_eq!(series.len(), 7, "序列应包含连续7天");

    let created_on = first.created_at.date().to_string();
    let created_entry = series
        .iter()
        .find(|d| d.date == created_on)
        .expect("应存在创建日条目");
    assert_eq!(created_entry.created_count, 2);

    let completed_on = completed.updated_at.date().to_string();
    let completed_entry = series
        .iter()
        .find(|d| d.date == completed_on)
        .expect("应存在完成日条目");
    assert_eq!(completed_entry.completed_count, 1);

    let total_created: i64 = series.iter().map(|d| d.created_count).sum();
    assert_eq!(total_created, 2, "窗口外历史订单不计入");
    println!("✓ 步骤 3: 计数归组与补零正确");

    println!("=== 测试通过 ===\n");
}

#[test]
fn test_production_by_product_proportional_split() {
    logging::init_test();

    println!("\n=== 测试：按产品产量统计 ===");

    let (_temp_file, app) = setup_test_env();
    let owner = "user-1";

    // 步骤 1: 两个完成订单 + 一个待生产订单
    let order_a = app
        .order_api
        .create_order(
            owner,
            "Alice",
            "alice@example.com",
            &test_helpers::quantities(&[("item-1", 2), ("item-2", 1)]),
        )
        .expect("创建订单失败"); // 预估 35 分钟 (20 + 15)
    let order_b = app
        .order_api
        .create_order(
            owner,
            "Bob",
            "bob@example.com",
            &test_helpers::quantities(&[("item-2", 3)]),
        )
        .expect("创建订单失败"); // 预估 45 分钟
    app.order_api
        .create_order(
            owner,
            "Carol",
            "carol@example.com",
            &test_helpers::quantities(&[("item-1", 1)]),
        )
        .expect("创建订单失败"); // 待生产，不计入

    let now = chrono::Local::now().naive_local();
    app.order_repo
        .update_status_and_timing(owner, &order_a.order_id, OrderStatus::Completed, None, 70, now)
        .expect("预置完成订单失败");
    app.order_repo
        .update_status_and_timing(owner, &order_b.order_id, OrderStatus::Completed, None, 45, now)
        .expect("预置完成订单失败");
    println!("✓ 步骤 1: 预置完成订单 (实际 70 + 45 分钟)");

    // 步骤 2: 实际时长按产品行预估占比分摊
    let rows = app
        .dashboard_api
        .get_production_by_product(owner)
        .expect("查询产品产量失败");
    assert_eq!(rows.len(), 2, "只统计完成订单涉及的产品");

    // 件数降序: Item 2 (1+3=4件) 在前
    assert_eq!(rows[0].item_name, "Item 2");
    assert_eq!(rows[0].units_completed, 4);
    assert_eq!(
        rows[0].actual_minutes, 75,
        "Item 2 分摊 = 70*(15/35) + 45 = 30 + 45"
    );

    assert_eq!(rows[1].item_name, "Item 1");
    assert_eq!(rows[1].units_completed, 2);
    assert_eq!(rows[1].actual_minutes, 40, "Item 1 分摊 = 70*(20/35)");
    println!("✓ 步骤 2: 分摊比例与件数降序正确");

    println!("=== 测试通过 ===\n");
}

#[test]
fn test_completion_calendar_groups_and_flags() {
    logging::init_test();

    println!("\n=== 测试：完成日历 ===");

    let (_temp_file, app) = setup_test_env();
    let owner = "user-1";

    // 步骤 1: 区间参数校验
    let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
    let sunday = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();

    let err = app
        .dashboard_api
        .list_completion_calendar(owner, sunday, monday)
        .expect_err("倒置区间应被拒绝");
    match err {
        ApiError::InvalidInput(msg) => assert!(msg.contains("开始日期不能晚于结束日期")),
        other => panic!("应返回 InvalidInput, 实际: {:?}", other),
    }

    let far = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
    let err = app
        .dashboard_api
        .list_completion_calendar(owner, monday, far)
        .expect_err("超长区间应被拒绝");
    match err {
        ApiError::InvalidInput(msg) => assert!(msg.contains("日历区间不能超过366天")),
        other => panic!("应返回 InvalidInput, 实际: {:?}", other),
    }
    println!("✓ 步骤 1: 区间校验生效");

    // 步骤 2: 预置三个不同预计完成日期的订单 (周二两单、周六一单)
    let base = test_helpers::tuesday_10am();

    let mut tue_late = test_helpers::sample_order(owner, 1, base);
    tue_late.estimated_completion_at = NaiveDate::from_ymd_opt(2024, 1, 9)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap();
    tue_late.status = OrderStatus::Completed;
    app.order_repo.insert(&tue_late).expect("插入订单失败");

    let mut tue_early = test_helpers::sample_order(owner, 2, base);
    tue_early.estimated_completion_at = NaiveDate::from_ymd_opt(2024, 1, 9)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    app.order_repo.insert(&tue_early).expect("插入订单失败");

    let mut saturday_order = test_helpers::sample_order(owner, 3, base);
    saturday_order.estimated_completion_at = NaiveDate::from_ymd_opt(2024, 1, 13)
        .unwrap()
        .and_hms_opt(11, 0, 0)
        .unwrap();
    app.order_repo.insert(&saturday_order).expect("插入订单失败");
    println!("✓ 步骤 2: 已预置 3 个订单");

    // 步骤 3: 日历连续、分组与工作日标记正确
    let days = app
        .dashboard_api
        .list_completion_calendar(owner, monday, sunday)
        .expect("查询完成日历失败");
    assert_eq!(days.len(), 7, "闭区间应产出连续7天");

    assert_eq!(days[0].date, "2024-01-08");
    assert!(days[0].is_working_day, "周一为默认工作日");
    assert!(days[0].orders.is_empty(), "无订单日期补空组");

    let tuesday = &days[1];
    assert_eq!(tuesday.date, "2024-01-09");
    assert!(tuesday.is_working_day);
    assert_eq!(tuesday.orders.len(), 2);
    assert_eq!(
        tuesday.orders[0].order_id, tue_early.order_id,
        "同日订单按预计完成时刻升序"
    );
    assert_eq!(tuesday.orders[1].order_id, tue_late.order_id);
    assert_eq!(tuesday.orders[1].status, "completed", "日历包含全部状态");
    assert_eq!(tuesday.orders[0].items_summary, "2x Item 1, 1x Item 2");
    assert_eq!(
        tuesday.orders[0].estimated_completion_at,
        "2024-01-09 10:30:00"
    );

    let saturday = &days[5];
    assert_eq!(saturday.date, "2024-01-13");
    assert!(!saturday.is_working_day, "周六为默认非工作日");
    assert_eq!(saturday.orders.len(), 1, "非工作日照常展示落在当日的订单");

    assert!(days[6].orders.is_empty());
    assert!(!days[6].is_working_day, "周日为默认非工作日");
    println!("✓ 步骤 3: 分组/排序/工作日标记正确");

    println!("=== 测试通过 ===\n");
}

#[test]
fn test_recent_actions_query_and_limits() {
    logging::init_test();

    println!("\n=== 测试：操作日志查询接口 ===");

    let (_temp_file, app) = setup_test_env();
    let owner = "user-1";

    // 步骤 1: limit 越界被拒绝
    for bad_limit in [0, 1001] {
        let err = app
            .dashboard_api
            .list_recent_actions(owner, bad_limit)
            .expect_err("越界limit应被拒绝");
        match err {
            ApiError::InvalidInput(msg) => assert!(msg.contains("limit必须在1-1000之间")),
            other => panic!("应返回 InvalidInput, 实际: {:?}", other),
        }
    }
    let err = app
        .dashboard_api
        .list_order_actions(owner, "  ", 10)
        .expect_err("空订单ID应被拒绝");
    assert!(matches!(err, ApiError::InvalidInput(_)));
    println!("✓ 步骤 1: 参数校验生效");

    // 步骤 2: 创建三单产生三条日志，limit 截断生效
    let mut order_ids = Vec::new();
    for i in 1..=3 {
        let order = app
            .order_api
            .create_order(
                owner,
                &format!("Customer {}", i),
                &format!("c{}@example.com", i),
                &test_helpers::quantities(&[("item-1", 1)]),
            )
            .expect("创建订单失败");
        order_ids.push(order.order_id);
    }

    let logs = app
        .dashboard_api
        .list_recent_actions(owner, 2)
        .expect("查询日志失败");
    assert_eq!(logs.len(), 2, "limit 应截断返回条数");

    let logs = app
        .dashboard_api
        .list_recent_actions(owner, 1000)
        .expect("查询日志失败");
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.action_type == "CreateOrder"));
    println!("✓ 步骤 2: limit 截断正确");

    // 步骤 3: 按订单过滤
    let logs = app
        .dashboard_api
        .list_order_actions(owner, &order_ids[0], 10)
        .expect("查询订单日志失败");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].order_id.as_deref(), Some(order_ids[0].as_str()));
    println!("✓ 步骤 3: 按订单过滤正确");

    println!("=== 测试通过 ===\n");
}
