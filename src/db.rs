// ==========================================
// 订单排产系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 首次启动时建表（本系统为单机库，schema 随代码演进）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 这里的版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建表 SQL（幂等，可在已有库上重复执行）
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS production_order (
    order_id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    customer_name TEXT NOT NULL,
    customer_email TEXT NOT NULL,
    status TEXT NOT NULL,
    total_production_minutes INTEGER NOT NULL,
    estimated_completion_at TEXT NOT NULL,
    queue_position INTEGER NOT NULL,
    production_started_at TEXT,
    production_minutes_accumulated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS production_order_item (
    order_id TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
    item_key TEXT NOT NULL,
    item_name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    minutes_per_unit INTEGER NOT NULL,
    PRIMARY KEY (order_id, item_key)
);

CREATE TABLE IF NOT EXISTS production_settings (
    owner_id TEXT PRIMARY KEY,
    working_hours_per_day REAL NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    working_days TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS production_settings_item (
    owner_id TEXT NOT NULL REFERENCES production_settings(owner_id) ON DELETE CASCADE,
    item_key TEXT NOT NULL,
    item_name TEXT NOT NULL,
    minutes_per_unit INTEGER NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (owner_id, item_key)
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    -- order_id 可空：部分操作（如更新生产参数）不绑定具体订单
    order_id TEXT,
    owner_id TEXT,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    payload_json TEXT,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_production_order_owner
    ON production_order(owner_id, status, queue_position);
CREATE INDEX IF NOT EXISTS idx_action_log_action_ts
    ON action_log(action_ts);
CREATE INDEX IF NOT EXISTS idx_action_log_order_ts
    ON action_log(order_id, action_ts);

INSERT OR IGNORE INTO schema_version (version) VALUES (1);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        init_schema(&conn).unwrap();
        // 重复执行不应报错
        init_schema(&conn).unwrap();

        let version = read_schema_version(&conn).unwrap();
        assert_eq!(version, Some(CURRENT_SCHEMA_VERSION), "schema_version 应为当前版本");
    }

    #[test]
    fn test_read_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let version = read_schema_version(&conn).unwrap();
        assert!(version.is_none(), "无 schema_version 表时应返回 None");
    }
}
