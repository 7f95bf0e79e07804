// ==========================================
// 订单排产系统 - 生产参数数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::settings::{ProductionSettings, SettingsItem};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// SettingsRepository - 生产参数仓储
// ==========================================
/// 生产参数仓储
/// 职责: 管理 production_settings / production_settings_item 表
/// 说明: 未持久化的用户读取时由上层返回默认参数，本层只负责存取
pub struct SettingsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsRepository {
    /// 创建新的 SettingsRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询用户生产参数 (含产品单耗行)
    ///
    /// # 返回
    /// - Ok(Some): 该用户已保存过参数
    /// - Ok(None): 尚未保存，由调用方决定是否使用默认值
    pub fn find_by_owner(&self, owner_id: &str) -> RepositoryResult<Option<ProductionSettings>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT owner_id, working_hours_per_day, start_time, end_time,
                   working_days, updated_at
            FROM production_settings
            WHERE owner_id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![owner_id], |row| {
            let working_days_json: String = row.get(4)?;
            let updated_at_str: String = row.get(5)?;
            Ok(ProductionSettings {
                owner_id: row.get(0)?,
                items: Vec::new(), // 由下方补载
                working_hours_per_day: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                working_days: serde_json::from_str(&working_days_json).unwrap_or_default(),
                updated_at: parse_ts(&updated_at_str),
            })
        });

        match result {
            Ok(mut settings) => {
                settings.items = load_items(&conn, owner_id)?;
                Ok(Some(settings))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 保存用户生产参数 (upsert，单事务)
    ///
    /// 产品单耗行整体替换，sort_order 按传入顺序写入
    pub fn upsert(&self, settings: &ProductionSettings) -> RepositoryResult<()> {
        let working_days_json = serde_json::to_string(&settings.working_days)
            .map_err(|e| RepositoryError::FieldValueError {
                field: "working_days".to_string(),
                message: e.to_string(),
            })?;

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO production_settings (
                owner_id, working_hours_per_day, start_time, end_time,
                working_days, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(owner_id) DO UPDATE SET
                working_hours_per_day = ?2,
                start_time = ?3,
                end_time = ?4,
                working_days = ?5,
                updated_at = ?6
            "#,
            params![
                settings.owner_id,
                settings.working_hours_per_day,
                settings.start_time,
                settings.end_time,
                working_days_json,
                settings.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        tx.execute(
            "DELETE FROM production_settings_item WHERE owner_id = ?1",
            params![settings.owner_id],
        )?;

        for (idx, item) in settings.items.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO production_settings_item (
                    owner_id, item_key, item_name, minutes_per_unit, sort_order
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    settings.owner_id,
                    item.item_key,
                    item.item_name,
                    item.minutes_per_unit,
                    idx as i64,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 解析时间戳字符串
fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap_or_else(|_| {
        chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_time(NaiveTime::MIN)
    })
}

/// 加载产品单耗行 (按 sort_order 排序)
fn load_items(conn: &Connection, owner_id: &str) -> RepositoryResult<Vec<SettingsItem>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT item_key, item_name, minutes_per_unit
        FROM production_settings_item
        WHERE owner_id = ?1
        ORDER BY sort_order ASC
        "#,
    )?;

    let items = stmt
        .query_map(params![owner_id], |row| {
            Ok(SettingsItem {
                item_key: row.get(0)?,
                item_name: row.get(1)?,
                minutes_per_unit: row.get(2)?,
            })
        })?
        .collect::<SqliteResult<Vec<_>>>()?;

    Ok(items)
}
