// ==========================================
// 订单排产系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::{Order, OrderItem};
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str = r#"
    order_id, owner_id, customer_name, customer_email,
    status, total_production_minutes, estimated_completion_at, queue_position,
    production_started_at, production_minutes_accumulated,
    created_at, updated_at
"#;

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
/// 订单仓储
/// 职责: 管理 production_order / production_order_item 表的 CRUD 操作
/// 红线: 不含业务逻辑，只负责数据访问
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
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

    /// 插入订单及其产品行 (单事务)
    pub fn insert(&self, order: &Order) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO production_order (
                order_id, owner_id, customer_name, customer_email,
                status, total_production_minutes, estimated_completion_at, queue_position,
                production_started_at, production_minutes_accumulated,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                order.order_id,
                order.owner_id,
                order.customer_name,
                order.customer_email,
                order.status.to_db_str(),
                order.total_production_minutes,
                format_ts(order.estimated_completion_at),
                order.queue_position,
                order.production_started_at.map(format_ts),
                order.production_minutes_accumulated,
                format_ts(order.created_at),
                format_ts(order.updated_at),
            ],
        )?;

        for item in &order.items {
            tx.execute(
                r#"
                INSERT INTO production_order_item (
                    order_id, item_key, item_name, quantity, minutes_per_unit
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    order.order_id,
                    item.item_key,
                    item.item_name,
                    item.quantity,
                    item.minutes_per_unit,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 按主键查询订单 (含产品行)
    ///
    /// # 返回
    /// - Ok(Some(Order)): 找到订单
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_id(&self, owner_id: &str, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM production_order WHERE owner_id = ?1 AND order_id = ?2",
            ORDER_COLUMNS
        ))?;

        let result = stmt.query_row(params![owner_id, order_id], parse_order_row);

        match result {
            Ok(mut order) => {
                order.items = load_items(&conn, &order.order_id)?;
                Ok(Some(order))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询用户全部订单 (按队列位置升序)
    pub fn list_by_owner(&self, owner_id: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM production_order
            WHERE owner_id = ?1
            ORDER BY queue_position ASC, created_at ASC
            "#,
            ORDER_COLUMNS
        ))?;

        let mut orders = stmt
            .query_map(params![owner_id], parse_order_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        for order in &mut orders {
            order.items = load_items(&conn, &order.order_id)?;
        }
        Ok(orders)
    }

    /// 查询用户活跃订单 (pending/in-progress，按队列位置升序)
    pub fn list_active_by_owner(&self, owner_id: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM production_order
            WHERE owner_id = ?1 AND status IN ('pending', 'in-progress')
            ORDER BY queue_position ASC, created_at ASC
            "#,
            ORDER_COLUMNS
        ))?;

        let mut orders = stmt
            .query_map(params![owner_id], parse_order_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        for order in &mut orders {
            order.items = load_items(&conn, &order.order_id)?;
        }
        Ok(orders)
    }

    /// 查询全库生产中订单 (跨用户，用于生产节拍巡检)
    pub fn list_in_progress(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM production_order
            WHERE status = 'in-progress'
            ORDER BY owner_id ASC, queue_position ASC
            "#,
            ORDER_COLUMNS
        ))?;

        let mut orders = stmt
            .query_map([], parse_order_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        for order in &mut orders {
            order.items = load_items(&conn, &order.order_id)?;
        }
        Ok(orders)
    }

    /// 统计用户活跃订单数
    pub fn count_active(&self, owner_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            r#"
            SELECT COUNT(*) FROM production_order
            WHERE owner_id = ?1 AND status IN ('pending', 'in-progress')
            "#,
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 更新订单状态与生产计时字段
    ///
    /// # 返回
    /// - Ok(()): 更新成功
    /// - Err(NotFound): 订单不存在
    pub fn update_status_and_timing(
        &self,
        owner_id: &str,
        order_id: &str,
        status: OrderStatus,
        production_started_at: Option<NaiveDateTime>,
        production_minutes_accumulated: i64,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE production_order
            SET status = ?3,
                production_started_at = ?4,
                production_minutes_accumulated = ?5,
                updated_at = ?6
            WHERE owner_id = ?1 AND order_id = ?2
            "#,
            params![
                owner_id,
                order_id,
                status.to_db_str(),
                production_started_at.map(format_ts),
                production_minutes_accumulated,
                format_ts(updated_at),
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    /// 批量更新队列位置 (单事务)
    ///
    /// # 参数
    /// - `changes`: (order_id, 新位置) 列表
    ///
    /// # 返回
    /// - Ok(usize): 实际更新的订单数
    pub fn update_positions(
        &self,
        owner_id: &str,
        changes: &[(String, i64)],
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for (order_id, position) in changes {
            count += tx.execute(
                r#"
                UPDATE production_order
                SET queue_position = ?3, updated_at = ?4
                WHERE owner_id = ?1 AND order_id = ?2
                "#,
                params![owner_id, order_id, position, format_ts(updated_at)],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    /// 删除订单 (产品行经外键级联删除)
    ///
    /// # 返回
    /// - Ok(()): 删除成功
    /// - Err(NotFound): 订单不存在
    pub fn delete(&self, owner_id: &str, order_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM production_order WHERE owner_id = ?1 AND order_id = ?2",
            params![owner_id, order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 时间戳统一存储格式 (秒级，亚秒不入库)
fn format_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 解析时间戳字符串
fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap_or_else(|_| {
        chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_time(NaiveTime::MIN)
    })
}

/// 订单行映射 (列序与 ORDER_COLUMNS 一致)
fn parse_order_row(row: &rusqlite::Row<'_>) -> SqliteResult<Order> {
    Ok(Order {
        order_id: row.get(0)?,
        owner_id: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        items: Vec::new(), // 由调用方补载
        status: OrderStatus::from_str(&row.get::<_, String>(4)?),
        total_production_minutes: row.get(5)?,
        estimated_completion_at: parse_ts(&row.get::<_, String>(6)?),
        queue_position: row.get(7)?,
        production_started_at: row
            .get::<_, Option<String>>(8)?
            .map(|s| parse_ts(&s)),
        production_minutes_accumulated: row.get(9)?,
        created_at: parse_ts(&row.get::<_, String>(10)?),
        updated_at: parse_ts(&row.get::<_, String>(11)?),
    })
}

/// 加载订单产品行 (保持插入顺序)
fn load_items(conn: &Connection, order_id: &str) -> RepositoryResult<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT item_key, item_name, quantity, minutes_per_unit
        FROM production_order_item
        WHERE order_id = ?1
        ORDER BY rowid ASC
        "#,
    )?;

    let items = stmt
        .query_map(params![order_id], |row| {
            Ok(OrderItem {
                item_key: row.get(0)?,
                item_name: row.get(1)?,
                quantity: row.get(2)?,
                minutes_per_unit: row.get(3)?,
            })
        })?
        .collect::<SqliteResult<Vec<_>>>()?;

    Ok(items)
}
