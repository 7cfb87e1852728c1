// ==========================================
// 柜员轮班排班引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - (day_key, teller_id) 唯一约束在建表时声明，幂等性由数据层兜底
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
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

/// 初始化数据库 schema（幂等，可重复执行）
///
/// # 约束
/// - `assignment(day_key, teller_id)` 唯一: 同一天同一柜员至多一条排班,
///   并发 Generate/Resize 重复插入由该约束拒绝
/// - `assignment.teller_id` 外键引用 `worker`
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS worker (
            worker_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,
            status TEXT NOT NULL,
            last_worked TEXT,
            total_work_days INTEGER NOT NULL DEFAULT 0,
            skip_until TEXT,
            last_absent_reason TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS assignment (
            assignment_id TEXT PRIMARY KEY,
            day_key TEXT NOT NULL,
            teller_id TEXT NOT NULL REFERENCES worker(worker_id),
            teller_name TEXT NOT NULL,
            supervisor_id TEXT,
            supervisor_name TEXT,
            status TEXT NOT NULL DEFAULT 'SCHEDULED',
            absent_reason TEXT,
            penalty_days INTEGER,
            score INTEGER,
            score_detail TEXT,
            assigned_at TEXT NOT NULL,
            UNIQUE (day_key, teller_id)
        );

        CREATE INDEX IF NOT EXISTS idx_assignment_day
            ON assignment (day_key);
        CREATE INDEX IF NOT EXISTS idx_assignment_teller_day
            ON assignment (teller_id, day_key);
        "#,
    )?;
    Ok(())
}
