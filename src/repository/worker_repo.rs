// ==========================================
// 柜员轮班排班引擎 - 员工名册仓储
// ==========================================
// 职责: 员工名册的资格查询与轮换聚合字段维护
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::types::{WorkerRole, WorkerStatus};
use crate::domain::worker::Worker;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{column_error, day_key_column};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// worker 表的 SELECT 字段列表 (与 worker_from_row 对齐)
const WORKER_COLUMNS: &str = r#"
    worker_id, display_name, username, role, status,
    last_worked, total_work_days, skip_until, last_absent_reason
"#;

// ==========================================
// WorkerRepository - 员工名册仓储
// ==========================================
/// 员工名册仓储
/// 职责: 管理 worker 表的数据访问
/// 引擎只通过本仓储写 last_worked / total_work_days / skip_until / last_absent_reason
pub struct WorkerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkerRepository {
    /// 创建新的 WorkerRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入员工 (注册/测试数据准备)
    pub fn insert(&self, worker: &Worker) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO worker (
                worker_id, display_name, username, role, status,
                last_worked, total_work_days, skip_until, last_absent_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                worker.worker_id,
                worker.display_name,
                worker.username,
                worker.role.to_db_str(),
                worker.status.to_db_str(),
                worker.last_worked.map(|d| d.to_string()),
                worker.total_work_days,
                worker.skip_until.map(|d| d.to_string()),
                worker.last_absent_reason,
            ],
        )?;
        Ok(())
    }

    /// 按主键查询
    ///
    /// # 返回
    /// - Ok(Some(Worker)): 找到员工
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_id(&self, worker_id: &str) -> RepositoryResult<Option<Worker>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker WHERE worker_id = ?1"
        ))?;

        let result = stmt.query_row(params![worker_id], worker_from_row);
        match result {
            Ok(worker) => Ok(Some(worker)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询目标日的合格候选员工 (公平轮换排序)
    ///
    /// # 规则
    /// - 角色 ∈ {TELLER, SUPERVISOR_TELLER}
    /// - 状态 = APPROVED
    /// - skip_until 为空 或 skip_until ≤ 目标日 (惩罚窗口边界: 等于当日恢复资格)
    /// - 排序: 从未排班者最前, 其后按 (last_worked, total_work_days) 升序,
    ///   worker_id 作稳定兜底
    ///
    /// # 参数
    /// - `day_key`: 目标日
    /// - `limit`: 返回数量上限 (None 表示不限)
    pub fn find_eligible(
        &self,
        day_key: NaiveDate,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {WORKER_COLUMNS}
            FROM worker
            WHERE role IN ('TELLER', 'SUPERVISOR_TELLER')
              AND status = 'APPROVED'
              AND (skip_until IS NULL OR skip_until <= ?1)
            ORDER BY
                CASE WHEN last_worked IS NULL THEN 0 ELSE 1 END ASC,
                last_worked ASC,
                total_work_days ASC,
                worker_id ASC
            LIMIT ?2
            "#
        ))?;

        let limit_param = limit.map(|n| n as i64).unwrap_or(-1);
        let workers = stmt
            .query_map(params![day_key.to_string(), limit_param], worker_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(workers)
    }

    /// 查询目标日的合格且尚未被排班的候选员工 (公平轮换排序)
    ///
    /// Resize 扩容与 Suggest 使用: 已持有该日排班的员工不再入池
    pub fn find_eligible_unassigned(
        &self,
        day_key: NaiveDate,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {WORKER_COLUMNS}
            FROM worker w
            WHERE w.role IN ('TELLER', 'SUPERVISOR_TELLER')
              AND w.status = 'APPROVED'
              AND (w.skip_until IS NULL OR w.skip_until <= ?1)
              AND NOT EXISTS (
                  SELECT 1 FROM assignment a
                  WHERE a.day_key = ?1 AND a.teller_id = w.worker_id
              )
            ORDER BY
                CASE WHEN w.last_worked IS NULL THEN 0 ELSE 1 END ASC,
                w.last_worked ASC,
                w.total_work_days ASC,
                w.worker_id ASC
            LIMIT ?2
            "#
        ))?;

        let limit_param = limit.map(|n| n as i64).unwrap_or(-1);
        let workers = stmt
            .query_map(params![day_key.to_string(), limit_param], worker_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(workers)
    }

    /// 更新最近排班日 (生成/扩容/顶替路径)
    ///
    /// 红线: 此路径不得触碰 total_work_days
    pub fn touch_last_worked(
        &self,
        worker_id: &str,
        day_key: NaiveDate,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE worker SET last_worked = ?2 WHERE worker_id = ?1",
            params![worker_id, day_key.to_string()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Worker".to_string(),
                id: worker_id.to_string(),
            });
        }
        Ok(())
    }

    /// 记录到岗: total_work_days + 1 并刷新 last_worked
    ///
    /// 红线: 仅 MarkPresent 路径调用, 且调用方必须先通过
    /// assignment 侧的条件更新确认本次确实发生了状态转换,
    /// 否则重复调用会造成工作量双计
    pub fn record_presence(
        &self,
        worker_id: &str,
        day_key: NaiveDate,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE worker
            SET total_work_days = total_work_days + 1,
                last_worked = ?2
            WHERE worker_id = ?1
            "#,
            params![worker_id, day_key.to_string()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Worker".to_string(),
                id: worker_id.to_string(),
            });
        }
        Ok(())
    }

    /// 写入惩罚窗口: skip_until + 缺勤原因审计字段
    pub fn apply_penalty(
        &self,
        worker_id: &str,
        skip_until: NaiveDate,
        reason: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE worker
            SET skip_until = ?2, last_absent_reason = ?3
            WHERE worker_id = ?1
            "#,
            params![worker_id, skip_until.to_string(), reason],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Worker".to_string(),
                id: worker_id.to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// worker 表行映射 (坏列值上浮错误, 不落默认值)
fn worker_from_row(row: &Row<'_>) -> SqliteResult<Worker> {
    let role_raw: String = row.get(3)?;
    let status_raw: String = row.get(4)?;
    Ok(Worker {
        worker_id: row.get(0)?,
        display_name: row.get(1)?,
        username: row.get(2)?,
        role: WorkerRole::from_str(&role_raw)
            .ok_or_else(|| column_error(3, format!("未知的角色值: {role_raw}")))?,
        status: WorkerStatus::from_str(&status_raw)
            .ok_or_else(|| column_error(4, format!("未知的审批状态值: {status_raw}")))?,
        last_worked: row
            .get::<_, Option<String>>(5)?
            .map(|s| day_key_column(5, &s))
            .transpose()?,
        total_work_days: row.get(6)?,
        skip_until: row
            .get::<_, Option<String>>(7)?
            .map(|s| day_key_column(7, &s))
            .transpose()?,
        last_absent_reason: row.get(8)?,
    })
}
