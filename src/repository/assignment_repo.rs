// ==========================================
// 柜员轮班排班引擎 - 排班记录仓储
// ==========================================
// 职责: 排班记录的按日分区读写与条件更新
// 红线: Repository 不含业务逻辑
// 红线: (day_key, teller_id) 唯一约束由数据层拒绝重复插入,
//       不依赖应用层 check-then-insert
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::types::AssignmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{column_error, day_key_column};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// assignment 表的 SELECT 字段列表 (与 assignment_from_row 对齐)
const ASSIGNMENT_COLUMNS: &str = r#"
    assignment_id, day_key, teller_id, teller_name,
    supervisor_id, supervisor_name, status,
    absent_reason, penalty_days, score, score_detail, assigned_at
"#;

// ==========================================
// BatchInsertReport - 批量插入结果
// ==========================================
/// 批量插入结果
/// 策略: 冲突行跳过并上报, 其余行继续插入, 不整批回滚
#[derive(Debug, Clone, Default)]
pub struct BatchInsertReport {
    /// 成功插入的记录数
    pub inserted: usize,
    /// 因唯一约束冲突被跳过的柜员ID
    pub skipped_teller_ids: Vec<String>,
}

// ==========================================
// AssignmentRepository - 排班记录仓储
// ==========================================
/// 排班记录仓储
/// 职责: 管理 assignment 表的数据访问, 按 day_key 分区操作
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    /// 创建新的 AssignmentRepository 实例
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

    /// 插入单条排班记录
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 该柜员当日已有排班 (调用方按"已存在"处理)
    pub fn insert(&self, assignment: &Assignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_one(&conn, assignment)
    }

    /// 批量插入排班记录
    ///
    /// 单事务执行; 逐行捕获唯一约束冲突, 冲突行跳过并记入报告,
    /// 其余行继续插入 (部分成功策略)
    pub fn insert_batch(
        &self,
        assignments: &[Assignment],
    ) -> RepositoryResult<BatchInsertReport> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut report = BatchInsertReport::default();
        for assignment in assignments {
            match insert_one(&tx, assignment) {
                Ok(()) => report.inserted += 1,
                Err(e) if e.is_unique_violation() => {
                    report.skipped_teller_ids.push(assignment.teller_id.clone());
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// 查询某日全部排班 (按创建时间升序, 先选中者在前)
    pub fn find_by_day(&self, day_key: NaiveDate) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM assignment
            WHERE day_key = ?1
            ORDER BY assigned_at ASC, assignment_id ASC
            "#
        ))?;

        let assignments = stmt
            .query_map(params![day_key.to_string()], assignment_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(assignments)
    }

    /// 查询某日指定状态的排班
    pub fn find_by_day_with_status(
        &self,
        day_key: NaiveDate,
        status: AssignmentStatus,
    ) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM assignment
            WHERE day_key = ?1 AND status = ?2
            ORDER BY assigned_at ASC, assignment_id ASC
            "#
        ))?;

        let assignments = stmt
            .query_map(
                params![day_key.to_string(), status.to_db_str()],
                assignment_from_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(assignments)
    }

    /// 按自然键 (day_key, teller_id) 查询
    pub fn find_by_key(
        &self,
        day_key: NaiveDate,
        teller_id: &str,
    ) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignment WHERE day_key = ?1 AND teller_id = ?2"
        ))?;

        let result = stmt.query_row(
            params![day_key.to_string(), teller_id],
            assignment_from_row,
        );
        match result {
            Ok(assignment) => Ok(Some(assignment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按主键查询
    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignment WHERE assignment_id = ?1"
        ))?;

        let result = stmt.query_row(params![assignment_id], assignment_from_row);
        match result {
            Ok(assignment) => Ok(Some(assignment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 条件标记到岗: 仅当当前状态允许进入 PRESENT 时更新
    ///
    /// # 返回
    /// - Ok(true): 本次调用确实发生了状态转换 (调用方据此累计工作日)
    /// - Ok(false): 状态已是 PRESENT (幂等重放) 或记录不存在
    ///
    /// 红线: 双计防护下沉到 SQL 条件, 并发重试也不会二次生效
    pub fn mark_present(
        &self,
        day_key: NaiveDate,
        teller_id: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE assignment
            SET status = 'PRESENT'
            WHERE day_key = ?1 AND teller_id = ?2
              AND status IN ('SCHEDULED', 'ABSENT')
            "#,
            params![day_key.to_string(), teller_id],
        )?;
        Ok(affected > 0)
    }

    /// 条件标记缺勤: 写入缺勤原因与惩罚天数
    ///
    /// # 返回
    /// - Ok(true): 更新生效 (含重复标记缺勤时的原因覆写)
    /// - Ok(false): 记录不存在或处于 REPLACED 终态
    pub fn mark_absent(
        &self,
        day_key: NaiveDate,
        teller_id: &str,
        reason: &str,
        penalty_days: i64,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE assignment
            SET status = 'ABSENT', absent_reason = ?3, penalty_days = ?4
            WHERE day_key = ?1 AND teller_id = ?2
              AND status IN ('SCHEDULED', 'PRESENT', 'ABSENT')
            "#,
            params![day_key.to_string(), teller_id, reason, penalty_days],
        )?;
        Ok(affected > 0)
    }

    /// 顶替: 覆写柜员身份并置为 REPLACED
    pub fn replace_teller(
        &self,
        assignment_id: &str,
        teller_id: &str,
        teller_name: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE assignment
            SET teller_id = ?2, teller_name = ?3, status = 'REPLACED'
            WHERE assignment_id = ?1
            "#,
            params![assignment_id, teller_id, teller_name],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Assignment".to_string(),
                id: assignment_id.to_string(),
            });
        }
        Ok(())
    }

    /// 按主键批量删除 (Resize 缩容)
    pub fn delete_by_ids(&self, assignment_ids: &[String]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut deleted = 0;
        for id in assignment_ids {
            deleted += tx.execute(
                "DELETE FROM assignment WHERE assignment_id = ?1",
                params![id],
            )?;
        }

        tx.commit()?;
        Ok(deleted)
    }

    /// 清空整日分区 (管理员 ClearDay, 唯一的整日删除路径)
    pub fn delete_by_day(&self, day_key: NaiveDate) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM assignment WHERE day_key = ?1",
            params![day_key.to_string()],
        )?;
        Ok(deleted)
    }

    // ==========================================
    // 滑动窗口统计 (公平性评分输入)
    // ==========================================

    /// 统计柜员在 (after, until] 窗口内的排班条数
    pub fn count_in_window(
        &self,
        teller_id: &str,
        after: NaiveDate,
        until: NaiveDate,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM assignment
            WHERE teller_id = ?1 AND day_key > ?2 AND day_key <= ?3
            "#,
            params![teller_id, after.to_string(), until.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 查询柜员最近一次排班日
    pub fn last_assignment_day(
        &self,
        teller_id: &str,
    ) -> RepositoryResult<Option<NaiveDate>> {
        let conn = self.get_conn()?;
        let last: Option<String> = conn.query_row(
            "SELECT MAX(day_key) FROM assignment WHERE teller_id = ?1",
            params![teller_id],
            |row| row.get(0),
        )?;
        last.map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                RepositoryError::FieldValueError {
                    field: "day_key".to_string(),
                    message: format!("{s}: {e}"),
                }
            })
        })
        .transpose()
    }

    /// 统计柜员历史排班总条数
    pub fn total_count_for(&self, teller_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assignment WHERE teller_id = ?1",
            params![teller_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 统计柜员在 [from, to) 内确认到岗的不同天数 (Suggest 的近7日负荷)
    pub fn distinct_present_days(
        &self,
        teller_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(DISTINCT day_key) FROM assignment
            WHERE teller_id = ?1 AND status = 'PRESENT'
              AND day_key >= ?2 AND day_key < ?3
            "#,
            params![teller_id, from.to_string(), to.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 单条插入 (事务内外复用)
fn insert_one(conn: &Connection, assignment: &Assignment) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO assignment (
            assignment_id, day_key, teller_id, teller_name,
            supervisor_id, supervisor_name, status,
            absent_reason, penalty_days, score, score_detail, assigned_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            assignment.assignment_id,
            assignment.day_key.to_string(),
            assignment.teller_id,
            assignment.teller_name,
            assignment.supervisor_id,
            assignment.supervisor_name,
            assignment.status.to_db_str(),
            assignment.absent_reason,
            assignment.penalty_days,
            assignment.score,
            assignment.score_detail,
            assignment.assigned_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// assignment 表行映射 (坏列值上浮错误, 不落默认值)
fn assignment_from_row(row: &Row<'_>) -> SqliteResult<Assignment> {
    let status_raw: String = row.get(6)?;
    let assigned_at_raw: String = row.get(11)?;
    Ok(Assignment {
        assignment_id: row.get(0)?,
        day_key: day_key_column(1, &row.get::<_, String>(1)?)?,
        teller_id: row.get(2)?,
        teller_name: row.get(3)?,
        supervisor_id: row.get(4)?,
        supervisor_name: row.get(5)?,
        status: AssignmentStatus::from_str(&status_raw)
            .ok_or_else(|| column_error(6, format!("未知的排班状态值: {status_raw}")))?,
        absent_reason: row.get(7)?,
        penalty_days: row.get(8)?,
        score: row.get(9)?,
        score_detail: row.get(10)?,
        assigned_at: DateTime::parse_from_rfc3339(&assigned_at_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                column_error(11, format!("无效的时间列值 {assigned_at_raw}: {e}"))
            })?,
    })
}
