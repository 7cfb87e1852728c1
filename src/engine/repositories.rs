// ==========================================
// 柜员轮班排班引擎 - 仓储聚合
// ==========================================
// 职责: 打包引擎依赖的全部仓储, 共享同一底层连接
// ==========================================

use crate::repository::{AssignmentRepository, RepositoryResult, WorkerRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 引擎依赖的仓储聚合
///
/// 两个仓储共享同一 `Arc<Mutex<Connection>>`,
/// 保证条件更新与后续读取看到同一份数据
#[derive(Clone)]
pub struct RotationRepositories {
    pub worker_repo: Arc<WorkerRepository>,
    pub assignment_repo: Arc<AssignmentRepository>,
}

impl RotationRepositories {
    /// 从已有连接构建 (测试与嵌入场景)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            worker_repo: Arc::new(WorkerRepository::from_connection(conn.clone())),
            assignment_repo: Arc::new(AssignmentRepository::from_connection(conn)),
        }
    }

    /// 打开数据库文件并初始化 schema
    pub fn open_at(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path).map_err(|e| {
            crate::repository::RepositoryError::DatabaseConnectionError(e.to_string())
        })?;
        crate::db::init_schema(&conn).map_err(|e| {
            crate::repository::RepositoryError::DatabaseQueryError(e.to_string())
        })?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }
}
