// ==========================================
// 柜员轮班排班引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod assignment_repo;
pub mod error;
pub mod worker_repo;

// 重导出核心仓储
pub use assignment_repo::{AssignmentRepository, BatchInsertReport};
pub use error::{RepositoryError, RepositoryResult};
pub use worker_repo::WorkerRepository;

use chrono::NaiveDate;

// ==========================================
// 行映射辅助
// ==========================================
// 红线: 坏列值上浮为错误, 不得用默认值掩盖数据损坏

/// 列值转换失败
pub(crate) fn column_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

/// 解析日期列 (存储格式 %Y-%m-%d)
pub(crate) fn day_key_column(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| column_error(idx, format!("无效的日期列值 {raw}: {e}")))
}
