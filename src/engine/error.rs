// ==========================================
// 柜员轮班排班引擎 - 引擎层错误类型
// ==========================================
// 职责: 引擎操作的统一错误分类
// 约定: "无合格候选人" 与 "当日已生成" 是成功结果, 不走错误通道
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
///
/// 所有变更操作遵循"校验失败即中止, 不留半写状态":
/// Validation / NotFound 都在任何写入发生之前返回
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("数据验证失败: {0}")]
    Validation(String),

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    // 唯一约束冲突: 调用方应按"该柜员当日已有排班"处理, 可重新拉取当日列表
    #[error("排班冲突: {0}")]
    Conflict(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidTransition { from: String, to: String },

    #[error("仓储层错误: {0}")]
    Repository(RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 仓储错误按引擎分类上浮:
// 唯一约束 → Conflict, 记录缺失 → NotFound, 其余原样包裹
impl From<RepositoryError> for RotationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueConstraintViolation(msg) => RotationError::Conflict(msg),
            RepositoryError::NotFound { entity, id } => RotationError::NotFound { entity, id },
            RepositoryError::ValidationError(msg) => RotationError::Validation(msg),
            other => RotationError::Repository(other),
        }
    }
}

/// Result 类型别名
pub type RotationResult<T> = Result<T, RotationError>;
