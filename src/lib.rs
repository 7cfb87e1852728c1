// ==========================================
// 柜员轮班排班引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 每日轮班与考勤决策引擎 (通知渠道由适配层接入)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AssignmentStatus, WorkerRole, WorkerStatus};

// 领域实体
pub use domain::{Assignment, Worker};

// 仓储
pub use repository::{
    AssignmentRepository, BatchInsertReport, RepositoryError, RepositoryResult,
    WorkerRepository,
};

// 引擎
pub use engine::{
    AttendanceResult, CalendarResolver, FairnessScorer, GenerateOutcome, GenerateResult,
    NoOpEventPublisher, OptionalEventPublisher, ResizeResult, RotationEngine, RotationError,
    RotationEvent, RotationEventPublisher, RotationEventType, RotationRepositories,
    RotationResult, ScoreBreakdown, SelectionStrategy, SuggestCandidate,
};

// 配置
pub use config::{RotationConfig, ScoreWeights};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "柜员轮班排班引擎";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
