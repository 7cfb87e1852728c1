// ==========================================
// 柜员轮班排班引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod types;
pub mod worker;

// 重导出核心类型
pub use assignment::Assignment;
pub use types::{AssignmentStatus, WorkerRole, WorkerStatus};
pub use worker::Worker;
