// ==========================================
// 柜员轮班排班引擎 - 引擎层
// ==========================================
// 职责: 轮班决策编排, 公平性评分, 营业日历, 事件发布
// 红线: 引擎层只通过 Repository 访问数据, 不直接写 SQL
// ==========================================

pub mod calendar;
pub mod error;
pub mod events;
pub mod fairness;
pub mod repositories;
pub mod rotation;

// 重导出核心类型
pub use calendar::{CalendarResolver, NowSource, DAY_KEY_FORMAT};
pub use error::{RotationError, RotationResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, RotationEvent, RotationEventPublisher,
    RotationEventType,
};
pub use fairness::{FairnessScorer, ScoreBreakdown};
pub use repositories::RotationRepositories;
pub use rotation::{
    AttendanceResult, GenerateOutcome, GenerateResult, ResizeResult, RotationEngine,
    SelectionStrategy, SuggestCandidate,
};
