// ==========================================
// 柜员轮班排班引擎 - 引擎层事件发布
// ==========================================
// 职责: 定义轮班事件发布 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, 通知适配层 (IM 机器人等) 实现
// 红线: 事件为"即发即忘", 发布失败绝不回滚已提交的排班操作
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 轮班事件类型
// ==========================================

/// 轮班事件触发类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationEventType {
    /// 当日排班生成
    ScheduleGenerated,
    /// 班次人数调整
    ScheduleResized,
    /// 考勤标记 (到岗/缺勤)
    AttendanceMarked,
    /// 柜员顶替
    AssignmentReplaced,
    /// 整日排班清除
    DayCleared,
}

impl RotationEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            RotationEventType::ScheduleGenerated => "ScheduleGenerated",
            RotationEventType::ScheduleResized => "ScheduleResized",
            RotationEventType::AttendanceMarked => "AttendanceMarked",
            RotationEventType::AssignmentReplaced => "AssignmentReplaced",
            RotationEventType::DayCleared => "DayCleared",
        }
    }
}

/// 轮班事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationEvent {
    /// 事件涉及的营业日
    pub day_key: NaiveDate,
    /// 事件类型
    pub event_type: RotationEventType,
    /// 涉及的柜员 (整日事件为 None)
    pub teller_id: Option<String>,
    /// 事件来源描述
    pub source: Option<String>,
}

impl RotationEvent {
    /// 创建整日事件
    pub fn for_day(day_key: NaiveDate, event_type: RotationEventType) -> Self {
        Self {
            day_key,
            event_type,
            teller_id: None,
            source: Some("RotationEngine".to_string()),
        }
    }

    /// 创建单柜员事件
    pub fn for_teller(
        day_key: NaiveDate,
        event_type: RotationEventType,
        teller_id: String,
    ) -> Self {
        Self {
            day_key,
            event_type,
            teller_id: Some(teller_id),
            source: Some("RotationEngine".to_string()),
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 轮班事件发布者 Trait
///
/// Engine 层定义, 通知适配层实现
/// 通过 trait 实现依赖倒置, Engine 不依赖任何具体通知渠道
pub trait RotationEventPublisher: Send + Sync {
    /// 发布轮班事件
    ///
    /// # 返回
    /// - `Err`: 发布失败 (调用方只记日志, 不影响业务结果)
    fn publish(&self, event: RotationEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景 (如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl RotationEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: RotationEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - day_key={}, event_type={}",
            event.day_key,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn RotationEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn RotationEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn RotationEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例 (不发布事件)
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (如果有发布者)
    pub fn publish(&self, event: RotationEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者, 跳过事件 - day_key={}, event_type={}",
                    event.day_key,
                    event.event_type.as_str()
                );
                Ok(())
            }
        }
    }

    /// 即发即忘: 失败只记 warn, 绝不向调用方传播
    pub fn publish_lossy(&self, event: RotationEvent) {
        let event_type = event.event_type.clone();
        let day_key = event.day_key;
        if let Err(e) = self.publish(event) {
            tracing::warn!(
                "事件发布失败 (不影响业务结果) - day_key={}, event_type={}, err={}",
                day_key,
                event_type.as_str(),
                e
            );
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
