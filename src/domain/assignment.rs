// ==========================================
// 柜员轮班排班引擎 - 排班领域模型
// ==========================================
// 职责: 单日排班记录与考勤状态机
// 红线: (day_key, teller_id) 全局唯一, 由数据层约束保证
// ==========================================

use crate::domain::types::AssignmentStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Assignment - 单日排班记录
// ==========================================
// 对齐: assignment 表
// 生命周期: 生成/扩容创建 → 考勤操作变更 → 仅 ClearDay 物理删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    // ===== 主键 =====
    pub assignment_id: String, // UUID v4

    // ===== 日分区键 =====
    pub day_key: NaiveDate, // 民用日期, 所有按日操作的分区键

    // ===== 被排班柜员 (创建时冗余姓名, 保证展示稳定) =====
    pub teller_id: String,
    pub teller_name: String,

    // ===== 值班主管 (纯信息字段, 轮换逻辑不依赖) =====
    pub supervisor_id: Option<String>,
    pub supervisor_name: Option<String>,

    // ===== 状态机 =====
    pub status: AssignmentStatus,

    // ===== 缺勤信息 (仅 ABSENT 转换时写入) =====
    pub absent_reason: Option<String>,
    pub penalty_days: Option<i64>,

    // ===== 加权生成审计 (仅加权策略写入) =====
    pub score: Option<i64>,          // 公平性总分
    pub score_detail: Option<String>, // 各评分项 JSON

    // ===== 创建时间 (Resize 缩容按此 LIFO 移除) =====
    pub assigned_at: DateTime<Utc>,
}

impl Assignment {
    /// 创建新的排班记录 (初始态 SCHEDULED)
    pub fn scheduled(
        day_key: NaiveDate,
        teller_id: String,
        teller_name: String,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            assignment_id: Uuid::new_v4().to_string(),
            day_key,
            teller_id,
            teller_name,
            supervisor_id: None,
            supervisor_name: None,
            status: AssignmentStatus::Scheduled,
            absent_reason: None,
            penalty_days: None,
            score: None,
            score_detail: None,
            assigned_at,
        }
    }

    /// 附加公平性评分审计信息 (加权生成策略)
    pub fn with_score(mut self, score: i64, detail_json: String) -> Self {
        self.score = Some(score);
        self.score_detail = Some(detail_json);
        self
    }

    /// 判断状态机是否允许从当前状态进入目标状态
    ///
    /// # 规则
    /// - SCHEDULED 可进入任意终态
    /// - 考勤纠错: ABSENT ↔ PRESENT 允许 (幂等 upsert 语义)
    /// - 其余终态间转换拒绝
    pub fn can_transition_to(&self, target: AssignmentStatus) -> bool {
        match (self.status, target) {
            (current, t) if current == t => true, // 幂等重放
            (AssignmentStatus::Scheduled, _) => true,
            (AssignmentStatus::Absent, AssignmentStatus::Present) => true,
            (AssignmentStatus::Present, AssignmentStatus::Absent) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled() -> Assignment {
        Assignment::scheduled(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "W1".to_string(),
            "김철수".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_scheduled_defaults() {
        let a = scheduled();
        assert_eq!(a.status, AssignmentStatus::Scheduled);
        assert!(a.absent_reason.is_none());
        assert!(a.penalty_days.is_none());
        assert!(a.score.is_none());
        assert!(!a.assignment_id.is_empty());
    }

    #[test]
    fn test_transitions_from_scheduled() {
        let a = scheduled();
        assert!(a.can_transition_to(AssignmentStatus::Present));
        assert!(a.can_transition_to(AssignmentStatus::Absent));
        assert!(a.can_transition_to(AssignmentStatus::Replaced));
    }

    #[test]
    fn test_attendance_correction_allowed() {
        let mut a = scheduled();
        a.status = AssignmentStatus::Absent;
        assert!(a.can_transition_to(AssignmentStatus::Present));
        a.status = AssignmentStatus::Present;
        assert!(a.can_transition_to(AssignmentStatus::Absent));
    }

    #[test]
    fn test_replaced_is_final() {
        let mut a = scheduled();
        a.status = AssignmentStatus::Replaced;
        assert!(!a.can_transition_to(AssignmentStatus::Present));
        assert!(!a.can_transition_to(AssignmentStatus::Absent));
        assert!(a.can_transition_to(AssignmentStatus::Replaced)); // 幂等
    }
}
