// ==========================================
// 柜员轮班排班引擎 - 员工领域模型
// ==========================================
// 职责: 员工实体与轮换资格判定
// 红线: total_work_days 只在 PRESENT 转换时累加
// ==========================================

use crate::domain::types::{WorkerRole, WorkerStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Worker - 员工
// ==========================================
// 对齐: worker 表
// 引擎只读取资格字段, 只写 last_worked / total_work_days /
// skip_until / last_absent_reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    // ===== 身份 =====
    pub worker_id: String,    // 唯一ID
    pub display_name: String, // 显示名 (排班时冗余到 assignment)
    pub username: String,     // 登录名 (唯一)

    // ===== 资格门槛 =====
    pub role: WorkerRole,     // 角色
    pub status: WorkerStatus, // 审批状态

    // ===== 轮换聚合字段 =====
    pub last_worked: Option<NaiveDate>, // 最近一次排班/到岗日
    pub total_work_days: i64,           // 累计确认到岗天数 (非排班天数)

    // ===== 惩罚窗口 =====
    pub skip_until: Option<NaiveDate>,     // 在此日期之前被排除 (等于当日即恢复资格)
    pub last_absent_reason: Option<String>, // 最近缺勤原因 (审计)
}

impl Worker {
    /// 创建新员工 (聚合字段全部置空)
    pub fn new(
        worker_id: String,
        display_name: String,
        username: String,
        role: WorkerRole,
        status: WorkerStatus,
    ) -> Self {
        Self {
            worker_id,
            display_name,
            username,
            role,
            status,
            last_worked: None,
            total_work_days: 0,
            skip_until: None,
            last_absent_reason: None,
        }
    }

    /// 判断是否对目标日具备轮换资格
    ///
    /// # 规则
    /// 1. 角色 ∈ {TELLER, SUPERVISOR_TELLER}
    /// 2. 状态 = APPROVED
    /// 3. skip_until 为空 或 skip_until ≤ 目标日
    ///    (惩罚仅在 skip_until 严格大于目标日时生效)
    pub fn is_eligible_for(&self, day_key: NaiveDate) -> bool {
        self.role.is_rotation_eligible()
            && self.status == WorkerStatus::Approved
            && self.skip_until.map_or(true, |until| until <= day_key)
    }

    /// 判断目标日是否处于惩罚窗口内
    pub fn is_penalized_on(&self, day_key: NaiveDate) -> bool {
        self.skip_until.map_or(false, |until| until > day_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teller(skip_until: Option<NaiveDate>) -> Worker {
        Worker {
            skip_until,
            ..Worker::new(
                "W1".to_string(),
                "김철수".to_string(),
                "teller01".to_string(),
                WorkerRole::Teller,
                WorkerStatus::Approved,
            )
        }
    }

    #[test]
    fn test_eligibility_requires_approval() {
        let mut w = teller(None);
        assert!(w.is_eligible_for(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
        w.status = WorkerStatus::Pending;
        assert!(!w.is_eligible_for(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
    }

    #[test]
    fn test_eligibility_requires_rotation_role() {
        let mut w = teller(None);
        w.role = WorkerRole::Admin;
        assert!(!w.is_eligible_for(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
    }

    #[test]
    fn test_skip_until_boundary() {
        // skip_until = 6月15日: 14日仍被排除, 15日当天恢复资格
        let until = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let w = teller(Some(until));
        assert!(!w.is_eligible_for(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()));
        assert!(w.is_eligible_for(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()));
        assert!(w.is_eligible_for(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()));
        assert!(w.is_penalized_on(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()));
        assert!(!w.is_penalized_on(until));
    }
}
