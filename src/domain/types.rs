// ==========================================
// 柜员轮班排班引擎 - 领域类型定义
// ==========================================
// 职责: 角色/状态枚举与数据库编码
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 员工角色 (Worker Role)
// ==========================================
// 红线: 只有 TELLER 与 SUPERVISOR_TELLER 参与轮换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRole {
    Teller,           // 柜员
    SupervisorTeller, // 主管柜员 (参与轮换)
    Supervisor,       // 主管 (不参与轮换)
    Admin,            // 管理员 (不参与轮换)
}

impl WorkerRole {
    /// 判断是否参与轮换
    pub fn is_rotation_eligible(&self) -> bool {
        matches!(self, WorkerRole::Teller | WorkerRole::SupervisorTeller)
    }

    /// 从字符串解析角色 (未知值返回 None, 由调用方上浮错误)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TELLER" => Some(WorkerRole::Teller),
            "SUPERVISOR_TELLER" => Some(WorkerRole::SupervisorTeller),
            "SUPERVISOR" => Some(WorkerRole::Supervisor),
            "ADMIN" => Some(WorkerRole::Admin),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkerRole::Teller => "TELLER",
            WorkerRole::SupervisorTeller => "SUPERVISOR_TELLER",
            WorkerRole::Supervisor => "SUPERVISOR",
            WorkerRole::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 审批状态 (Worker Status)
// ==========================================
// 红线: 只有 APPROVED 员工可进入候选池
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Pending,  // 待审批
    Approved, // 已审批
    Rejected, // 已拒绝
}

impl WorkerStatus {
    /// 从字符串解析状态 (未知值返回 None, 由调用方上浮错误)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(WorkerStatus::Pending),
            "APPROVED" => Some(WorkerStatus::Approved),
            "REJECTED" => Some(WorkerStatus::Rejected),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkerStatus::Pending => "PENDING",
            WorkerStatus::Approved => "APPROVED",
            WorkerStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 排班状态 (Assignment Status)
// ==========================================
// 状态机: SCHEDULED → PRESENT / ABSENT / REPLACED
// 终态只能通过 ClearDay 清空后重新生成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Scheduled, // 已排班 (初始态)
    Present,   // 已到岗 (唯一累计工作日的路径)
    Absent,    // 缺勤 (可附带惩罚)
    Replaced,  // 已顶替
}

impl AssignmentStatus {
    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AssignmentStatus::Scheduled)
    }

    /// 从字符串解析状态 (未知值返回 None, 由调用方上浮错误)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SCHEDULED" => Some(AssignmentStatus::Scheduled),
            "PRESENT" => Some(AssignmentStatus::Present),
            "ABSENT" => Some(AssignmentStatus::Absent),
            "REPLACED" => Some(AssignmentStatus::Replaced),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Scheduled => "SCHEDULED",
            AssignmentStatus::Present => "PRESENT",
            AssignmentStatus::Absent => "ABSENT",
            AssignmentStatus::Replaced => "REPLACED",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
