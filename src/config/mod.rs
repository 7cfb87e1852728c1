// ==========================================
// 柜员轮班排班引擎 - 运行参数配置
// ==========================================
// 职责: 集中管理引擎的可调参数与公平性评分权重
// 说明: 所有默认值与生产环境对齐, 测试可按需覆盖单项
// ==========================================

use serde::{Deserialize, Serialize};

/// 默认目标班次人数
pub const DEFAULT_HEADCOUNT: usize = 3;

/// 默认营业时区相对 UTC 的小时偏移 (UTC+9)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

// ==========================================
// ScoreWeights - 公平性评分权重
// ==========================================
/// 加权生成策略的评分权重
///
/// # 评分构成
/// - 基础分: 所有候选人统一起点
/// - 近期频率项: 近窗口内排班越少加分越多, 逐档递减
/// - 停工时长项: 距上次排班越久加分越多, 设上限;
///   从未排班者给固定加成
/// - 均衡项: 累计工作日低于在岗池均值时加分
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// 基础分
    pub base: i64,
    /// 近期频率项: 每空一档的加分步长
    pub recency_step: i64,
    /// 近期频率项: 档位总数 (排班数达到该值后不再加分)
    pub recency_slots: i64,
    /// 停工时长项: 每停工一天的加分
    pub inactivity_per_day: i64,
    /// 停工时长项加分上限
    pub inactivity_cap: i64,
    /// 从未排班者的固定加成
    pub never_assigned_bonus: i64,
    /// 均衡项: 累计工作日低于均值时的加分
    pub balance_bonus: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            base: 100,
            recency_step: 5,
            recency_slots: 10,
            inactivity_per_day: 3,
            inactivity_cap: 30,
            never_assigned_bonus: 50,
            balance_bonus: 20,
        }
    }
}

// ==========================================
// RotationConfig - 引擎运行配置
// ==========================================
/// 轮班引擎运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// 默认目标班次人数
    pub desired_headcount: usize,
    /// 营业时区相对 UTC 的小时偏移 (参考日按此时区的民用日期计算)
    pub utc_offset_hours: i32,
    /// 近期频率统计窗口 (天)
    pub recent_window_days: i64,
    /// 顶替建议的近期负荷窗口 (天)
    pub suggest_window_days: i64,
    /// 公平性评分权重
    pub weights: ScoreWeights,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            desired_headcount: DEFAULT_HEADCOUNT,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            recent_window_days: 30,
            suggest_window_days: 7,
            weights: ScoreWeights::default(),
        }
    }
}
