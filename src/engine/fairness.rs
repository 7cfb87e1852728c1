// ==========================================
// 柜员轮班排班引擎 - 公平性评分核心
// ==========================================
// 职责: 加权生成策略的纯函数评分, 不做任何 I/O
// 说明: 输入统计量由引擎从仓储取出, 本模块只算分,
//       同输入必同输出, 便于单测穷举边界
// ==========================================

use crate::config::ScoreWeights;
use serde::{Deserialize, Serialize};

// ==========================================
// ScoreBreakdown - 评分明细
// ==========================================
/// 单个候选人的评分明细 (随排班记录落库, 供审计回溯)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 基础分
    pub base: i64,
    /// 近期频率项
    pub recency: i64,
    /// 停工时长项
    pub inactivity: i64,
    /// 均衡项
    pub balance: i64,
    /// 总分
    pub total: i64,
}

// ==========================================
// FairnessScorer - 公平性评分器
// ==========================================
/// 公平性评分器 (纯函数集合)
pub struct FairnessScorer;

impl FairnessScorer {
    /// 近期频率项
    ///
    /// # 规则
    /// - 近窗口内排班 0 次得满分, 每多 1 次递减一档
    /// - 达到档位总数后归零, 不出负分
    pub fn recency_term(weights: &ScoreWeights, recent_count: i64) -> i64 {
        weights.recency_step * (weights.recency_slots - recent_count).max(0)
    }

    /// 停工时长项
    ///
    /// # 规则
    /// - 从未排班: 固定加成
    /// - 有历史排班: 每停工一天加分, 封顶
    pub fn inactivity_term(weights: &ScoreWeights, days_since_last: Option<i64>) -> i64 {
        match days_since_last {
            None => weights.never_assigned_bonus,
            Some(days) => (weights.inactivity_per_day * days.max(0)).min(weights.inactivity_cap),
        }
    }

    /// 均衡项
    ///
    /// # 规则
    /// - 累计工作日严格低于在岗池均值时加分, 否则为零
    pub fn balance_term(
        weights: &ScoreWeights,
        total_work_days: i64,
        pool_mean: f64,
    ) -> i64 {
        if (total_work_days as f64) < pool_mean {
            weights.balance_bonus
        } else {
            0
        }
    }

    /// 综合评分
    ///
    /// # 参数
    /// - `recent_count`: 近窗口内的排班条数
    /// - `days_since_last`: 距最近一次排班的天数 (None 表示从未排班)
    /// - `total_work_days`: 累计到岗工作日
    /// - `pool_mean`: 在岗候选池的平均排班条数
    pub fn score(
        weights: &ScoreWeights,
        recent_count: i64,
        days_since_last: Option<i64>,
        total_work_days: i64,
        pool_mean: f64,
    ) -> ScoreBreakdown {
        let recency = Self::recency_term(weights, recent_count);
        let inactivity = Self::inactivity_term(weights, days_since_last);
        let balance = Self::balance_term(weights, total_work_days, pool_mean);
        ScoreBreakdown {
            base: weights.base,
            recency,
            inactivity,
            balance,
            total: weights.base + recency + inactivity + balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> ScoreWeights {
        ScoreWeights::default()
    }

    #[test]
    fn test_recency_term_steps() {
        let w = weights();
        assert_eq!(FairnessScorer::recency_term(&w, 0), 50);
        assert_eq!(FairnessScorer::recency_term(&w, 3), 35);
        assert_eq!(FairnessScorer::recency_term(&w, 10), 0);
        assert_eq!(FairnessScorer::recency_term(&w, 15), 0); // 超档归零, 不出负分
    }

    #[test]
    fn test_inactivity_term_capped() {
        let w = weights();
        assert_eq!(FairnessScorer::inactivity_term(&w, Some(0)), 0);
        assert_eq!(FairnessScorer::inactivity_term(&w, Some(5)), 15);
        assert_eq!(FairnessScorer::inactivity_term(&w, Some(10)), 30);
        assert_eq!(FairnessScorer::inactivity_term(&w, Some(400)), 30); // 封顶
    }

    #[test]
    fn test_inactivity_term_never_assigned() {
        let w = weights();
        assert_eq!(FairnessScorer::inactivity_term(&w, None), 50);
    }

    #[test]
    fn test_balance_term_strictly_below_mean() {
        let w = weights();
        assert_eq!(FairnessScorer::balance_term(&w, 4, 5.0), 20);
        assert_eq!(FairnessScorer::balance_term(&w, 5, 5.0), 0); // 等于均值不加分
        assert_eq!(FairnessScorer::balance_term(&w, 6, 5.0), 0);
    }

    #[test]
    fn test_score_composition() {
        let w = weights();
        // 近期 2 次, 停工 4 天, 工作日低于均值
        let b = FairnessScorer::score(&w, 2, Some(4), 3, 6.5);
        assert_eq!(b.base, 100);
        assert_eq!(b.recency, 40);
        assert_eq!(b.inactivity, 12);
        assert_eq!(b.balance, 20);
        assert_eq!(b.total, 172);
    }

    #[test]
    fn test_score_deterministic() {
        let w = weights();
        let a = FairnessScorer::score(&w, 1, Some(7), 2, 3.0);
        let b = FairnessScorer::score(&w, 1, Some(7), 2, 3.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_breakdown_serializes() {
        let w = weights();
        let b = FairnessScorer::score(&w, 0, None, 0, 0.0);
        let json = serde_json::to_string(&b).unwrap();
        let back: ScoreBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
