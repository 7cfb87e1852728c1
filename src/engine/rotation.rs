// ==========================================
// 柜员轮班排班引擎 - 轮班决策引擎
// ==========================================
// 职责: 编排八个核心操作 (生成/扩缩容/加权生成/考勤/顶替/建议/清除)
// 红线: 幂等性与唯一性由数据层约束兜底, 引擎只做先行校验与编排
// 红线: 事件发布即发即忘, 失败不回滚业务写入
// ==========================================

use crate::config::RotationConfig;
use crate::domain::assignment::Assignment;
use crate::domain::types::AssignmentStatus;
use crate::domain::worker::Worker;
use crate::engine::calendar::CalendarResolver;
use crate::engine::error::{RotationError, RotationResult};
use crate::engine::events::{OptionalEventPublisher, RotationEvent, RotationEventType};
use crate::engine::fairness::FairnessScorer;
use crate::engine::repositories::RotationRepositories;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

// ==========================================
// 操作结果类型
// ==========================================

/// 生成操作的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerateOutcome {
    /// 本次调用创建了当日排班
    Created,
    /// 当日已有排班, 原样返回 (幂等重放)
    AlreadyExists,
    /// 无合格候选人, 返回空班次 (成功结果, 非错误)
    NoEligibleCandidates,
}

/// 候选人选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionStrategy {
    /// 公平轮换排序 (最久未排班优先)
    Rotation,
    /// 公平性加权评分
    Weighted,
}

/// 生成操作结果
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub day_key: NaiveDate,
    pub outcome: GenerateOutcome,
    pub strategy: SelectionStrategy,
    /// 当日最终排班列表 (含并发插入的他方记录)
    pub assignments: Vec<Assignment>,
    /// 因唯一约束冲突被跳过的柜员 (并发生成的痕迹)
    pub skipped_teller_ids: Vec<String>,
}

/// 扩缩容操作结果
#[derive(Debug, Clone, Serialize)]
pub struct ResizeResult {
    pub day_key: NaiveDate,
    pub desired_count: usize,
    pub previous_count: usize,
    pub resulting_count: usize,
    pub added: usize,
    pub removed: usize,
    pub skipped_teller_ids: Vec<String>,
    pub assignments: Vec<Assignment>,
}

/// 考勤操作结果
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceResult {
    pub assignment: Assignment,
    /// 本次调用是否真正发生了状态转换 (false = 幂等重放)
    pub transitioned: bool,
    /// 缺勤惩罚生效时写入的恢复日 (该日起恢复资格)
    pub skip_until: Option<NaiveDate>,
}

/// 顶替建议候选人
#[derive(Debug, Clone, Serialize)]
pub struct SuggestCandidate {
    pub worker: Worker,
    /// 近窗口内确认到岗的不同天数 (越小越该被建议)
    pub present_days_recent: i64,
}

// ==========================================
// RotationEngine - 轮班决策引擎
// ==========================================

/// 轮班决策引擎
///
/// 所有按日操作以 `day_key` 为分区键; 目标日由注入的
/// [`CalendarResolver`] 按营业时区裁决, 引擎自身不读系统时钟
pub struct RotationEngine {
    repos: RotationRepositories,
    calendar: CalendarResolver,
    config: RotationConfig,
    events: OptionalEventPublisher,
}

impl RotationEngine {
    /// 创建引擎实例 (无事件发布)
    pub fn new(
        repos: RotationRepositories,
        calendar: CalendarResolver,
        config: RotationConfig,
    ) -> Self {
        Self {
            repos,
            calendar,
            config,
            events: OptionalEventPublisher::none(),
        }
    }

    /// 创建带事件发布者的引擎实例
    pub fn with_event_publisher(
        repos: RotationRepositories,
        calendar: CalendarResolver,
        config: RotationConfig,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            repos,
            calendar,
            config,
            events,
        }
    }

    /// 营业日历 (调用方解析 day_key / 偏移量用)
    pub fn calendar(&self) -> &CalendarResolver {
        &self.calendar
    }

    /// 默认目标班次人数
    pub fn default_headcount(&self) -> usize {
        self.config.desired_headcount
    }

    // ==========================================
    // 生成与扩缩容
    // ==========================================

    /// 生成或取回当日排班 (幂等)
    ///
    /// # 规则
    /// - 当日已有排班: 原样返回, 不重复生成
    /// - 候选人按公平轮换排序取前 desired_count 名
    /// - 候选不足 desired_count: 有多少排多少
    /// - 无合格候选: 返回空班次的成功结果
    #[instrument(skip(self))]
    pub fn generate_or_fetch(
        &self,
        day_key: NaiveDate,
        desired_count: usize,
    ) -> RotationResult<GenerateResult> {
        ensure_positive_headcount(desired_count)?;

        let existing = self.repos.assignment_repo.find_by_day(day_key)?;
        if !existing.is_empty() {
            info!("当日排班已存在, 幂等返回 - day_key={}, count={}", day_key, existing.len());
            return Ok(GenerateResult {
                day_key,
                outcome: GenerateOutcome::AlreadyExists,
                strategy: SelectionStrategy::Rotation,
                assignments: existing,
                skipped_teller_ids: Vec::new(),
            });
        }

        let candidates = self
            .repos
            .worker_repo
            .find_eligible(day_key, Some(desired_count))?;
        if candidates.is_empty() {
            warn!("无合格候选人, 返回空班次 - day_key={}", day_key);
            return Ok(GenerateResult {
                day_key,
                outcome: GenerateOutcome::NoEligibleCandidates,
                strategy: SelectionStrategy::Rotation,
                assignments: Vec::new(),
                skipped_teller_ids: Vec::new(),
            });
        }

        let batch: Vec<Assignment> = candidates
            .iter()
            .map(|w| {
                Assignment::scheduled(
                    day_key,
                    w.worker_id.clone(),
                    w.display_name.clone(),
                    self.calendar.now_utc(),
                )
            })
            .collect();
        let skipped = self.persist_batch(day_key, &candidates, &batch)?;

        info!(
            "当日排班已生成 - day_key={}, inserted={}, skipped={}",
            day_key,
            candidates.len() - skipped.len(),
            skipped.len()
        );
        self.events
            .publish_lossy(RotationEvent::for_day(day_key, RotationEventType::ScheduleGenerated));

        Ok(GenerateResult {
            day_key,
            outcome: GenerateOutcome::Created,
            strategy: SelectionStrategy::Rotation,
            assignments: self.repos.assignment_repo.find_by_day(day_key)?,
            skipped_teller_ids: skipped,
        })
    }

    /// 调整当日班次人数 (向目标值收敛, 幂等)
    ///
    /// # 规则
    /// - 扩容: 补入尚未持有该日排班的合格候选人
    /// - 缩容: 按创建时间后进先出移除, 最早选中者最受保护
    /// - 已等于目标值: 无操作
    #[instrument(skip(self))]
    pub fn resize(
        &self,
        day_key: NaiveDate,
        desired_count: usize,
    ) -> RotationResult<ResizeResult> {
        ensure_positive_headcount(desired_count)?;

        let current = self.repos.assignment_repo.find_by_day(day_key)?;
        let previous_count = current.len();

        let mut added = 0usize;
        let mut removed = 0usize;
        let mut skipped = Vec::new();

        if previous_count < desired_count {
            let needed = desired_count - previous_count;
            let extras = self
                .repos
                .worker_repo
                .find_eligible_unassigned(day_key, Some(needed))?;
            if !extras.is_empty() {
                let batch: Vec<Assignment> = extras
                    .iter()
                    .map(|w| {
                        Assignment::scheduled(
                            day_key,
                            w.worker_id.clone(),
                            w.display_name.clone(),
                            self.calendar.now_utc(),
                        )
                    })
                    .collect();
                skipped = self.persist_batch(day_key, &extras, &batch)?;
                added = extras.len() - skipped.len();
            }
        } else if previous_count > desired_count {
            // find_by_day 按 assigned_at 升序, 尾部即最后加入者
            let excess_ids: Vec<String> = current
                .iter()
                .rev()
                .take(previous_count - desired_count)
                .map(|a| a.assignment_id.clone())
                .collect();
            removed = self.repos.assignment_repo.delete_by_ids(&excess_ids)?;
        }

        if added > 0 || removed > 0 {
            info!(
                "班次人数已调整 - day_key={}, {} -> 目标 {}, added={}, removed={}",
                day_key, previous_count, desired_count, added, removed
            );
            self.events
                .publish_lossy(RotationEvent::for_day(day_key, RotationEventType::ScheduleResized));
        }

        let assignments = self.repos.assignment_repo.find_by_day(day_key)?;
        Ok(ResizeResult {
            day_key,
            desired_count,
            previous_count,
            resulting_count: assignments.len(),
            added,
            removed,
            skipped_teller_ids: skipped,
            assignments,
        })
    }

    /// 加权生成当日排班 (幂等)
    ///
    /// # 规则
    /// - 候选池限定为参考日 (营业时区的今天) 确认到岗的柜员
    /// - 按公平性评分降序选取, 同分按 worker_id 升序保证确定性
    /// - 参考日无人到岗: 回退到公平轮换排序策略
    /// - 每条排班落库评分与明细 JSON, 供审计回溯
    #[instrument(skip(self))]
    pub fn generate_weighted(
        &self,
        day_key: NaiveDate,
        desired_count: usize,
    ) -> RotationResult<GenerateResult> {
        ensure_positive_headcount(desired_count)?;

        let existing = self.repos.assignment_repo.find_by_day(day_key)?;
        if !existing.is_empty() {
            return Ok(GenerateResult {
                day_key,
                outcome: GenerateOutcome::AlreadyExists,
                strategy: SelectionStrategy::Weighted,
                assignments: existing,
                skipped_teller_ids: Vec::new(),
            });
        }

        let reference_day = self.calendar.today();
        let present_today = self
            .repos
            .assignment_repo
            .find_by_day_with_status(reference_day, AssignmentStatus::Present)?;
        if present_today.is_empty() {
            info!(
                "参考日无人到岗, 回退公平轮换策略 - reference={}, day_key={}",
                reference_day, day_key
            );
            return self.generate_or_fetch(day_key, desired_count);
        }

        // 候选池去重并保证遍历顺序确定
        let pool_ids: BTreeSet<String> = present_today
            .iter()
            .map(|a| a.teller_id.clone())
            .collect();

        let mut pool = Vec::new();
        for teller_id in &pool_ids {
            if let Some(worker) = self.repos.worker_repo.find_by_id(teller_id)? {
                if worker.is_eligible_for(day_key) {
                    pool.push(worker);
                }
            }
        }
        if pool.is_empty() {
            warn!("到岗池中无合格候选人, 返回空班次 - day_key={}", day_key);
            return Ok(GenerateResult {
                day_key,
                outcome: GenerateOutcome::NoEligibleCandidates,
                strategy: SelectionStrategy::Weighted,
                assignments: Vec::new(),
                skipped_teller_ids: Vec::new(),
            });
        }

        // 候选池平均排班条数 (均衡项的比较基线)
        let mut total_counts = Vec::with_capacity(pool.len());
        for worker in &pool {
            total_counts.push(self.repos.assignment_repo.total_count_for(&worker.worker_id)?);
        }
        let pool_mean = total_counts.iter().sum::<i64>() as f64 / pool.len() as f64;

        let window_start = self
            .calendar
            .add_days(reference_day, -self.config.recent_window_days)?;
        let mut scored = Vec::with_capacity(pool.len());
        for worker in pool {
            let recent = self.repos.assignment_repo.count_in_window(
                &worker.worker_id,
                window_start,
                reference_day,
            )?;
            let days_since = self
                .repos
                .assignment_repo
                .last_assignment_day(&worker.worker_id)?
                .map(|last| (reference_day - last).num_days());
            let breakdown = FairnessScorer::score(
                &self.config.weights,
                recent,
                days_since,
                worker.total_work_days,
                pool_mean,
            );
            scored.push((worker, breakdown));
        }
        scored.sort_by(|(wa, ba), (wb, bb)| {
            bb.total
                .cmp(&ba.total)
                .then_with(|| wa.worker_id.cmp(&wb.worker_id))
        });
        scored.truncate(desired_count);

        let mut selected = Vec::with_capacity(scored.len());
        let mut batch = Vec::with_capacity(scored.len());
        for (worker, breakdown) in scored {
            let detail = serde_json::to_string(&breakdown).map_err(anyhow::Error::from)?;
            batch.push(
                Assignment::scheduled(
                    day_key,
                    worker.worker_id.clone(),
                    worker.display_name.clone(),
                    self.calendar.now_utc(),
                )
                .with_score(breakdown.total, detail),
            );
            selected.push(worker);
        }
        let skipped = self.persist_batch(day_key, &selected, &batch)?;

        info!(
            "加权排班已生成 - day_key={}, reference={}, inserted={}",
            day_key,
            reference_day,
            selected.len() - skipped.len()
        );
        self.events
            .publish_lossy(RotationEvent::for_day(day_key, RotationEventType::ScheduleGenerated));

        Ok(GenerateResult {
            day_key,
            outcome: GenerateOutcome::Created,
            strategy: SelectionStrategy::Weighted,
            assignments: self.repos.assignment_repo.find_by_day(day_key)?,
            skipped_teller_ids: skipped,
        })
    }

    // ==========================================
    // 考勤操作
    // ==========================================

    /// 标记到岗 (幂等)
    ///
    /// # 规则
    /// - 仅本次真正发生转换时累计 total_work_days, 重放不双计
    /// - 双计防护由 assignment 侧条件更新兜底, 引擎按其返回值决定是否累计
    #[instrument(skip(self))]
    pub fn mark_present(
        &self,
        day_key: NaiveDate,
        teller_id: &str,
    ) -> RotationResult<AttendanceResult> {
        let assignment = self.require_assignment(day_key, teller_id)?;
        if !assignment.can_transition_to(AssignmentStatus::Present) {
            return Err(RotationError::InvalidTransition {
                from: assignment.status.to_string(),
                to: AssignmentStatus::Present.to_string(),
            });
        }

        let transitioned = self
            .repos
            .assignment_repo
            .mark_present(day_key, teller_id)?;
        if transitioned {
            self.repos.worker_repo.record_presence(teller_id, day_key)?;
            info!("到岗已记录 - day_key={}, teller_id={}", day_key, teller_id);
        } else {
            info!(
                "到岗重放, 工作日不重复累计 - day_key={}, teller_id={}",
                day_key, teller_id
            );
        }

        self.events.publish_lossy(RotationEvent::for_teller(
            day_key,
            RotationEventType::AttendanceMarked,
            teller_id.to_string(),
        ));

        Ok(AttendanceResult {
            assignment: self.require_assignment(day_key, teller_id)?,
            transitioned,
            skip_until: None,
        })
    }

    /// 标记缺勤, 可附带惩罚窗口
    ///
    /// # 规则
    /// - 缺勤原因必填; 惩罚天数非负
    /// - penalty_days > 0 时写入 skip_until = day_key + penalty_days,
    ///   该日起恢复资格 (边界日含当日)
    /// - 缺勤路径不触碰 total_work_days
    /// - 重放 (已是 ABSENT) 仍覆写原因与惩罚以收敛, 但 transitioned=false
    #[instrument(skip(self))]
    pub fn mark_absent(
        &self,
        day_key: NaiveDate,
        teller_id: &str,
        reason: &str,
        penalty_days: i64,
    ) -> RotationResult<AttendanceResult> {
        if reason.trim().is_empty() {
            return Err(RotationError::Validation("缺勤原因不能为空".to_string()));
        }
        if penalty_days < 0 {
            return Err(RotationError::Validation(format!(
                "惩罚天数不能为负: {penalty_days}"
            )));
        }

        let assignment = self.require_assignment(day_key, teller_id)?;
        if !assignment.can_transition_to(AssignmentStatus::Absent) {
            return Err(RotationError::InvalidTransition {
                from: assignment.status.to_string(),
                to: AssignmentStatus::Absent.to_string(),
            });
        }

        let updated = self.repos.assignment_repo.mark_absent(
            day_key,
            teller_id,
            reason,
            penalty_days,
        )?;
        // 覆写生效 ≠ 状态转换: 重放时仍收敛原因/惩罚, 但不上报转换
        let transitioned = updated && assignment.status != AssignmentStatus::Absent;

        let skip_until = if penalty_days > 0 {
            Some(self.calendar.add_days(day_key, penalty_days)?)
        } else {
            None
        };
        if updated {
            if let Some(until) = skip_until {
                self.repos
                    .worker_repo
                    .apply_penalty(teller_id, until, reason)?;
            }
            info!(
                "缺勤已记录 - day_key={}, teller_id={}, penalty_days={}, skip_until={:?}, transitioned={}",
                day_key, teller_id, penalty_days, skip_until, transitioned
            );
        }

        self.events.publish_lossy(RotationEvent::for_teller(
            day_key,
            RotationEventType::AttendanceMarked,
            teller_id.to_string(),
        ));

        Ok(AttendanceResult {
            assignment: self.require_assignment(day_key, teller_id)?,
            transitioned,
            skip_until,
        })
    }

    // ==========================================
    // 顶替
    // ==========================================

    /// 顶替: 用替班人覆写排班记录的柜员身份
    ///
    /// # 规则
    /// - 替班人只需在名册中存在; 顶替是人工纠错操作,
    ///   不走资格门槛 (惩罚中/待审批的替班人也接受)
    /// - 替班人当日已有排班: 数据层唯一约束拒绝, 上浮为 Conflict
    /// - 顶替后记录进入 REPLACED 终态
    #[instrument(skip(self))]
    pub fn replace(
        &self,
        assignment_id: &str,
        replacement_id: &str,
    ) -> RotationResult<Assignment> {
        let assignment = self
            .repos
            .assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| RotationError::NotFound {
                entity: "Assignment".to_string(),
                id: assignment_id.to_string(),
            })?;
        if !assignment.can_transition_to(AssignmentStatus::Replaced) {
            return Err(RotationError::InvalidTransition {
                from: assignment.status.to_string(),
                to: AssignmentStatus::Replaced.to_string(),
            });
        }

        let replacement = self
            .repos
            .worker_repo
            .find_by_id(replacement_id)?
            .ok_or_else(|| RotationError::NotFound {
                entity: "Worker".to_string(),
                id: replacement_id.to_string(),
            })?;

        self.repos.assignment_repo.replace_teller(
            assignment_id,
            &replacement.worker_id,
            &replacement.display_name,
        )?;
        self.repos
            .worker_repo
            .touch_last_worked(&replacement.worker_id, assignment.day_key)?;

        info!(
            "顶替完成 - day_key={}, {} -> {}",
            assignment.day_key, assignment.teller_id, replacement.worker_id
        );
        self.events.publish_lossy(RotationEvent::for_teller(
            assignment.day_key,
            RotationEventType::AssignmentReplaced,
            replacement.worker_id.clone(),
        ));

        self.repos
            .assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| RotationError::NotFound {
                entity: "Assignment".to_string(),
                id: assignment_id.to_string(),
            })
    }

    /// 顶替建议: 按近期到岗负荷升序推荐替班人
    ///
    /// # 规则
    /// - 候选限定为该日合格且尚未被排班的员工
    /// - 近窗口 [day-N, day) 内确认到岗天数越少越靠前,
    ///   同负荷按 worker_id 升序保证确定性
    #[instrument(skip(self))]
    pub fn suggest(&self, day_key: NaiveDate) -> RotationResult<Vec<SuggestCandidate>> {
        let candidates = self
            .repos
            .worker_repo
            .find_eligible_unassigned(day_key, None)?;
        let window_start = self
            .calendar
            .add_days(day_key, -self.config.suggest_window_days)?;

        let mut suggestions = Vec::with_capacity(candidates.len());
        for worker in candidates {
            let present_days_recent = self.repos.assignment_repo.distinct_present_days(
                &worker.worker_id,
                window_start,
                day_key,
            )?;
            suggestions.push(SuggestCandidate {
                worker,
                present_days_recent,
            });
        }
        suggestions.sort_by(|a, b| {
            a.present_days_recent
                .cmp(&b.present_days_recent)
                .then_with(|| a.worker.worker_id.cmp(&b.worker.worker_id))
        });
        Ok(suggestions)
    }

    // ==========================================
    // 管理操作
    // ==========================================

    /// 清除整日排班 (管理员操作, 唯一的整日删除路径)
    ///
    /// 清除后可重新生成; 不回滚已累计的 total_work_days
    #[instrument(skip(self))]
    pub fn clear_day(&self, day_key: NaiveDate) -> RotationResult<usize> {
        let deleted = self.repos.assignment_repo.delete_by_day(day_key)?;
        info!("整日排班已清除 - day_key={}, deleted={}", day_key, deleted);
        self.events
            .publish_lossy(RotationEvent::for_day(day_key, RotationEventType::DayCleared));
        Ok(deleted)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 批量落库并刷新入选者的 last_worked, 返回被跳过的柜员ID
    fn persist_batch(
        &self,
        day_key: NaiveDate,
        selected: &[Worker],
        batch: &[Assignment],
    ) -> RotationResult<Vec<String>> {
        let report = self.repos.assignment_repo.insert_batch(batch)?;
        for worker in selected {
            if !report.skipped_teller_ids.contains(&worker.worker_id) {
                self.repos
                    .worker_repo
                    .touch_last_worked(&worker.worker_id, day_key)?;
            }
        }
        if !report.skipped_teller_ids.is_empty() {
            warn!(
                "批量插入存在冲突跳过 - day_key={}, skipped={:?}",
                day_key, report.skipped_teller_ids
            );
        }
        Ok(report.skipped_teller_ids)
    }

    /// 按自然键取排班记录, 缺失即 NotFound
    fn require_assignment(
        &self,
        day_key: NaiveDate,
        teller_id: &str,
    ) -> RotationResult<Assignment> {
        self.repos
            .assignment_repo
            .find_by_key(day_key, teller_id)?
            .ok_or_else(|| RotationError::NotFound {
                entity: "Assignment".to_string(),
                id: format!("{day_key}/{teller_id}"),
            })
    }
}

/// 班次人数必须为正
fn ensure_positive_headcount(desired_count: usize) -> RotationResult<()> {
    if desired_count == 0 {
        return Err(RotationError::Validation(
            "班次人数必须为正数".to_string(),
        ));
    }
    Ok(())
}
