// ==========================================
// 仓储层集成测试
// ==========================================
// 覆盖: 唯一约束 / 批量插入部分成功 / 条件更新防双计 /
//       资格查询过滤与排序 / 滑动窗口统计
// ==========================================


use std::sync::{Arc, Mutex};
use test_helpers::{approved_teller, create_test_db, open_test_connection, ymd};
use teller_rotation::domain::types::{AssignmentStatus, WorkerRole, WorkerStatus};
use teller_rotation::domain::{Assignment, Worker};
use teller_rotation::repository::{AssignmentRepository, RepositoryError, WorkerRepository};

fn setup() -> (tempfile::NamedTempFile, WorkerRepository, AssignmentRepository) {
    let (tmp, db_path) = create_test_db().unwrap();
    let conn = Arc::new(Mutex::new(open_test_connection(&db_path).unwrap()));
    let workers = WorkerRepository::from_connection(conn.clone());
    let assignments = AssignmentRepository::from_connection(conn);
    (tmp, workers, assignments)
}

fn scheduled(teller_id: &str, day: chrono::NaiveDate) -> Assignment {
    Assignment::scheduled(
        day,
        teller_id.to_string(),
        format!("柜员{teller_id}"),
        chrono::Utc::now(),
    )
}

// ==========================================
// 唯一约束与批量插入
// ==========================================

#[test]
fn test_unique_constraint_rejects_duplicate_day_teller() {
    let (_tmp, workers, assignments) = setup();
    workers.insert(&approved_teller("W1", "柜员1")).unwrap();

    assignments.insert(&scheduled("W1", ymd(2025, 6, 10))).unwrap();
    let dup = assignments.insert(&scheduled("W1", ymd(2025, 6, 10)));
    assert!(matches!(
        dup,
        Err(ref e) if e.is_unique_violation()
    ));

    // 另一天不冲突
    assignments.insert(&scheduled("W1", ymd(2025, 6, 11))).unwrap();
}

#[test]
fn test_batch_insert_skips_conflicts_and_reports() {
    let (_tmp, workers, assignments) = setup();
    for id in ["W1", "W2", "W3"] {
        workers.insert(&approved_teller(id, id)).unwrap();
    }
    // W2 已持有当日排班
    assignments.insert(&scheduled("W2", ymd(2025, 6, 10))).unwrap();

    let batch = vec![
        scheduled("W1", ymd(2025, 6, 10)),
        scheduled("W2", ymd(2025, 6, 10)),
        scheduled("W3", ymd(2025, 6, 10)),
    ];
    let report = assignments.insert_batch(&batch).unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped_teller_ids, vec!["W2".to_string()]);

    // 冲突行不影响其余行落库
    assert_eq!(assignments.find_by_day(ymd(2025, 6, 10)).unwrap().len(), 3);
}

#[test]
fn test_foreign_key_rejects_unknown_worker() {
    let (_tmp, _workers, assignments) = setup();
    let result = assignments.insert(&scheduled("GHOST", ymd(2025, 6, 10)));
    assert!(matches!(
        result,
        Err(RepositoryError::ForeignKeyViolation(_))
    ));
}

// ==========================================
// 条件更新: 双计防护下沉到 SQL
// ==========================================

#[test]
fn test_mark_present_transition_gate() {
    let (_tmp, workers, assignments) = setup();
    workers.insert(&approved_teller("W1", "柜员1")).unwrap();
    assignments.insert(&scheduled("W1", ymd(2025, 6, 10))).unwrap();

    assert!(assignments.mark_present(ymd(2025, 6, 10), "W1").unwrap());
    // 已是 PRESENT, 条件不满足
    assert!(!assignments.mark_present(ymd(2025, 6, 10), "W1").unwrap());
    // 记录不存在
    assert!(!assignments.mark_present(ymd(2025, 6, 10), "W404").unwrap());
}

#[test]
fn test_mark_absent_overwrites_reason() {
    let (_tmp, workers, assignments) = setup();
    workers.insert(&approved_teller("W1", "柜员1")).unwrap();
    assignments.insert(&scheduled("W1", ymd(2025, 6, 10))).unwrap();

    assert!(assignments
        .mark_absent(ymd(2025, 6, 10), "W1", "生病", 0)
        .unwrap());
    assert!(assignments
        .mark_absent(ymd(2025, 6, 10), "W1", "无故缺勤", 3)
        .unwrap());

    let a = assignments
        .find_by_key(ymd(2025, 6, 10), "W1")
        .unwrap()
        .unwrap();
    assert_eq!(a.status, AssignmentStatus::Absent);
    assert_eq!(a.absent_reason.as_deref(), Some("无故缺勤"));
    assert_eq!(a.penalty_days, Some(3));
}

#[test]
fn test_record_presence_updates_aggregates() {
    let (_tmp, workers, _assignments) = setup();
    workers.insert(&approved_teller("W1", "柜员1")).unwrap();

    workers.record_presence("W1", ymd(2025, 6, 10)).unwrap();
    workers.record_presence("W1", ymd(2025, 6, 11)).unwrap();

    let w = workers.find_by_id("W1").unwrap().unwrap();
    assert_eq!(w.total_work_days, 2);
    assert_eq!(w.last_worked, Some(ymd(2025, 6, 11)));

    // 未知员工报 NotFound
    assert!(matches!(
        workers.record_presence("W404", ymd(2025, 6, 10)),
        Err(RepositoryError::NotFound { .. })
    ));
}

// ==========================================
// 资格查询: 过滤与公平排序
// ==========================================

#[test]
fn test_find_eligible_filters_and_orders() {
    let (_tmp, workers, _assignments) = setup();

    let mut veteran = approved_teller("W1", "老柜员");
    veteran.last_worked = Some(ymd(2025, 6, 1));
    veteran.total_work_days = 10;
    let fresh = approved_teller("W2", "新柜员"); // 从未排班
    let mut resting = approved_teller("W3", "休整中");
    resting.last_worked = Some(ymd(2025, 5, 1));
    resting.total_work_days = 3;
    let mut penalized = approved_teller("W4", "惩罚中");
    penalized.skip_until = Some(ymd(2025, 6, 20));
    let mut pending = approved_teller("W5", "待审批");
    pending.status = WorkerStatus::Pending;
    let supervisor = Worker::new(
        "W6".to_string(),
        "主管".to_string(),
        "sup01".to_string(),
        WorkerRole::Supervisor,
        WorkerStatus::Approved,
    );

    for w in [&veteran, &fresh, &resting, &penalized, &pending, &supervisor] {
        workers.insert(w).unwrap();
    }

    let eligible = workers.find_eligible(ymd(2025, 6, 10), None).unwrap();
    let ids: Vec<_> = eligible.iter().map(|w| w.worker_id.as_str()).collect();
    // 从未排班者最前, 其后按 last_worked 升序; 惩罚/待审批/非轮换角色全部排除
    assert_eq!(ids, vec!["W2", "W3", "W1"]);
}

#[test]
fn test_find_eligible_unassigned_excludes_holders() {
    let (_tmp, workers, assignments) = setup();
    workers.insert(&approved_teller("W1", "柜员1")).unwrap();
    workers.insert(&approved_teller("W2", "柜员2")).unwrap();
    assignments.insert(&scheduled("W1", ymd(2025, 6, 10))).unwrap();

    let unassigned = workers
        .find_eligible_unassigned(ymd(2025, 6, 10), None)
        .unwrap();
    let ids: Vec<_> = unassigned.iter().map(|w| w.worker_id.as_str()).collect();
    assert_eq!(ids, vec!["W2"]);

    // 其他日期不受影响
    let other_day = workers
        .find_eligible_unassigned(ymd(2025, 6, 11), None)
        .unwrap();
    assert_eq!(other_day.len(), 2);
}

#[test]
fn test_supervisor_teller_is_rotation_eligible() {
    let (_tmp, workers, _assignments) = setup();
    let st = Worker::new(
        "W1".to_string(),
        "主管柜员".to_string(),
        "st01".to_string(),
        WorkerRole::SupervisorTeller,
        WorkerStatus::Approved,
    );
    workers.insert(&st).unwrap();

    let eligible = workers.find_eligible(ymd(2025, 6, 10), None).unwrap();
    assert_eq!(eligible.len(), 1);
}

// ==========================================
// 滑动窗口统计
// ==========================================

#[test]
fn test_window_statistics() {
    let (_tmp, workers, assignments) = setup();
    workers.insert(&approved_teller("W1", "柜员1")).unwrap();

    for day in [ymd(2025, 6, 1), ymd(2025, 6, 5), ymd(2025, 6, 9)] {
        let mut a = scheduled("W1", day);
        a.status = AssignmentStatus::Present;
        assignments.insert(&a).unwrap();
    }
    assignments.insert(&scheduled("W1", ymd(2025, 6, 10))).unwrap();

    // (06-01, 06-10] 含 06-05, 06-09, 06-10
    assert_eq!(
        assignments
            .count_in_window("W1", ymd(2025, 6, 1), ymd(2025, 6, 10))
            .unwrap(),
        3
    );
    assert_eq!(
        assignments.last_assignment_day("W1").unwrap(),
        Some(ymd(2025, 6, 10))
    );
    assert_eq!(assignments.total_count_for("W1").unwrap(), 4);
    // [06-03, 06-10) 内确认到岗: 06-05, 06-09
    assert_eq!(
        assignments
            .distinct_present_days("W1", ymd(2025, 6, 3), ymd(2025, 6, 10))
            .unwrap(),
        2
    );
    assert_eq!(assignments.last_assignment_day("W404").unwrap(), None);
}

// ==========================================
// 坏数据防护: 坏列值上浮错误, 不落默认值
// ==========================================

#[test]
fn test_corrupt_date_columns_surface_errors() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = Arc::new(Mutex::new(open_test_connection(&db_path).unwrap()));
    let workers = WorkerRepository::from_connection(conn.clone());
    let assignments = AssignmentRepository::from_connection(conn.clone());

    workers.insert(&approved_teller("W1", "柜员1")).unwrap();
    let a = scheduled("W1", ymd(2025, 6, 10));
    assignments.insert(&a).unwrap();

    {
        let guard = conn.lock().unwrap();
        guard
            .execute(
                "UPDATE worker SET last_worked = 'not-a-date' WHERE worker_id = 'W1'",
                [],
            )
            .unwrap();
        guard
            .execute(
                "UPDATE assignment SET day_key = '2025/06/10' WHERE assignment_id = ?1",
                rusqlite::params![a.assignment_id],
            )
            .unwrap();
    }

    assert!(workers.find_by_id("W1").is_err());
    assert!(assignments.find_by_id(&a.assignment_id).is_err());
    assert!(assignments.last_assignment_day("W1").is_err());
}

#[test]
fn test_corrupt_enum_columns_surface_errors() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = Arc::new(Mutex::new(open_test_connection(&db_path).unwrap()));
    let workers = WorkerRepository::from_connection(conn.clone());
    let assignments = AssignmentRepository::from_connection(conn.clone());

    workers.insert(&approved_teller("W1", "柜员1")).unwrap();
    let a = scheduled("W1", ymd(2025, 6, 10));
    assignments.insert(&a).unwrap();

    {
        let guard = conn.lock().unwrap();
        guard
            .execute("UPDATE worker SET role = 'JANITOR' WHERE worker_id = 'W1'", [])
            .unwrap();
        guard
            .execute(
                "UPDATE assignment SET status = 'CANCELLED' WHERE assignment_id = ?1",
                rusqlite::params![a.assignment_id],
            )
            .unwrap();
    }

    // 未知角色不得悄然变成可轮换的默认角色
    assert!(workers.find_by_id("W1").is_err());
    assert!(workers.find_eligible(ymd(2025, 6, 10), None).unwrap().is_empty());
    assert!(assignments.find_by_id(&a.assignment_id).is_err());
}

// ==========================================
// 删除路径
// ==========================================

#[test]
fn test_delete_paths() {
    let (_tmp, workers, assignments) = setup();
    workers.insert(&approved_teller("W1", "柜员1")).unwrap();
    workers.insert(&approved_teller("W2", "柜员2")).unwrap();

    let a1 = scheduled("W1", ymd(2025, 6, 10));
    let a2 = scheduled("W2", ymd(2025, 6, 10));
    assignments.insert(&a1).unwrap();
    assignments.insert(&a2).unwrap();
    assignments.insert(&scheduled("W1", ymd(2025, 6, 11))).unwrap();

    assert_eq!(
        assignments
            .delete_by_ids(&[a1.assignment_id.clone()])
            .unwrap(),
        1
    );
    assert_eq!(assignments.delete_by_day(ymd(2025, 6, 10)).unwrap(), 1);
    // 其他日分区不受整日删除影响
    assert_eq!(assignments.find_by_day(ymd(2025, 6, 11)).unwrap().len(), 1);
}
