mod helpers;

use assistant::agenda;
use assistant::error::AppError;
use assistant::tasks::{self, DateWindow, NewTask, TaskKind};
use helpers::{date, test_db, OWNER};

fn recurring(title: &str, start: (i32, u32, u32), rrule: &str) -> NewTask {
    NewTask {
        title: title.into(),
        start_date: Some(date(start.0, start.1, start.2)),
        rrule: Some(rrule.into()),
        ..Default::default()
    }
}

#[test]
fn monthly_rule_on_the_13th_lands_once_in_march() {
    let conn = test_db();
    let today = date(2024, 1, 13);
    let rent = recurring("pay rent", (2024, 1, 13), "FREQ=MONTHLY;BYMONTHDAY=13");
    let id = tasks::create_task(&conn, OWNER, &rent, today).unwrap();

    let window = DateWindow::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
    let result = tasks::assemble(&conn, OWNER, &window, true).unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].id, id);
    assert_eq!(result.items[0].date, date(2024, 3, 13));
    assert_eq!(result.items[0].kind, TaskKind::Recurring);
    assert!(result.skipped.is_empty());
}

#[test]
fn week_view_mixes_one_offs_and_recurrences_in_order() {
    let conn = test_db();
    let today = date(2024, 5, 1);
    // Monday 2024-05-06 .. Sunday 2024-05-12
    let week = DateWindow::week_of(date(2024, 5, 8));
    assert_eq!(week.start, date(2024, 5, 6));
    assert_eq!(week.end, date(2024, 5, 12));

    let standup = recurring("standup", (2024, 5, 1), "FREQ=WEEKLY;BYDAY=MO,WE,FR");
    let standup = tasks::create_task(&conn, OWNER, &standup, today).unwrap();
    let dentist = tasks::create_task(
        &conn,
        OWNER,
        &NewTask {
            title: "Dentist".into(),
            due_date: Some(date(2024, 5, 8)),
            priority: Some(1),
            ..Default::default()
        },
        today,
    )
    .unwrap();
    let outside = tasks::create_task(
        &conn,
        OWNER,
        &NewTask {
            title: "later".into(),
            due_date: Some(date(2024, 5, 13)),
            ..Default::default()
        },
        today,
    )
    .unwrap();

    let result = tasks::assemble(&conn, OWNER, &week, false).unwrap();
    let got: Vec<_> = result.items.iter().map(|o| (o.date, o.id)).collect();
    assert_eq!(
        got,
        vec![
            (date(2024, 5, 6), standup),
            (date(2024, 5, 8), dentist),
            (date(2024, 5, 8), standup),
            (date(2024, 5, 10), standup),
        ]
    );
    assert!(result.items.iter().all(|o| o.id != outside));
    assert!(result.items.iter().all(|o| week.contains(o.date)));
}

#[test]
fn completing_twice_is_idempotent_and_hides_the_occurrence() {
    let conn = test_db();
    let today = date(2024, 6, 1);
    let input = recurring("stretch", (2024, 6, 1), "FREQ=DAILY");
    let id = tasks::create_task(&conn, OWNER, &input, today).unwrap();

    let first = tasks::complete_occurrence(&conn, OWNER, id, date(2024, 6, 2)).unwrap();
    assert!(first.ok);
    assert!(!first.already);
    let second = tasks::complete_occurrence(&conn, OWNER, id, date(2024, 6, 2)).unwrap();
    assert!(second.already);

    let records: i64 = conn
        .query_row("SELECT COUNT(*) FROM task_completions WHERE task_id = ?1", [id], |r| r.get(0))
        .unwrap();
    assert_eq!(records, 1);

    let window = DateWindow::new(date(2024, 6, 1), date(2024, 6, 3)).unwrap();
    let visible = tasks::assemble(&conn, OWNER, &window, true).unwrap();
    assert_eq!(
        visible.items.iter().map(|o| o.date).collect::<Vec<_>>(),
        vec![date(2024, 6, 1), date(2024, 6, 3)]
    );

    let all = tasks::assemble(&conn, OWNER, &window, false).unwrap();
    assert_eq!(all.items.iter().filter(|o| o.is_done).count(), 1);
}

#[test]
fn malformed_rule_is_skipped_without_failing_the_window() {
    let conn = test_db();
    let today = date(2024, 7, 1);
    let broken = recurring("broken", (2024, 7, 1), "FREQ=HOURLY");
    let broken = tasks::create_task(&conn, OWNER, &broken, today).unwrap();
    let fine = recurring("fine", (2024, 7, 1), "FREQ=DAILY");
    let fine = tasks::create_task(&conn, OWNER, &fine, today).unwrap();

    let result = tasks::assemble(&conn, OWNER, &DateWindow::day(today), true).unwrap();
    assert_eq!(result.items.iter().map(|o| o.id).collect::<Vec<_>>(), vec![fine]);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].task_id, broken);
}

#[test]
fn deleting_a_task_removes_its_completions() {
    let conn = test_db();
    let today = date(2024, 8, 1);
    let input = recurring("daily", (2024, 8, 1), "FREQ=DAILY");
    let id = tasks::create_task(&conn, OWNER, &input, today).unwrap();
    tasks::complete_occurrence(&conn, OWNER, id, today).unwrap();

    tasks::delete_task(&conn, OWNER, id).unwrap();

    let records: i64 = conn
        .query_row("SELECT COUNT(*) FROM task_completions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(records, 0);
    assert!(matches!(tasks::get_task(&conn, OWNER, id), Err(AppError::NotFound(_))));
    assert!(matches!(
        tasks::complete_occurrence(&conn, OWNER, id, today),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn tasks_are_scoped_to_their_owner() {
    let conn = test_db();
    let today = date(2024, 9, 1);
    let id = tasks::create_task(
        &conn,
        "alice",
        &NewTask {
            title: "private".into(),
            ..Default::default()
        },
        today,
    )
    .unwrap();

    assert!(tasks::assemble(&conn, OWNER, &DateWindow::day(today), true).unwrap().items.is_empty());
    assert!(matches!(tasks::get_task(&conn, OWNER, id), Err(AppError::NotFound(_))));
    let theirs = tasks::assemble(&conn, "alice", &DateWindow::day(today), true).unwrap();
    assert_eq!(theirs.items.len(), 1);
}

#[test]
fn overview_echoes_requested_days_and_falls_back_for_the_window() {
    let conn = test_db();
    let today = date(2024, 10, 1);
    let input = recurring("weekly", (2024, 10, 1), "FREQ=WEEKLY");
    tasks::create_task(&conn, OWNER, &input, today).unwrap();

    let view = agenda::overview(&conn, OWNER, today, 0, true).unwrap();
    assert_eq!(view.days, 0);
    assert_eq!(view.today.len(), 1);
    assert_eq!(
        view.next.iter().map(|o| o.date).collect::<Vec<_>>(),
        vec![date(2024, 10, 1), date(2024, 10, 8)]
    );
}
