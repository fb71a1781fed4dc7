use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use staffdesk::data::{DataClient, Entity, MemoryStore, QueryCache, RecordId, Scope};
use staffdesk::features::employees::{Employee, EmployeeDraft, EmploymentStatus};
use staffdesk::features::shifts::{
    absence_conflicts, decide_swap, Absence, AbsenceDraft, AbsenceStatus, LoadLevel, Shift,
    ShiftDraft, ShiftSwapDraft, ShiftSwapRequest, SwapDecision, SwapDecisionError, SwapStatus,
    WorkloadOverview,
};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date")
}

fn hour(value: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(value, 0, 0)
}

fn hire(client: &DataClient<MemoryStore>, scope: &Scope, name: &str, hours: f32) -> RecordId {
    let record = client
        .create(
            scope,
            EmployeeDraft {
                first_name: Some(name.to_string()),
                last_name: Some("Tester".to_string()),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                status: Some(EmploymentStatus::Active),
                weekly_hours: Some(hours),
                ..EmployeeDraft::default()
            },
        )
        .into_record()
        .expect("employee created");
    record.id().clone()
}

fn plan(
    client: &DataClient<MemoryStore>,
    scope: &Scope,
    employee: &RecordId,
    day: u32,
    start: u32,
    end: u32,
) -> RecordId {
    let record = client
        .create(
            scope,
            ShiftDraft {
                employee_id: Some(employee.clone()),
                shift_date: Some(date(day)),
                start_time: hour(start),
                end_time: hour(end),
                ..ShiftDraft::default()
            },
        )
        .into_record()
        .expect("shift created");
    record.id().clone()
}

#[test]
fn workload_flags_overloaded_and_underutilized_staff() {
    let client = DataClient::new(Arc::new(MemoryStore::new()), QueryCache::default());
    let scope = Scope::company("acme");
    let busy = hire(&client, &scope, "Busy", 20.0);
    let idle = hire(&client, &scope, "Idle", 40.0);

    // Monday 2 June to Wednesday, 8h each, plus one shift in the following week
    for day in 2..=4 {
        plan(&client, &scope, &busy, day, 8, 16);
    }
    plan(&client, &scope, &busy, 10, 8, 16);
    plan(&client, &scope, &idle, 3, 9, 13);

    let overview = WorkloadOverview::compute(
        date(2),
        &client.fetch_list::<Employee>(&scope).rows,
        &client.fetch_list::<Shift>(&scope).rows,
        40.0,
    );

    assert_eq!(overview.week_end, date(8));
    assert_eq!(overview.employees[0].employee_id, busy);
    assert_eq!(overview.employees[0].planned_hours, 24.0);
    assert_eq!(overview.employees[0].level, LoadLevel::Overloaded);
    assert_eq!(overview.employees[1].level, LoadLevel::Underutilized);
    assert_eq!(overview.overloaded, 1);
    assert_eq!(overview.underutilized, 1);
}

#[test]
fn approved_absences_collide_with_planned_shifts() {
    let client = DataClient::new(Arc::new(MemoryStore::new()), QueryCache::default());
    let scope = Scope::company("acme");
    let employee = hire(&client, &scope, "Aylin", 30.0);
    let clash = plan(&client, &scope, &employee, 5, 10, 18);
    plan(&client, &scope, &employee, 9, 10, 18);

    for (start, end, status) in [
        (4, 6, AbsenceStatus::Approved),
        (9, 9, AbsenceStatus::Requested),
    ] {
        client.create(
            &scope,
            AbsenceDraft {
                employee_id: Some(employee.clone()),
                start_date: Some(date(start)),
                end_date: Some(date(end)),
                absence_type: Some("vacation".to_string()),
                status: Some(status),
                ..AbsenceDraft::default()
            },
        );
    }

    let conflicts = absence_conflicts(
        &client.fetch_list::<Shift>(&scope).rows,
        &client.fetch_list::<Absence>(&scope).rows,
    );

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].shift_id, clash);
    assert_eq!(conflicts[0].absence_type, "vacation");
}

#[test]
fn swap_approval_moves_the_shift_and_cannot_repeat() {
    let client = DataClient::new(Arc::new(MemoryStore::new()), QueryCache::default());
    let scope = Scope::company("acme");
    let requester = hire(&client, &scope, "Jonas", 40.0);
    let cover = hire(&client, &scope, "Tom", 30.0);
    let shift = plan(&client, &scope, &requester, 6, 22, 6);

    let request = client
        .create(
            &scope,
            ShiftSwapDraft {
                requester_id: Some(requester.clone()),
                shift_id: Some(shift.clone()),
                target_employee_id: Some(cover.clone()),
                reason: Some("Family event".to_string()),
                ..ShiftSwapDraft::default()
            },
        )
        .into_record()
        .expect("swap requested");
    assert_eq!(request.status, SwapStatus::Pending);

    let outcome = decide_swap(&client, &scope, &request.id, SwapDecision::Approve)
        .expect("decision applied");
    assert_eq!(outcome.request.status, SwapStatus::Approved);
    let moved = outcome.reassigned_shift.expect("shift reassigned");
    assert_eq!(moved.id, shift);
    assert_eq!(moved.employee_id, cover);
    assert_eq!(moved.hours(), 8.0);

    match decide_swap(&client, &scope, &request.id, SwapDecision::Decline) {
        Err(SwapDecisionError::AlreadyDecided { status, .. }) => assert_eq!(status, "approved"),
        other => panic!("expected already decided, got {other:?}"),
    }
}

#[test]
fn declining_keeps_the_original_assignment() {
    let client = DataClient::new(Arc::new(MemoryStore::new()), QueryCache::default());
    let scope = Scope::company("acme");
    let requester = hire(&client, &scope, "Lena", 40.0);
    let shift = plan(&client, &scope, &requester, 7, 8, 12);
    let request = client
        .create(
            &scope,
            ShiftSwapDraft {
                requester_id: Some(requester.clone()),
                shift_id: Some(shift),
                reason: Some("Training".to_string()),
                ..ShiftSwapDraft::default()
            },
        )
        .into_record()
        .expect("swap requested");

    let outcome = decide_swap(&client, &scope, &request.id, SwapDecision::Decline)
        .expect("decision applied");

    assert_eq!(outcome.request.status, SwapStatus::Declined);
    assert!(outcome.reassigned_shift.is_none());
    let shifts = client.fetch_list::<Shift>(&scope).rows;
    assert_eq!(shifts[0].employee_id, requester);
}

#[test]
fn unknown_swap_request_is_reported() {
    let client = DataClient::new(Arc::new(MemoryStore::new()), QueryCache::default());
    let scope = Scope::company("acme");

    match decide_swap(
        &client,
        &scope,
        &RecordId("shift_swap_request-000404".to_string()),
        SwapDecision::Approve,
    ) {
        Err(SwapDecisionError::UnknownRequest(id)) => {
            assert_eq!(id.0, "shift_swap_request-000404")
        }
        other => panic!("expected unknown request, got {other:?}"),
    }
}

#[test]
fn approval_for_a_missing_shift_leaves_the_request_open() {
    let client = DataClient::new(Arc::new(MemoryStore::new()), QueryCache::default());
    let scope = Scope::company("acme");
    let requester = hire(&client, &scope, "Mira", 40.0);
    let cover = hire(&client, &scope, "Ben", 40.0);
    let request = client
        .create(
            &scope,
            ShiftSwapDraft {
                requester_id: Some(requester),
                shift_id: Some(RecordId("shift-999999".to_string())),
                target_employee_id: Some(cover),
                reason: Some("Moving day".to_string()),
                ..ShiftSwapDraft::default()
            },
        )
        .into_record()
        .expect("swap requested");

    match decide_swap(&client, &scope, &request.id, SwapDecision::Approve) {
        Err(SwapDecisionError::UnknownShift { shift, .. }) => {
            assert_eq!(shift.0, "shift-999999")
        }
        other => panic!("expected unknown shift, got {other:?}"),
    }

    let stored = client
        .find::<ShiftSwapRequest>(&scope, &request.id)
        .expect("store reachable")
        .expect("request kept");
    assert_eq!(stored.status, SwapStatus::Pending);

    let declined = decide_swap(&client, &scope, &request.id, SwapDecision::Decline)
        .expect("decline still possible");
    assert_eq!(declined.request.status, SwapStatus::Declined);
}
