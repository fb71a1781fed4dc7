use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{api_router, ApiState};
use crate::data::{CompanyId, DataClient, MemoryStore, QueryCache, SessionUser};

fn build(store: MemoryStore) -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(store);
    let client = DataClient::new(store.clone(), QueryCache::new(Duration::from_secs(60)));
    let router = api_router(ApiState::new(Arc::new(client), 40.0));
    (store, router)
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    router.clone().oneshot(request).await.expect("router responds")
}

async fn create(router: &Router, path: &str, body: Value) -> Value {
    let response = send(router, Method::POST, path, Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json_body(response).await["record"].clone()
}

#[tokio::test]
async fn empty_table_renders_empty_state() {
    let (_, router) = build(MemoryStore::new());

    let response = send(&router, Method::GET, "/api/v1/companies/acme/employees", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["state"], "empty");
    assert_eq!(payload["message"], "No employees found yet.");
    assert_eq!(payload["total"], 0);
    assert_eq!(payload["degraded"], false);
}

#[tokio::test]
async fn create_with_missing_fields_writes_nothing() {
    let (store, router) = build(MemoryStore::new());

    let response = send(
        &router,
        Method::POST,
        "/api/v1/companies/acme/employees",
        Some(json!({ "first_name": "Lena", "email": "  " })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["missing_fields"], json!(["last_name", "email"]));
    assert_eq!(
        payload["error"],
        "Please fill in all required fields: last_name, email"
    );
    assert_eq!(store.row_count("employees"), 0);
}

#[tokio::test]
async fn created_expense_gets_defaults_and_shows_up_in_the_list() {
    let (store, router) = build(MemoryStore::new());
    let path = "/api/v1/companies/acme/expenses";

    // prime the cache so the create has something to invalidate
    let before = read_json_body(send(&router, Method::GET, path, None).await).await;
    assert_eq!(before["state"], "empty");

    let record = create(
        &router,
        path,
        json!({
            "description": "Train to Hamburg",
            "category": "travel",
            "amount": 89.9,
            "expense_date": "2025-05-14",
        }),
    )
    .await;

    assert_eq!(record["status"], "pending");
    assert_eq!(record["currency"], "EUR");
    assert_eq!(record["company_id"], "acme");
    assert_eq!(store.row_count("expenses"), 1);

    let after = read_json_body(send(&router, Method::GET, path, None).await).await;
    assert_eq!(after["state"], "loaded");
    assert_eq!(after["rows"][0]["description"], "Train to Hamburg");
}

#[tokio::test]
async fn search_without_hits_reports_the_filter() {
    let (_, router) = build(MemoryStore::new());
    let path = "/api/v1/companies/acme/cards";
    create(
        &router,
        path,
        json!({
            "card_name": "Marketing Visa",
            "holder_name": "Mia Schulz",
            "last_four": "1234",
            "monthly_limit": 2000,
        }),
    )
    .await;

    let missing = read_json_body(
        send(&router, Method::GET, &format!("{path}?search=zzz"), None).await,
    )
    .await;
    assert_eq!(missing["state"], "empty");
    assert_eq!(missing["message"], "No company cards match the current filter.");
    assert_eq!(missing["total"], 1);
    assert_eq!(missing["matched"], 0);

    let hit = read_json_body(
        send(&router, Method::GET, &format!("{path}?search=visa"), None).await,
    )
    .await;
    assert_eq!(hit["matched"], 1);
    assert_eq!(hit["rows"][0]["current_balance"], 0.0);
}

#[tokio::test]
async fn tenants_do_not_see_each_other() {
    let (_, router) = build(MemoryStore::new());
    create(
        &router,
        "/api/v1/companies/acme/org-units",
        json!({ "name": "Finance" }),
    )
    .await;

    let other = read_json_body(
        send(&router, Method::GET, "/api/v1/companies/globex/org-units", None).await,
    )
    .await;
    assert_eq!(other["state"], "empty");
}

#[tokio::test]
async fn patch_updates_status_and_rejects_unknown_values() {
    let (_, router) = build(MemoryStore::new());
    let record = create(
        &router,
        "/api/v1/companies/acme/expenses",
        json!({
            "description": "Hotel",
            "category": "travel",
            "amount": 240,
            "expense_date": "2025-05-02",
        }),
    )
    .await;
    let id = record["id"].as_str().expect("id assigned").to_string();
    let item = format!("/api/v1/companies/acme/expenses/{id}");

    let approved = Some(json!({ "status": "approved" }));
    let response = send(&router, Method::PATCH, &item, approved).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["status"], "approved");

    let unknown = Some(json!({ "status": "paid" }));
    let response = send(&router, Method::PATCH, &item, unknown).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let listed = read_json_body(
        send(
            &router,
            Method::GET,
            "/api/v1/companies/acme/expenses?status=approved",
            None,
        )
        .await,
    )
    .await;
    assert_eq!(listed["matched"], 1);
}

#[tokio::test]
async fn patch_of_unknown_record_is_not_found() {
    let (_, router) = build(MemoryStore::new());

    let response = send(
        &router,
        Method::PATCH,
        "/api/v1/companies/acme/projects/project-999999",
        Some(json!({ "status": "active" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn automation_suggestion_carries_roi() {
    let (_, router) = build(MemoryStore::new());

    let record = create(
        &router,
        "/api/v1/companies/acme/automation-suggestions",
        json!({
            "title": "Invoice OCR",
            "potential_time_saved_hours": 10,
            "implementation_cost": 1000,
        }),
    )
    .await;

    assert_eq!(record["annual_savings"], 26000.0);
    assert_eq!(record["roi_percentage"], 2500.0);
    assert_eq!(record["status"], "proposed");
}

#[tokio::test]
async fn approving_a_swap_reassigns_the_shift_once() {
    let (_, router) = build(MemoryStore::new());
    let base = "/api/v1/companies/acme";
    let shift = create(
        &router,
        &format!("{base}/shifts"),
        json!({
            "employee_id": "employee-a",
            "shift_date": "2025-06-02",
            "start_time": "22:00",
            "end_time": "06:00",
        }),
    )
    .await;
    let swap = create(
        &router,
        &format!("{base}/shift-swaps"),
        json!({
            "requester_id": "employee-a",
            "shift_id": shift["id"],
            "target_employee_id": "employee-b",
            "reason": "Doctor's appointment",
        }),
    )
    .await;
    let decision = format!(
        "{base}/shift-swaps/{}/decision",
        swap["id"].as_str().expect("swap id")
    );

    let approve = Some(json!({ "decision": "approve" }));
    let response = send(&router, Method::POST, &decision, approve).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["request"]["status"], "approved");
    assert_eq!(payload["reassigned_shift"]["employee_id"], "employee-b");

    let decline = Some(json!({ "decision": "decline" }));
    let again = send(&router, Method::POST, &decision, decline).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn offline_store_degrades_to_an_empty_list() {
    let (store, router) = build(MemoryStore::new());
    store.set_offline(true);

    let response = send(&router, Method::GET, "/api/v1/companies/acme/projects", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["state"], "empty");
    assert_eq!(payload["degraded"], true);
}

#[tokio::test]
async fn session_requires_a_signed_in_user_of_the_company() {
    let (_, anonymous) = build(MemoryStore::new());
    let response = send(&anonymous, Method::GET, "/api/v1/companies/acme/session", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (_, signed_in) = build(MemoryStore::with_session(SessionUser {
        user_id: "user-1".to_string(),
        email: "hr@acme.example".to_string(),
        company_id: CompanyId("acme".to_string()),
    }));
    let response = send(&signed_in, Method::GET, "/api/v1/companies/acme/session", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["user"]["email"], "hr@acme.example");

    let response = send(&signed_in, Method::GET, "/api/v1/companies/globex/session", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn project_budget_counts_committed_expenses() {
    let (_, router) = build(MemoryStore::new());
    let base = "/api/v1/companies/acme";
    let project = create(
        &router,
        &format!("{base}/projects"),
        json!({ "name": "Relaunch", "start_date": "2025-01-06", "budget": 1000 }),
    )
    .await;
    let project_id = project["id"].as_str().expect("project id").to_string();
    for (amount, status) in [(300, "approved"), (200, "reimbursed"), (900, "pending")] {
        create(
            &router,
            &format!("{base}/expenses"),
            json!({
                "description": "Agency invoice",
                "category": "services",
                "amount": amount,
                "expense_date": "2025-02-01",
                "status": status,
                "project_id": project_id,
            }),
        )
        .await;
    }

    let response = send(
        &router,
        Method::GET,
        &format!("{base}/projects/{project_id}/budget"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["budget"]["spent"], 500.0);
    assert_eq!(payload["budget"]["remaining"], 500.0);
    assert_eq!(payload["budget"]["committed_expenses"], 2);

    let missing = send(&router, Method::GET, &format!("{base}/projects/nope/budget"), None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn agenda_rejects_inverted_ranges() {
    let (_, router) = build(MemoryStore::new());

    let response = send(
        &router,
        Method::GET,
        "/api/v1/companies/acme/calendar/agenda?from=2025-06-10&to=2025-06-01",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn org_tree_nests_units_under_their_parent() {
    let (_, router) = build(MemoryStore::new());
    let base = "/api/v1/companies/acme";
    let board = create(&router, &format!("{base}/org-units"), json!({ "name": "Board" })).await;
    create(
        &router,
        &format!("{base}/org-units"),
        json!({ "name": "People & Culture", "parent_id": board["id"] }),
    )
    .await;

    let response = send(&router, Method::GET, &format!("{base}/org-units/tree"), None).await;
    let tree = read_json_body(response).await;

    assert_eq!(tree["unit_count"], 2);
    assert_eq!(tree["degraded"], false);
    assert_eq!(tree["roots"][0]["name"], "Board");
    assert_eq!(tree["roots"][0]["children"][0]["name"], "People & Culture");
}

#[tokio::test]
async fn patching_hours_and_cost_refreshes_the_roi() {
    let (_, router) = build(MemoryStore::new());
    let base = "/api/v1/companies/acme/automation-suggestions";
    let suggestion = create(
        &router,
        base,
        json!({
            "title": "Receipt capture",
            "potential_time_saved_hours": 10,
            "implementation_cost": 1000,
        }),
    )
    .await;
    let uri = format!("{base}/{}", suggestion["id"].as_str().expect("suggestion id"));

    let patch = Some(json!({
        "potential_time_saved_hours": 20,
        "implementation_cost": 2000,
    }));
    let response = send(&router, Method::PATCH, &uri, patch).await;

    assert_eq!(response.status(), StatusCode::OK);
    let record = read_json_body(response).await;
    assert_eq!(record["annual_savings"], 52_000.0);
    assert_eq!(record["roi_percentage"], 2_500.0);
}

#[tokio::test]
async fn approving_a_swap_for_a_missing_shift_keeps_it_pending() {
    let (_, router) = build(MemoryStore::new());
    let base = "/api/v1/companies/acme";
    let swap = create(
        &router,
        &format!("{base}/shift-swaps"),
        json!({
            "requester_id": "employee-a",
            "shift_id": "shift-999999",
            "target_employee_id": "employee-b",
            "reason": "Moving day",
        }),
    )
    .await;
    let decision = format!(
        "{base}/shift-swaps/{}/decision",
        swap["id"].as_str().expect("swap id")
    );

    let approve = Some(json!({ "decision": "approve" }));
    let response = send(&router, Method::POST, &decision, approve.clone()).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let listed = send(&router, Method::GET, &format!("{base}/shift-swaps"), None).await;
    assert_eq!(read_json_body(listed).await["rows"][0]["status"], "pending");

    let retry = send(&router, Method::POST, &decision, approve).await;
    assert_eq!(retry.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn single_record_lookups_report_an_unreachable_store() {
    let (store, router) = build(MemoryStore::new());
    let base = "/api/v1/companies/acme";
    let project = create(
        &router,
        &format!("{base}/projects"),
        json!({ "name": "Relaunch", "start_date": "2025-01-06", "budget": 1000 }),
    )
    .await;
    let budget = format!(
        "{base}/projects/{}/budget",
        project["id"].as_str().expect("project id")
    );
    store.set_offline(true);

    let response = send(&router, Method::GET, &budget, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let decision = format!("{base}/shift-swaps/shift_swap_request-000001/decision");
    let approve = Some(json!({ "decision": "approve" }));
    let response = send(&router, Method::POST, &decision, approve).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn dashboards_flag_an_unreachable_store() {
    let (store, router) = build(MemoryStore::new());
    store.set_offline(true);
    let base = "/api/v1/companies/acme";

    for path in [
        "workload?week_start=2025-06-02",
        "absences/conflicts",
        "org-units/tree",
        "ai-models/overview",
        "calendar/agenda?from=2025-06-02",
    ] {
        let response = send(&router, Method::GET, &format!("{base}/{path}"), None).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(read_json_body(response).await["degraded"], true, "{path}");
    }

    let response = send(&router, Method::GET, &format!("{base}/org-units/tree"), None).await;
    assert_eq!(read_json_body(response).await["unit_count"], 0);
}
