/// End-to-end API tests against PostgreSQL
///
/// Run with `DATABASE_URL=postgresql://... cargo test -- --ignored`.

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::NaiveDate;
use common::{body_bytes, request, TestContext, TEST_PASSWORD};
use hourglass_shared::models::timesheet::{NewTimesheet, Timesheet};
use hourglass_shared::models::user::User;
use serde_json::json;
use tower::ServiceExt;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_create_entry_then_duplicate_conflicts() {
    let ctx = TestContext::new().await.unwrap();
    let entry = json!({
        "taskId": ctx.task.id,
        "projectId": ctx.project.id,
        "date": "2024-01-05",
        "hours": 8,
    });

    let (status, body) = ctx
        .send(Method::POST, "/api/timesheets", &ctx.employee.token, Some(entry.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "draft");
    assert_eq!(body["data"]["userId"], json!(ctx.employee.user.id));
    assert_eq!(body["data"]["billable"], true);

    let (status, body) = ctx
        .send(Method::POST, "/api/timesheets", &ctx.employee.token, Some(entry))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("already exists"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_hours_out_of_range_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/timesheets",
            &ctx.employee.token,
            Some(json!({ "taskId": ctx.task.id, "date": "2024-01-05", "hours": 25 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "hours");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_approval_requires_manager() {
    let ctx = TestContext::new().await.unwrap();

    let (_, created) = ctx
        .send(
            Method::POST,
            "/api/timesheets",
            &ctx.employee.token,
            Some(json!({ "taskId": ctx.task.id, "date": "2024-01-09", "hours": 6.5 })),
        )
        .await;
    let status_uri = format!("/api/timesheets/{}/status", created["data"]["id"].as_str().unwrap());

    let (status, body) = ctx
        .send(
            Method::PUT,
            &status_uri,
            &ctx.employee.token,
            Some(json!({ "status": "submitted" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "submitted");

    let (status, _) = ctx
        .send(
            Method::PUT,
            &status_uri,
            &ctx.employee.token,
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .send(
            Method::PUT,
            &status_uri,
            &ctx.manager.token,
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Timesheet approved");
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["approvedBy"], json!(ctx.manager.user.id));
    assert!(body["data"]["approvedAt"].is_string());

    // Approved entries are frozen for everyone but admins
    let entry_uri = format!("/api/timesheets/{}", body["data"]["id"].as_str().unwrap());
    let (status, _) = ctx
        .send(Method::PUT, &entry_uri, &ctx.employee.token, Some(json!({ "hours": 7 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_weekly_report_totals() {
    let ctx = TestContext::new().await.unwrap();

    for (day, hours, billable) in [("2024-01-08", 3.0, true), ("2024-01-10", 5.0, false)] {
        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/timesheets",
                &ctx.employee.token,
                Some(json!({
                    "taskId": ctx.task.id,
                    "date": day,
                    "hours": hours,
                    "billable": billable,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let uri = format!(
        "/api/reports/weekly?startDate=2024-01-10&projectId={}",
        ctx.project.id
    );
    let (status, body) = ctx.send(Method::GET, &uri, &ctx.manager.token, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let report = &body["data"];
    assert_eq!(report["reportType"], "weekly");
    assert_eq!(report["period"]["startDate"], "2024-01-08");
    assert_eq!(report["period"]["endDate"], "2024-01-14");
    assert_eq!(report["summary"]["totalHours"], 8.0);
    assert_eq!(report["summary"]["billableHours"], 3.0);
    assert_eq!(report["summary"]["nonBillableHours"], 5.0);

    let daily = report["dailyData"].as_array().unwrap();
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0]["date"], "2024-01-08");
    assert_eq!(daily[1]["date"], "2024-01-10");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_report_csv_download() {
    let ctx = TestContext::new().await.unwrap();
    Timesheet::insert(
        &ctx.db,
        NewTimesheet {
            user_id: ctx.employee.user.id,
            task_id: ctx.task.id,
            project_id: ctx.project.id,
            date: date("2024-02-12"),
            hours: 4.0,
            description: Some("Pairing".to_string()),
            billable: true,
        },
    )
    .await
    .unwrap();

    let uri = format!(
        "/api/reports/monthly?month=2024-02&projectId={}&format=csv",
        ctx.project.id
    );
    let response = ctx
        .app
        .clone()
        .oneshot(request(Method::GET, &uri, Some(&ctx.manager.token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"monthly-report-"));

    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(csv.contains("Pairing"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_employee_sees_only_own_entries() {
    let ctx = TestContext::new().await.unwrap();

    for user_id in [ctx.employee.user.id, ctx.manager.user.id] {
        Timesheet::insert(
            &ctx.db,
            NewTimesheet {
                user_id,
                task_id: ctx.task.id,
                project_id: ctx.project.id,
                date: date("2024-03-04"),
                hours: 2.0,
                description: None,
                billable: true,
            },
        )
        .await
        .unwrap();
    }

    let uri = format!("/api/timesheets?projectId={}", ctx.project.id);

    let (status, body) = ctx.send(Method::GET, &uri, &ctx.employee.token, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"]["timesheets"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["userId"], json!(ctx.employee.user.id));
    assert_eq!(body["data"]["pagination"]["totalItems"], 1);

    let (_, body) = ctx.send(Method::GET, &uri, &ctx.manager.token, None).await;
    assert_eq!(body["data"]["pagination"]["totalItems"], 2);

    // A user id filter cannot widen an employee's scope
    let uri = format!(
        "/api/timesheets?projectId={}&userId={}",
        ctx.project.id, ctx.manager.user.id
    );
    let (_, body) = ctx.send(Method::GET, &uri, &ctx.employee.token, None).await;
    assert_eq!(body["data"]["pagination"]["totalItems"], 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_login_and_me() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ctx.employee.user.email.to_uppercase(), "password": TEST_PASSWORD })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, body) = ctx.send(Method::GET, "/api/auth/me", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], ctx.employee.user.email);
    assert!(body["data"].get("passwordHash").is_none());

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            "",
            Some(json!({ "email": ctx.employee.user.email, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_employee_cannot_create_project() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/projects",
            &ctx.employee.token,
            Some(json!({ "name": "Side quest" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/projects",
            &ctx.manager.token,
            Some(json!({ "name": "Side quest", "startDate": "2024-02-01", "endDate": "2024-01-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "endDate");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_moving_entry_onto_taken_date_conflicts() {
    let ctx = TestContext::new().await.unwrap();

    let mut ids = Vec::new();
    for day in ["2024-04-01", "2024-04-02"] {
        let (status, body) = ctx
            .send(
                Method::POST,
                "/api/timesheets",
                &ctx.employee.token,
                Some(json!({ "taskId": ctx.task.id, "date": day, "hours": 4 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }
    let second = &ids[1];

    let (status, body) = ctx
        .send(
            Method::PUT,
            &format!("/api/timesheets/{second}"),
            &ctx.employee.token,
            Some(json!({ "date": "2024-04-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));

    let (status, body) = ctx
        .send(
            Method::PUT,
            &format!("/api/timesheets/{second}"),
            &ctx.employee.token,
            Some(json!({ "hours": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "hours");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_delete_referenced_user_deactivates() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/timesheets",
            &ctx.employee.token,
            Some(json!({ "taskId": ctx.task.id, "date": "2024-04-03", "hours": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .send(
            Method::DELETE,
            &format!("/api/users/{}", ctx.employee.user.id),
            &ctx.admin.token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["message"].as_str().unwrap().contains("deactivated"));

    let user = User::find_by_id(&ctx.db, ctx.employee.user.id).await.unwrap().unwrap();
    assert!(!user.is_active);

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/users/{}", ctx.admin.user.id),
            &ctx.admin.token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}
