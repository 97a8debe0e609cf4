use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use civicvoice_server::{
    app,
    config::Config,
    error::{AppError, Result},
    services::{
        drafter::OpenAiDrafter,
        mailer::{MailTransport, OutboundEmail, SimulatedMailer},
    },
    store::MemStore,
    AppState,
};

struct FailingMailer;

#[async_trait]
impl MailTransport for FailingMailer {
    async fn send(&self, _email: &OutboundEmail) -> Result<()> {
        Err(AppError::Upstream("mail transport unavailable".to_string()))
    }
}

fn test_config() -> Config {
    Config {
        port: 0,
        openai_base_url: "http://localhost:0/v1".to_string(),
        openai_api_key: None,
        openai_model: "gpt-4o".to_string(),
        upstream_timeout_secs: 1,
        email_from: "noreply@civicvoice.org".to_string(),
        seed_demo_data: false,
    }
}

fn test_app(mailer: Arc<dyn MailTransport>) -> Router {
    let config = test_config();
    app(AppState {
        store: Arc::new(MemStore::new()),
        drafter: Arc::new(OpenAiDrafter::from_config(&config)),
        mailer,
        config,
    })
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    forwarded_for: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn project_payload(title: &str) -> Value {
    json!({
        "title": title,
        "description": "Deep pothole causing vehicle damage.",
        "issueType": "pothole",
        "location": "Main Street & Broadway",
        "latitude": "37.7739",
        "longitude": "-122.4174",
        "urgencyLevel": "high",
        "emailSubject": "Hazardous Pothole on Main Street",
        "emailBody": "Dear Street Maintenance Department,\n\nPlease repair this pothole.",
        "emailRecipient": "streetmaintenance@cityname.gov"
    })
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app(Arc::new(SimulatedMailer));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_project_rejects_missing_fields() {
    let app = test_app(Arc::new(SimulatedMailer));
    let mut payload = project_payload("Pothole");
    payload["title"] = json!("   ");

    let (status, body) = request(&app, Method::POST, "/api/projects", Some(payload), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "title is required");
}

#[tokio::test]
async fn project_lifecycle_create_list_get() {
    let app = test_app(Arc::new(SimulatedMailer));

    let (status, created) = request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("Large Pothole on Main Street")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["upvoteCount"], 0);
    assert_eq!(created["progressStatus"], "idea_submitted");

    let (status, list) = request(&app, Method::GET, "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, fetched) = request(&app, Method::GET, "/api/projects/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Large Pothole on Main Street");

    let (status, _) = request(&app, Method::GET, "/api/projects/99", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upvote_dedup_over_http() {
    let app = test_app(Arc::new(SimulatedMailer));
    request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("Pothole")),
        None,
    )
    .await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/projects/1/upvote",
        None,
        Some("203.0.113.7"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvoteCount"], 1);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/projects/1/upvote",
        None,
        Some("203.0.113.7"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You have already upvoted this project");

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/projects/1/upvote",
        None,
        Some("203.0.113.8"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvoteCount"], 2);
}

#[tokio::test]
async fn comments_require_existing_project() {
    let app = test_app(Arc::new(SimulatedMailer));
    let comment = json!({ "text": "Agreed.", "commenterName": "David Chen" });

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/projects/1/comments",
        Some(comment.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("Pothole")),
        None,
    )
    .await;

    let (status, created) = request(
        &app,
        Method::POST,
        "/api/projects/1/comments",
        Some(comment),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["commenterName"], "David Chen");

    let (status, list) = request(&app, Method::GET, "/api/projects/1/comments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn generate_email_uses_department_directory_fallback() {
    let app = test_app(Arc::new(SimulatedMailer));
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/generate-email",
        Some(json!({
            "issueType": "crosswalk",
            "location": "Lincoln & 5th Ave",
            "description": "No safe crossing for pedestrians.",
            "urgencyLevel": "medium",
            "affectedGroups": "elderly_residents"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emailTo"], "transportation@cityname.gov");
    assert!(body["emailBody"]
        .as_str()
        .unwrap()
        .contains("Affected Groups: Elderly Residents"));
    assert!(body.get("warning").is_none());
}

#[tokio::test]
async fn regenerate_email_adjusts_tone_locally() {
    let app = test_app(Arc::new(SimulatedMailer));
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/regenerate-email",
        Some(json!({
            "emailBody": "Dear City Hall,\n\nThe pothole is bad.\n\nSincerely,\nMe",
            "tone": "assertive"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rewritten = body["emailBody"].as_str().unwrap();
    assert!(rewritten.starts_with("Dear City Hall,"));
    assert!(rewritten.contains("immediate attention"));
}

#[tokio::test]
async fn send_email_records_and_increments() {
    let app = test_app(Arc::new(SimulatedMailer));
    request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("Pothole")),
        None,
    )
    .await;

    let (status, record) = request(
        &app,
        Method::POST,
        "/api/send-email",
        Some(json!({
            "projectId": 1,
            "senderEmail": "Alex@Example.com",
            "senderName": "Alex Johnson"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["projectId"], 1);

    let (_, project) = request(&app, Method::GET, "/api/projects/1", None, None).await;
    assert_eq!(project["emailsSentCount"], 1);

    let (_, activities) = request(
        &app,
        Method::GET,
        "/api/projects/1/activities",
        None,
        None,
    )
    .await;
    let kinds: Vec<&str> = activities
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["activityType"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"email_sent"));
}

#[tokio::test]
async fn transport_failure_leaves_no_partial_effects() {
    let app = test_app(Arc::new(FailingMailer));
    request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("Pothole")),
        None,
    )
    .await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/send-email",
        Some(json!({ "projectId": 1 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "mail transport unavailable");

    let (_, project) = request(&app, Method::GET, "/api/projects/1", None, None).await;
    assert_eq!(project["emailsSentCount"], 0);
    assert_eq!(project["progressStatus"], "idea_submitted");

    let (_, activities) = request(
        &app,
        Method::GET,
        "/api/projects/1/activities",
        None,
        None,
    )
    .await;
    let kinds: Vec<&str> = activities
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["activityType"].as_str().unwrap())
        .collect();
    assert!(!kinds.contains(&"email_sent"));

    let (_, stats) = request(&app, Method::GET, "/api/stats", None, None).await;
    assert_eq!(stats["totalEmailsSent"], 0);
}

#[tokio::test]
async fn send_email_unknown_project_is_not_found() {
    let app = test_app(Arc::new(SimulatedMailer));
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/send-email",
        Some(json!({ "projectId": 42 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_start_empty_and_track_resolution() {
    let app = test_app(Arc::new(SimulatedMailer));
    let (status, stats) = request(&app, Method::GET, "/api/stats", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["activeIssues"], 0);
    assert_eq!(stats["successRatePercent"], 0);

    request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("A")),
        None,
    )
    .await;
    request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("B")),
        None,
    )
    .await;
    let (status, _) = request(
        &app,
        Method::PATCH,
        "/api/projects/1/status",
        Some(json!({ "progressStatus": "completed" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, stats) = request(&app, Method::GET, "/api/stats", None, None).await;
    assert_eq!(stats["activeIssues"], 1);
    assert_eq!(stats["issuesResolved"], 1);
    assert_eq!(stats["successRatePercent"], 50);
}

#[tokio::test]
async fn manual_status_endpoint_rejects_derived_statuses() {
    let app = test_app(Arc::new(SimulatedMailer));
    request(
        &app,
        Method::POST,
        "/api/projects",
        Some(project_payload("Pothole")),
        None,
    )
    .await;

    let (status, _) = request(
        &app,
        Method::PATCH,
        "/api/projects/1/status",
        Some(json!({ "progressStatus": "community_support" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, project) = request(
        &app,
        Method::PATCH,
        "/api/projects/1/status",
        Some(json!({ "progressStatus": "planning_stage" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["progressStatus"], "planning_stage");
}

#[tokio::test]
async fn recent_activities_honors_limit() {
    let app = test_app(Arc::new(SimulatedMailer));
    for title in ["A", "B", "C"] {
        request(
            &app,
            Method::POST,
            "/api/projects",
            Some(project_payload(title)),
            None,
        )
        .await;
    }

    let (status, activities) =
        request(&app, Method::GET, "/api/activities?limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let activities = activities.as_array().unwrap();
    assert_eq!(activities.len(), 2);
    assert!(activities[0]["description"]
        .as_str()
        .unwrap()
        .contains("C"));
}

#[tokio::test]
async fn register_validates_and_enforces_uniqueness() {
    let app = test_app(Arc::new(SimulatedMailer));
    let payload = json!({
        "username": "marialopez",
        "email": "maria@example.com",
        "password": "correct horse battery"
    });

    let (status, user) = request(
        &app,
        Method::POST,
        "/api/register",
        Some(payload.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "marialopez");
    assert_eq!(user["role"], "user");
    assert!(user.get("passwordHash").is_none());

    let (status, body) = request(&app, Method::POST, "/api/register", Some(payload), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username already taken");

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/register",
        Some(json!({ "username": "ab", "email": "x@example.com", "password": "longenough" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
