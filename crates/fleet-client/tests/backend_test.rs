use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use fleet_client::{
    ClientConfig, HttpScheduler, HttpTransport, Outcome, PlannerState, ReportSession, RoutePlanner,
};
use fleet_core::{DispatchMode, FilterState, ReportKind, ScheduleBase, Scalar};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Backend {
    queries: Arc<Mutex<Vec<String>>>,
    posts: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Backend {
    fn record_query(&self, query: Option<String>) {
        self.queries.lock().unwrap().push(query.unwrap_or_default());
    }
}

async fn fuel_report(State(backend): State<Backend>, RawQuery(query): RawQuery) -> impl IntoResponse {
    backend.record_query(query);
    Json(json!([
        {"deviceName": "Truck 1", "totalMileage": 1234.5, "totalFuelUsed": 48500.56, "fuelRefillEvents": 1234},
        {"deviceName": "Van", "totalMileage": null}
    ]))
}

async fn insurance_report(State(backend): State<Backend>, RawQuery(query): RawQuery) -> impl IntoResponse {
    backend.record_query(query);
    (StatusCode::BAD_REQUEST, Json(json!({"message": "bad range"})))
}

async fn maintenance_mail(State(backend): State<Backend>, RawQuery(query): RawQuery) -> impl IntoResponse {
    backend.record_query(query);
    (StatusCode::INTERNAL_SERVER_ERROR, "oops")
}

async fn create_report(State(backend): State<Backend>, Json(body): Json<Value>) -> impl IntoResponse {
    backend.posts.lock().unwrap().push(("/api/reports".to_string(), body));
    Json(json!({"id": 11}))
}

async fn link_permission(State(backend): State<Backend>, Json(body): Json<Value>) -> impl IntoResponse {
    backend.posts.lock().unwrap().push(("/api/permissions".to_string(), body));
    StatusCode::NO_CONTENT
}

async fn devices() -> impl IntoResponse {
    Json(json!([
        {"id": 1, "name": "Truck 1", "position": {"lat": 38.5, "lng": -120.2}, "status": "online", "fuelConsumptionRate": 8.0},
        {"id": 2, "name": "Trailer", "status": "offline"}
    ]))
}

async fn route(State(backend): State<Backend>, RawQuery(query): RawQuery) -> impl IntoResponse {
    let query = query.unwrap_or_default();
    backend.record_query(Some(query.clone()));
    if query.contains("end=Nowhere") {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "no route found"})));
    }
    (
        StatusCode::OK,
        Json(json!([
            {"routeType": "fastest", "distanceKm": 100.0, "durationMin": 75.0, "polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"},
            {"routeType": "shortest", "distanceKm": 92.4, "durationMin": 88.0, "polyline": "not a polyline"}
        ])),
    )
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/api/reports/fuel", get(fuel_report))
        .route("/api/reports/insurance", get(insurance_report))
        .route("/api/reports/maintenance/mail", get(maintenance_mail))
        .route("/api/reports", post(create_report))
        .route("/api/permissions", post(link_permission))
        .route("/api/devices", get(devices))
        .route("/api/route", get(route))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), backend)
}

fn transport(base_url: &str) -> HttpTransport {
    HttpTransport::new(&ClientConfig::default().with_base_url(base_url)).unwrap()
}

#[tokio::test]
async fn generate_fetches_and_formats_rows() {
    let (base_url, backend) = spawn_backend().await;
    let session = ReportSession::new(transport(&base_url), ReportKind::Fuel.descriptor(), Default::default());
    let filter = FilterState::new(vec![1, 2], vec![5]);

    let outcome = session.submit(&filter, DispatchMode::Generate).await.unwrap();

    assert!(matches!(outcome, Outcome::Rows(ref rows) if rows.len() == 2));
    assert!(!session.is_loading());
    assert_eq!(backend.queries.lock().unwrap()[0], "deviceId=1&deviceId=2&groupId=5");

    let rows = session.formatted_rows();
    assert_eq!(rows[0]["totalFuelUsed"], "48,500.56");
    assert_eq!(rows[0]["fuelRefillEvents"], "1,234");
    assert_eq!(rows[1]["totalMileage"], "-");
}

#[tokio::test]
async fn generate_failure_surfaces_message_and_resets_loading() {
    let (base_url, _backend) = spawn_backend().await;
    let session = ReportSession::new(transport(&base_url), ReportKind::Insurance.descriptor(), Default::default());

    let err = session
        .submit(&FilterState::new(vec![1], vec![]), DispatchMode::Generate)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "bad range");
    assert_eq!(err.status(), Some(400));
    assert!(!session.is_loading());
}

#[tokio::test]
async fn mail_failure_surfaces_raw_body() {
    let (base_url, backend) = spawn_backend().await;
    let session = ReportSession::new(transport(&base_url), ReportKind::Maintenance.descriptor(), Default::default());
    let filter = FilterState::new(vec![3], vec![]).with_field("status", "Overdue");

    let err = session.submit(&filter, DispatchMode::Mail).await.unwrap_err();

    assert_eq!(err.user_message(), "oops");
    let query = backend.queries.lock().unwrap()[0].clone();
    assert!(query.starts_with("deviceId=3"));
    assert!(query.contains("status=Overdue"));
}

#[tokio::test]
async fn export_points_at_spreadsheet_endpoint() {
    let (base_url, backend) = spawn_backend().await;
    let session = ReportSession::new(transport(&base_url), ReportKind::Fuel.descriptor(), Default::default());

    let outcome = session
        .submit(&FilterState::new(vec![4], vec![]), DispatchMode::Export)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Redirected(format!("{}/api/reports/fuel/xlsx?deviceId=4", base_url))
    );
    assert!(backend.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn schedule_persists_and_links_permissions() {
    let (base_url, backend) = spawn_backend().await;
    let session = ReportSession::new(transport(&base_url), ReportKind::Behavior.descriptor(), Default::default());
    let scheduler = HttpScheduler::new(transport(&base_url));
    let filter = FilterState::new(vec![1, 2], vec![8, 9]).with_field("driverId", "D-17");
    let mut base = ScheduleBase {
        description: "Nightly behavior".to_string(),
        calendar_id: Some(3),
        ..ScheduleBase::default()
    };
    base.attributes.insert("driverId".to_string(), Scalar::from("stale"));

    session.schedule(&scheduler, &filter, base).await.unwrap();

    let posts = backend.posts.lock().unwrap().clone();
    assert_eq!(posts.len(), 4);
    let (path, report) = &posts[0];
    assert_eq!(path, "/api/reports");
    assert_eq!(report["type"], "behavior");
    assert_eq!(report["calendarId"], 3);
    assert_eq!(report["attributes"]["driverId"], "D-17");
    assert_eq!(posts[1].1, json!({"deviceId": 1, "reportId": 11}));
    assert_eq!(posts[2].1, json!({"deviceId": 2, "reportId": 11}));
    assert_eq!(posts[3].1, json!({"groupId": 8, "reportId": 11}));
}

#[tokio::test]
async fn plan_routes_against_backend() {
    let (base_url, backend) = spawn_backend().await;
    let mut planner = RoutePlanner::new(transport(&base_url));

    planner.load_devices().await.unwrap();
    planner.set_map_ready(true);
    let routes = planner.plan_routes(1, "Depot", "Harbour").await.unwrap();

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].alternative.estimated_fuel_liters.to_string(), "8.00");
    assert_eq!(routes[0].path.len(), 3);
    assert_eq!(planner.state(), &PlannerState::Rendered);
    assert_eq!(
        backend.queries.lock().unwrap()[0],
        "deviceId=1&start=Depot&end=Harbour"
    );

    let err = planner.plan_routes(1, "Depot", "Nowhere").await.unwrap_err();
    assert_eq!(err.to_string(), "no route found");
    assert_eq!(planner.state(), &PlannerState::Failed("no route found".to_string()));
    assert_eq!(planner.routes().len(), 1);

    assert!(planner.plan_routes(2, "Depot", "Harbour").await.is_err());
    assert_eq!(backend.queries.lock().unwrap().len(), 2);
}
