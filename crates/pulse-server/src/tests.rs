//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use pulse_core::{import_csv, SourceConfig, Warehouse};
use tempfile::TempDir;
use tower::ServiceExt;

const SALES_CSV: &str = "\
Retailer,Invoice Date,Region,State,City,Product,Price per Unit,Units Sold,Total Sales,Operating Profit,Operating Margin,Sales Method
West Gear,2021-01-10,West,California,Los Angeles,Men's Street Footwear,50,1000,1000000,400000,40%,In-store
West Gear,2021-02-10,West,California,Los Angeles,Men's Street Footwear,50,1100,1100000,440000,40%,Online
Foot Locker,2021-03-10,Northeast,New York,New York,Women's Apparel,60,1200,1200000,360000,30%,Online
Foot Locker,2021-04-10,Northeast,New York,New York,Women's Apparel,60,1300,1300000,390000,30%,Outlet
";

fn setup_test_app() -> Router {
    let mut config = Config::default();
    config.source = SourceConfig::synthetic();
    config.server.allowed_origins = vec![];
    create_router(config)
}

/// App backed by a real warehouse file; keep the TempDir alive for the test
fn setup_warehouse_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pulse.db");
    let warehouse = Warehouse::create(&path).unwrap();
    import_csv(&warehouse, SALES_CSV.as_bytes()).unwrap();

    let mut config = Config::default();
    config.source = SourceConfig::warehouse(path);
    (create_router(config), dir)
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ========== Health & Periods ==========

#[tokio::test]
async fn test_health() {
    let response = get(setup_test_app(), "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_list_periods() {
    let response = get(setup_test_app(), "/api/periods").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let presets = json["presets"].as_array().unwrap();
    assert_eq!(presets.len(), 5);
    assert_eq!(presets[2]["id"], "q1-2021");
    assert_eq!(presets[2]["window"]["start"], "2021-01-01");
    assert_eq!(presets[2]["window"]["end"], "2021-03-31");
    assert_eq!(json["origin"]["kind"], "synthetic");
    assert_eq!(json["fallback_used"], false);
}

// ========== Dashboard ==========

#[tokio::test]
async fn test_dashboard_default_period() {
    let response = get(setup_test_app(), "/api/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["total_records"], 1000);
    assert_eq!(json["kpis"]["status"], "ready");
    assert_eq!(json["forecast"]["status"], "ready");
    assert_eq!(json["alerts"]["retailers"]["status"], "ready");
    assert_eq!(json["insights"]["data"].as_array().unwrap().len(), 6);

    let tables = &json["tables"]["data"];
    let years: Vec<i64> = tables["yearly"]
        .as_array()
        .unwrap()
        .iter()
        .map(|y| y["year"].as_i64().unwrap())
        .collect();
    assert_eq!(years, vec![2020, 2021]);
    assert!(tables["retailer_performance"][0]["secondary"].is_number());
    assert_eq!(tables["monthly_by_gender"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_dashboard_empty_window_keeps_rendering() {
    let response = get(
        setup_test_app(),
        "/api/dashboard?from=2030-01-01&to=2030-12-31",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["filtered_records"], 0);
    assert_eq!(json["kpis"]["status"], "ready");
    assert_eq!(json["growth"]["status"], "unavailable");
    assert_eq!(json["alerts"]["retailers"]["status"], "unavailable");
}

#[tokio::test]
async fn test_dashboard_falls_back_when_warehouse_missing() {
    let mut config = Config::default();
    config.source = SourceConfig::warehouse("/nonexistent/pulse.db");
    let response = get(create_router(config), "/api/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["fallback_used"], true);
    assert_eq!(json["origin"]["kind"], "synthetic");
}

#[tokio::test]
async fn test_unreachable_warehouse_without_fallback_is_internal_error() {
    let mut config = Config::default();
    config.source = SourceConfig {
        database: Some("/nonexistent/pulse.db".into()),
        fallback_to_synthetic: false,
    };
    let response = get(create_router(config), "/api/dashboard").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "An internal error occurred");
}

// ========== KPIs ==========

#[tokio::test]
async fn test_kpis_from_warehouse() {
    let (app, _dir) = setup_warehouse_app();
    let response = get(app, "/api/kpis?period=q1-2021").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["records"], 3);
    let total = json["kpis"]["total_sales"].as_f64().unwrap();
    assert!((total - 3.3).abs() < 1e-9);
    // 4.6M over four distinct months
    let baseline = json["kpis"]["historical_avg_sales"].as_f64().unwrap();
    assert!((baseline - 1.15).abs() < 1e-9);
    assert_eq!(json["growth"]["status"], "ready");
}

#[tokio::test]
async fn test_unknown_period_is_bad_request() {
    let response = get(setup_test_app(), "/api/kpis?period=next-decade").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Unknown period"));
}

#[tokio::test]
async fn test_half_custom_period_is_bad_request() {
    let response = get(setup_test_app(), "/api/kpis?from=2021-01-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_custom_date_is_bad_request() {
    let response = get(setup_test_app(), "/api/kpis?from=2021-13-01&to=2021-12-31").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Forecast ==========

#[tokio::test]
async fn test_linear_forecast_from_warehouse() {
    let (app, _dir) = setup_warehouse_app();
    let response = get(app, "/api/forecast?period=year-2021&algorithm=linear").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["algorithm"], "linear");
    assert_eq!(json["monthly"].as_array().unwrap().len(), 4);
    assert_eq!(json["forecast"]["status"], "available");
    assert_eq!(json["forecast"]["trend"], "up");
    let prediction = json["forecast"]["prediction"].as_f64().unwrap();
    assert!((prediction - 1_400_000.0).abs() < 1e-3);
    assert_eq!(json["alerts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_forecast_with_short_history_is_insufficient() {
    let (app, _dir) = setup_warehouse_app();
    let response = get(app, "/api/forecast?from=2021-01-01&to=2021-02-28").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["forecast"]["status"], "insufficient_data");
    assert_eq!(json["forecast"]["months"], 2);
}

#[tokio::test]
async fn test_unknown_algorithm_is_bad_request() {
    let response = get(setup_test_app(), "/api/forecast?algorithm=crystal-ball").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Alerts & Insights ==========

#[tokio::test]
async fn test_alerts_from_warehouse() {
    let (app, _dir) = setup_warehouse_app();
    let response = get(app, "/api/alerts?period=extent").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["period"]["start"], "2021-01-10");
    let retailers = json["alerts"]["retailers"]["data"].as_array().unwrap();
    assert_eq!(retailers[0]["subject"], "Foot Locker");
    assert_eq!(retailers[0]["level"], "success");
    assert_eq!(retailers[1]["subject"], "West Gear");
}

#[tokio::test]
async fn test_insights_for_focus() {
    let (app, _dir) = setup_warehouse_app();
    let response = get(app, "/api/insights?period=extent&focus=retailer").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["focus"], "retailer");
    let insights = json["insights"].as_array().unwrap();
    assert_eq!(insights.len(), 1);
    assert!(insights[0]
        .as_str()
        .unwrap()
        .starts_with("Foot Locker leads retailers with $2.5M"));
}

#[tokio::test]
async fn test_insights_on_empty_period_is_unprocessable() {
    let response = get(
        setup_test_app(),
        "/api/insights?from=2030-01-01&to=2030-12-31",
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("no records"));
}

#[tokio::test]
async fn test_unknown_focus_is_bad_request() {
    let response = get(setup_test_app(), "/api/insights?focus=weather").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
