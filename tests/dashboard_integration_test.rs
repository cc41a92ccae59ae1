mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{body_json, TestApp};
use repasses_api::{common::month_start, services::dashboard::month_label};
use serde_json::json;

#[tokio::test]
async fn stats_aggregate_inventory_and_ledger() {
    let app = TestApp::new().await;
    let today = Utc::now().date_naive();

    app.create_motorcycle(json!({"model": "Financiada", "is_financed": true}))
        .await;
    app.create_motorcycle(json!({"model": "Reservada", "status": "reservada", "is_overdue": true}))
        .await;
    let sold = app.create_motorcycle(json!({"model": "Vendida"})).await;
    let client = app.create_client(json!({"name": "Comprador"})).await;

    for (kind, category, amount, date, motorcycle) in [
        ("entrada", "Venda", 20000.0, today, Some(sold["id"].clone())),
        ("saida", "Manutenção", 500.0, today, None),
        ("saida", "Aquisição", 15000.0, month_start(today, 2), None),
        ("entrada", "Outros", 1000.0, month_start(today, 8), None),
    ] {
        app.create_record(json!({
            "type": kind,
            "description": category,
            "amount": amount,
            "category": category,
            "date": date.to_string(),
            "motorcycle_id": motorcycle,
            "client_id": if kind == "entrada" && category == "Venda" { client["id"].clone() } else { json!(null) }
        }))
        .await;
    }

    let response = app
        .request(Method::GET, "/api/dashboard/stats", None, Some(app.user_token()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let stats = &body["stats"];

    assert_eq!(stats["totalMotos"], 3);
    assert_eq!(stats["motosDisponiveis"], 1);
    assert_eq!(stats["motosVendidas"], 1);
    assert_eq!(stats["motosReservadas"], 1);
    assert_eq!(stats["motosFinanciadas"], 1);
    assert_eq!(stats["motosAtrasadas"], 1);
    assert_eq!(stats["clientesAtivos"], 1);
    assert_eq!(stats["totalEntradas"], 21000.0);
    assert_eq!(stats["totalSaidas"], 15500.0);
    assert_eq!(stats["saldo"], 5500.0);
    assert_eq!(stats["vendasMes"], 1);
    assert_eq!(stats["lucroMes"], 19500.0);

    let monthly = body["monthlyData"].as_array().expect("monthlyData");
    assert_eq!(monthly.len(), 6);

    let labels: Vec<_> = monthly.iter().map(|p| p["month"].clone()).collect();
    let expected: Vec<_> = (0..6)
        .rev()
        .map(|offset| json!(month_label(month_start(today, offset))))
        .collect();
    assert_eq!(labels, expected);

    let current = &monthly[5];
    assert_eq!(current["vendas"], 1);
    assert_eq!(current["entradas"], 20000.0);
    assert_eq!(current["saidas"], 500.0);
    assert_eq!(current["lucro"], 19500.0);

    let two_months_ago = &monthly[3];
    assert_eq!(two_months_ago["vendas"], 0);
    assert_eq!(two_months_ago["saidas"], 15000.0);
    assert_eq!(two_months_ago["lucro"], -15000.0);

    // the record from eight months back counts in totals only
    let charted: f64 = monthly
        .iter()
        .map(|p| p["entradas"].as_f64().unwrap_or_default())
        .sum();
    assert_eq!(charted, 20000.0);
}

#[tokio::test]
async fn empty_dashboard_has_six_zero_months() {
    let app = TestApp::new().await;
    let body = body_json(
        app.request(Method::GET, "/api/dashboard/stats", None, Some(app.admin_token()))
            .await,
    )
    .await;

    assert_eq!(body["stats"]["totalMotos"], 0);
    assert_eq!(body["stats"]["saldo"], 0.0);
    let monthly = body["monthlyData"].as_array().expect("monthlyData");
    assert_eq!(monthly.len(), 6);
    assert!(monthly.iter().all(|p| p["vendas"] == 0 && p["lucro"] == 0.0));
}

#[tokio::test]
async fn dashboard_requires_a_session() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/dashboard/stats", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
