mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, expect_error, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_defaults_score_and_lists_by_name() {
    let app = TestApp::new().await;

    let pedro = app
        .create_client(json!({"name": "Pedro Lima", "email": "pedro@exemplo.com"}))
        .await;
    assert_eq!(pedro["reliability_score"], 5);
    assert_eq!(pedro["total_motorcycles"], 0);
    assert_eq!(pedro["total_sales"], 0.0);

    app.create_client(json!({"name": "Ana Costa", "document": "111.222.333-44", "reliability_score": 9}))
        .await;

    let list = body_json(app.as_admin(Method::GET, "/api/clients", None).await).await;
    let names: Vec<_> = list
        .as_array()
        .expect("array")
        .iter()
        .map(|c| c["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Ana Costa", "Pedro Lima"]);

    let by_document = body_json(
        app.as_admin(Method::GET, "/api/clients?search=222.333", None)
            .await,
    )
    .await;
    assert_eq!(by_document.as_array().map(Vec::len), Some(1));
    assert_eq!(by_document[0]["name"], "Ana Costa");

    let by_email = body_json(
        app.as_admin(Method::GET, "/api/clients?search=EXEMPLO", None)
            .await,
    )
    .await;
    assert_eq!(by_email[0]["name"], "Pedro Lima");

    for wildcard in ["%25", "_"] {
        let literal = body_json(
            app.as_admin(Method::GET, &format!("/api/clients?search={}", wildcard), None)
                .await,
        )
        .await;
        assert_eq!(literal, json!([]), "search={}", wildcard);
    }
}

#[tokio::test]
async fn reliability_score_bounds() {
    let app = TestApp::new().await;

    for score in [0, 10] {
        app.create_client(json!({"name": format!("Cliente {}", score), "reliability_score": score}))
            .await;
    }

    for score in [-1, 11] {
        let response = app
            .as_admin(
                Method::POST,
                "/api/clients",
                Some(json!({"name": "Fora", "reliability_score": score})),
            )
            .await;
        assert_eq!(
            expect_error(response, StatusCode::BAD_REQUEST).await,
            "A confiabilidade deve estar entre 0 e 10"
        );
    }
}

#[tokio::test]
async fn name_is_required_and_email_must_be_valid() {
    let app = TestApp::new().await;

    let blank = app
        .as_admin(Method::POST, "/api/clients", Some(json!({"name": "   "})))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let email = app
        .as_admin(
            Method::POST,
            "/api/clients",
            Some(json!({"name": "Carlos", "email": "carlos-sem-arroba"})),
        )
        .await;
    assert_eq!(
        expect_error(email, StatusCode::BAD_REQUEST).await,
        "Email inválido"
    );
}

#[tokio::test]
async fn totals_follow_the_ledger() {
    let app = TestApp::new().await;
    let client = app.create_client(json!({"name": "João da Silva"})).await;
    let first = app.create_motorcycle(json!({"price": 20000.0})).await;
    let second = app.create_motorcycle(json!({"price": 12000.0})).await;

    app.create_record(json!({
        "type": "entrada",
        "description": "Venda 1",
        "amount": 20000.0,
        "category": "Venda",
        "motorcycle_id": first["id"],
        "client_id": client["id"]
    }))
    .await;
    app.create_record(json!({
        "type": "entrada",
        "description": "Venda 2",
        "amount": 12000.0,
        "category": "Venda",
        "motorcycle_id": second["id"],
        "client_id": client["id"]
    }))
    .await;
    app.create_record(json!({
        "type": "saida",
        "description": "Documentação",
        "amount": 350.0,
        "category": "Documentação",
        "motorcycle_id": first["id"],
        "client_id": client["id"]
    }))
    .await;

    let fetched = body_json(
        app.as_admin(Method::GET, &format!("/api/clients/{}", client["id"]), None)
            .await,
    )
    .await;
    assert_eq!(fetched["total_motorcycles"], 2);
    assert_eq!(fetched["total_sales"], 32000.0);
}

#[tokio::test]
async fn update_and_delete() {
    let app = TestApp::new().await;
    let client = app
        .create_client(json!({"name": "Marina", "phone": "(11) 90000-0000"}))
        .await;
    let uri = format!("/api/clients/{}", client["id"]);

    let updated = app
        .as_admin(
            Method::PUT,
            &uri,
            Some(json!({"phone": null, "notes": "Prefere contato por email"})),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_json(updated).await;
    assert!(updated["phone"].is_null());
    assert_eq!(updated["notes"], "Prefere contato por email");
    assert_eq!(updated["name"], "Marina");

    let empty = app.as_admin(Method::PUT, &uri, Some(json!({}))).await;
    assert_eq!(
        expect_error(empty, StatusCode::BAD_REQUEST).await,
        "Nenhum campo para atualizar"
    );

    let deleted = app.as_admin(Method::DELETE, &uri, None).await;
    assert_eq!(deleted.status(), StatusCode::OK);

    let missing = app.as_admin(Method::GET, &uri, None).await;
    assert_eq!(
        expect_error(missing, StatusCode::NOT_FOUND).await,
        "Cliente não encontrado"
    );
}

#[tokio::test]
async fn deleting_a_client_keeps_its_records() {
    let app = TestApp::new().await;
    let client = app.create_client(json!({"name": "Roberto"})).await;
    let record = app
        .create_record(json!({
            "type": "entrada",
            "description": "Comissão de indicação",
            "amount": 300.0,
            "category": "Comissão",
            "client_id": client["id"]
        }))
        .await;
    assert_eq!(record["client_info"]["name"], "Roberto");

    app.as_admin(Method::DELETE, &format!("/api/clients/{}", client["id"]), None)
        .await;

    let kept = body_json(
        app.as_admin(
            Method::GET,
            &format!("/api/financial/records/{}", record["id"]),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(kept["amount"], 300.0);
    assert!(kept["client_id"].is_null());
    assert!(kept.get("client_info").is_none());
}

#[tokio::test]
async fn clients_require_a_session() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/clients", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let as_user = app
        .request(Method::GET, "/api/clients", None, Some(app.user_token()))
        .await;
    assert_eq!(as_user.status(), StatusCode::OK);
}
