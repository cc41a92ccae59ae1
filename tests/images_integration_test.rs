mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_bytes, body_json, expect_error, TestApp, TEST_MAX_UPLOAD_BYTES};
use serde_json::{json, Value};

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

async fn motorcycle_id(app: &TestApp) -> i32 {
    let created = app.create_motorcycle(json!({})).await;
    created["id"].as_i64().expect("id") as i32
}

async fn upload(app: &TestApp, bike: i32, filename: &str, order: Option<i32>) -> Value {
    let response = app
        .upload_image(bike, filename, "image/jpeg", JPEG_BYTES, order, Some(app.admin_token()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn uploaded_image_is_listed_and_served() {
    let app = TestApp::new().await;
    let bike = motorcycle_id(&app).await;

    let image = upload(&app, bike, "frente da moto.jpg", Some(2)).await;
    assert_eq!(image["motorcycle_id"], bike);
    assert_eq!(image["display_order"], 2);
    let url = image["image_url"].as_str().expect("image_url").to_string();
    assert!(url.starts_with(&format!("/api/files/motorcycles/{}/", bike)));
    assert!(url.ends_with("frente_da_moto.jpg"));
    assert_eq!(app.store.len().await, 1);

    let list = app
        .request(Method::GET, &format!("/api/motorcycles/{}/images", bike), None, None)
        .await;
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(body_json(list).await.as_array().map(Vec::len), Some(1));

    let served = app.request(Method::GET, &url, None, None).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(
        served.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("image/jpeg")
    );
    assert_eq!(
        served
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=31536000")
    );
    assert_eq!(
        served
            .headers()
            .get(header::X_CONTENT_TYPE_OPTIONS)
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
    assert!(served.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    assert_eq!(body_bytes(served).await, JPEG_BYTES);
}

#[tokio::test]
async fn scriptable_image_formats_are_rejected() {
    let app = TestApp::new().await;
    let bike = motorcycle_id(&app).await;
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#;

    let response = app
        .upload_image(bike, "x.svg", "image/svg+xml", svg, None, Some(app.user_token()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.len().await, 0);

    // a raster type with an svg name is stored, never served as svg
    let disguised = app
        .upload_image(bike, "x.svg", "image/png", svg, None, Some(app.user_token()))
        .await;
    assert_eq!(disguised.status(), StatusCode::CREATED);
    let url = body_json(disguised).await["image_url"]
        .as_str()
        .expect("image_url")
        .to_string();
    let served = app.request(Method::GET, &url, None, None).await;
    assert_eq!(
        served.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
}

#[tokio::test]
async fn detail_includes_gallery_in_display_order() {
    let app = TestApp::new().await;
    let bike = motorcycle_id(&app).await;

    let lateral = upload(&app, bike, "lateral.jpg", Some(3)).await;
    let frente = upload(&app, bike, "frente.jpg", Some(1)).await;
    let painel = upload(&app, bike, "painel.jpg", None).await;

    let detail = body_json(
        app.request(Method::GET, &format!("/api/motorcycles/{}", bike), None, None)
            .await,
    )
    .await;
    let order: Vec<_> = detail["images"]
        .as_array()
        .expect("images")
        .iter()
        .map(|i| i["id"].clone())
        .collect();
    assert_eq!(order, vec![painel["id"].clone(), frente["id"].clone(), lateral["id"].clone()]);

    let moved = app
        .as_admin(
            Method::PUT,
            &format!("/api/images/{}", painel["id"]),
            Some(json!({"display_order": 9})),
        )
        .await;
    assert_eq!(moved.status(), StatusCode::OK);
    assert_eq!(body_json(moved).await["display_order"], 9);
}

#[tokio::test]
async fn upload_validation() {
    let app = TestApp::new().await;
    let bike = motorcycle_id(&app).await;
    let token = Some(app.admin_token());

    let text = app
        .upload_image(bike, "notas.txt", "text/plain", b"ola", None, token)
        .await;
    assert_eq!(
        expect_error(text, StatusCode::BAD_REQUEST).await,
        "Arquivo deve ser uma imagem"
    );

    let too_big = vec![0u8; TEST_MAX_UPLOAD_BYTES + 1];
    let big = app
        .upload_image(bike, "enorme.jpg", "image/jpeg", &too_big, None, token)
        .await;
    assert_eq!(big.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let accepted = app
        .upload_image(bike, "a.jpg", "image/jpeg", JPEG_BYTES, None, token)
        .await;
    assert_eq!(accepted.status(), StatusCode::CREATED);

    let missing_bike = app
        .upload_image(bike + 100, "a.jpg", "image/jpeg", JPEG_BYTES, None, token)
        .await;
    assert_eq!(
        expect_error(missing_bike, StatusCode::NOT_FOUND).await,
        "Moto não encontrada"
    );

    let not_multipart = app
        .as_admin(
            Method::POST,
            &format!("/api/motorcycles/{}/images", bike),
            Some(json!({"image": "base64"})),
        )
        .await;
    assert_eq!(
        expect_error(not_multipart, StatusCode::BAD_REQUEST).await,
        "Nenhuma imagem enviada"
    );

    // nothing rejected above may leave an object behind
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn upload_requires_a_session() {
    let app = TestApp::new().await;
    let bike = motorcycle_id(&app).await;
    let response = app
        .upload_image(bike, "a.jpg", "image/jpeg", JPEG_BYTES, None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.len().await, 0);
}

#[tokio::test]
async fn deleting_the_thumbnail_image_clears_the_thumbnail() {
    let app = TestApp::new().await;
    let bike = motorcycle_id(&app).await;
    let image = upload(&app, bike, "capa.jpg", None).await;
    let url = image["image_url"].as_str().expect("image_url").to_string();

    let thumb = app
        .as_admin(
            Method::PUT,
            &format!("/api/motorcycles/{}/thumbnail", bike),
            Some(json!({"thumbnail_url": url})),
        )
        .await;
    assert_eq!(thumb.status(), StatusCode::OK);

    let deleted = app
        .as_admin(Method::DELETE, &format!("/api/images/{}", image["id"]), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(app.store.len().await, 0);

    let detail = body_json(
        app.request(Method::GET, &format!("/api/motorcycles/{}", bike), None, None)
            .await,
    )
    .await;
    assert!(detail["thumbnail_url"].is_null());
    assert_eq!(detail["images"], json!([]));

    let served = app.request(Method::GET, &url, None, None).await;
    assert_eq!(
        expect_error(served, StatusCode::NOT_FOUND).await,
        "Arquivo não encontrado"
    );

    let again = app
        .as_admin(Method::DELETE, &format!("/api/images/{}", image["id"]), None)
        .await;
    assert_eq!(
        expect_error(again, StatusCode::NOT_FOUND).await,
        "Imagem não encontrada"
    );
}

#[tokio::test]
async fn deleting_a_motorcycle_removes_its_images() {
    let app = TestApp::new().await;
    let bike = motorcycle_id(&app).await;
    upload(&app, bike, "a.jpg", None).await;
    upload(&app, bike, "b.jpg", None).await;
    assert_eq!(app.store.len().await, 2);

    let deleted = app
        .as_admin(Method::DELETE, &format!("/api/motorcycles/{}", bike), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(app.store.len().await, 0);

    let list = app
        .request(Method::GET, &format!("/api/motorcycles/{}/images", bike), None, None)
        .await;
    assert_eq!(body_json(list).await, json!([]));
}

#[tokio::test]
async fn file_keys_cannot_escape_the_store() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/files/motorcycles/..%2F..%2Fsecret", None, None)
        .await;
    assert_eq!(
        expect_error(response, StatusCode::BAD_REQUEST).await,
        "Caminho de arquivo inválido"
    );
}
