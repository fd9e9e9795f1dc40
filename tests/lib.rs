use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use serde_json::Value;

use storefront::catalog::CatalogService;
use storefront::handlers;
use storefront::uploads::FileStore;

// An unreachable database with a short acquire timeout: request handling
// must surface a uniform failure envelope instead of crashing, and uploads
// written before the failure must be compensated away.
fn test_catalog(dir: &Path) -> web::Data<CatalogService> {
    let manager =
        ConnectionManager::<PgConnection>::new("postgres://storefront@127.0.0.1:1/storefront");
    let pool = Pool::builder()
        .max_size(1)
        .connection_timeout(Duration::from_millis(250))
        .build_unchecked(manager);
    let store = FileStore::open(dir, 5 * 1024 * 1024, 5).unwrap();
    web::Data::new(CatalogService::new(pool, store))
}

fn upload_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("storefront-it-{}-{}", tag, std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    dir
}

fn stored_file_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

const BOUNDARY: &str = "------------------------storefront-test";

fn multipart_body(
    fields: &[(&str, &str)],
    files: &[(&str, &str, &str, &[u8])],
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    for (name, filename, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
}

const COMPLETE_FIELDS: [(&str, &str); 6] = [
    ("title", "Tee"),
    ("description", "x"),
    ("price", "500"),
    ("category", "T-shirts"),
    ("sizes", "S"),
    ("sizes", "M"),
];

#[actix_web::test]
async fn list_surfaces_storage_failure_as_envelope() {
    let dir = upload_dir("list");
    let app = test::init_service(
        App::new()
            .app_data(test_catalog(&dir))
            .configure(handlers::routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/products?category=T-shirts&sort=price-asc&page=2")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Server Error");

    fs::remove_dir_all(&dir).unwrap();
}

#[actix_web::test]
async fn get_single_product_surfaces_storage_failure() {
    let dir = upload_dir("get");
    let app = test::init_service(
        App::new()
            .app_data(test_catalog(&dir))
            .configure(handlers::routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/products/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    fs::remove_dir_all(&dir).unwrap();
}

#[actix_web::test]
async fn create_with_missing_title_echoes_form_and_stores_nothing() {
    let dir = upload_dir("missing-title");
    let app = test::init_service(
        App::new()
            .app_data(test_catalog(&dir))
            .configure(handlers::routes),
    )
    .await;

    let fields = [
        ("description", "x"),
        ("price", "500"),
        ("category", "T-shirts"),
        ("sizes", "S"),
    ];
    let files: [(&str, &str, &str, &[u8]); 1] =
        [("gallery", "tee.jpg", "image/jpeg", b"not-really-a-jpeg")];
    let (content_type, body) = multipart_body(&fields, &files);

    let req = test::TestRequest::post()
        .uri("/api/products")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["formData"]["price"], "500");
    assert_eq!(body["formData"]["category"], "T-shirts");

    // The rejected submission must not leave uploaded files behind.
    assert_eq!(stored_file_count(&dir), 0);
    fs::remove_dir_all(&dir).unwrap();
}

#[actix_web::test]
async fn create_without_image_is_rejected() {
    let dir = upload_dir("no-image");
    let app = test::init_service(
        App::new()
            .app_data(test_catalog(&dir))
            .configure(handlers::routes),
    )
    .await;

    let (content_type, body) = multipart_body(&COMPLETE_FIELDS, &[]);
    let req = test::TestRequest::post()
        .uri("/api/products")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "Please upload at least one product image"
    );
    assert_eq!(body["formData"]["title"], "Tee");

    fs::remove_dir_all(&dir).unwrap();
}

#[actix_web::test]
async fn create_storage_failure_leaves_no_uploaded_files() {
    let dir = upload_dir("storage-failure");
    let app = test::init_service(
        App::new()
            .app_data(test_catalog(&dir))
            .configure(handlers::routes),
    )
    .await;

    let files: [(&str, &str, &str, &[u8]); 2] = [
        ("gallery", "front.jpg", "image/jpeg", b"front-bytes"),
        ("gallery", "back.png", "image/png", b"back-bytes"),
    ];
    let (content_type, body) = multipart_body(&COMPLETE_FIELDS, &files);

    let req = test::TestRequest::post()
        .uri("/api/products")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    // The record write cannot succeed; the envelope is generic and the
    // just-uploaded gallery is compensated away.
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Server Error");
    assert_eq!(stored_file_count(&dir), 0);

    fs::remove_dir_all(&dir).unwrap();
}

#[actix_web::test]
async fn create_rejects_disallowed_file_type() {
    let dir = upload_dir("bad-type");
    let app = test::init_service(
        App::new()
            .app_data(test_catalog(&dir))
            .configure(handlers::routes),
    )
    .await;

    let files: [(&str, &str, &str, &[u8]); 2] = [
        ("gallery", "front.jpg", "image/jpeg", b"front-bytes"),
        ("gallery", "anim.gif", "image/gif", b"gif-bytes"),
    ];
    let (content_type, body) = multipart_body(&COMPLETE_FIELDS, &files);

    let req = test::TestRequest::post()
        .uri("/api/products")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "Only image files are allowed (jpg, jpeg, png, webp)"
    );
    // The earlier accepted file must also be cleaned up.
    assert_eq!(stored_file_count(&dir), 0);

    fs::remove_dir_all(&dir).unwrap();
}

#[actix_web::test]
async fn update_storage_failure_cleans_replacement_images() {
    let dir = upload_dir("update-failure");
    let app = test::init_service(
        App::new()
            .app_data(test_catalog(&dir))
            .configure(handlers::routes),
    )
    .await;

    let files: [(&str, &str, &str, &[u8]); 1] =
        [("gallery", "new.webp", "image/webp", b"webp-bytes")];
    let (content_type, body) = multipart_body(&COMPLETE_FIELDS, &files);

    let req = test::TestRequest::put()
        .uri("/api/products/1")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(stored_file_count(&dir), 0);

    fs::remove_dir_all(&dir).unwrap();
}
