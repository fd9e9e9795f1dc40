use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::catalog::CatalogService;
use crate::error::ApiError;
use crate::models::{ItemEnvelope, ListEnvelope};
use crate::query::{ListParams, ProductFilter};
use crate::uploads::collect_product_form;

pub async fn get_products(
    catalog: web::Data<CatalogService>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let filter = ProductFilter::new(ListParams::from_query(req.query_string()));
    let (items, total) = catalog.list(&filter)?;
    Ok(HttpResponse::Ok().json(ListEnvelope::new(items, total, &filter)))
}

pub async fn get_product(
    catalog: web::Data<CatalogService>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let product = catalog.get(id.into_inner())?;
    Ok(HttpResponse::Ok().json(ItemEnvelope::new(product)))
}

pub async fn create_product(
    catalog: web::Data<CatalogService>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (form, images) = collect_product_form(catalog.store(), payload).await?;
    let product = catalog.create(form, images)?;
    Ok(HttpResponse::Created().json(ItemEnvelope::new(product)))
}

pub async fn update_product(
    catalog: web::Data<CatalogService>,
    id: web::Path<i32>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (form, images) = collect_product_form(catalog.store(), payload).await?;
    let product = catalog.update(id.into_inner(), form, images)?;
    Ok(HttpResponse::Ok().json(ItemEnvelope::new(product)))
}

pub async fn delete_product(
    catalog: web::Data<CatalogService>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    catalog.delete(id.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": {} })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/products", web::get().to(get_products))
        .route("/api/products", web::post().to(create_product))
        .route("/api/products/{id}", web::get().to(get_product))
        .route("/api/products/{id}", web::put().to(update_product))
        .route("/api/products/{id}", web::delete().to(delete_product));
}
