use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::Product;
use crate::query::ProductFilter;

/// Both fields may be set; the percentage takes precedence when non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub amount: f64,
    pub percentage: f64,
}

/// API shape of a product. The storage row keeps flat discount columns and
/// snake_case names; the wire format is camelCase with a nested discount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub sizes: Vec<String>,
    pub src_url: String,
    pub gallery: Vec<String>,
    pub discount: Discount,
    pub rating: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        ProductResponse {
            id: product.id,
            title: product.title,
            description: product.description,
            price: product.price,
            category: product.category,
            sizes: product.sizes,
            src_url: product.src_url,
            gallery: product.gallery,
            discount: Discount {
                amount: product.discount_amount,
                percentage: product.discount_percentage,
            },
            rating: product.rating,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListEnvelope {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub data: Vec<ProductResponse>,
}

impl ListEnvelope {
    pub fn new(items: Vec<Product>, total: i64, filter: &ProductFilter) -> Self {
        let data: Vec<ProductResponse> = items.into_iter().map(ProductResponse::from).collect();
        ListEnvelope {
            success: true,
            count: data.len(),
            total,
            page: filter.page,
            pages: total_pages(total, filter.limit),
            data,
        }
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[derive(Debug, Serialize)]
pub struct ItemEnvelope {
    pub success: bool,
    pub data: ProductResponse,
}

impl ItemEnvelope {
    pub fn new(product: Product) -> Self {
        ItemEnvelope {
            success: true,
            data: ProductResponse::from(product),
        }
    }
}

/// Submitted form values, kept verbatim so a validation failure can echo
/// them back to the caller unchanged.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub discount_amount: String,
    pub discount_percentage: String,
    pub sizes: Vec<String>,
}
