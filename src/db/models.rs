use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema::products;

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct Product {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub sizes: Vec<String>,
    pub src_url: String,
    pub gallery: Vec<String>,
    pub discount_amount: f64,
    pub discount_percentage: f64,
    pub rating: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub sizes: Vec<String>,
    pub src_url: String,
    pub gallery: Vec<String>,
    pub discount_amount: f64,
    pub discount_percentage: f64,
    pub rating: f64,
}

// None fields are left untouched by the changeset; `src_url`/`gallery` stay
// None when an update arrives without replacement images.
#[derive(AsChangeset, Deserialize, Debug, Default)]
#[diesel(table_name = products)]
pub struct UpdateProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub src_url: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub discount_amount: Option<f64>,
    pub discount_percentage: Option<f64>,
}
