use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;

use crate::db::models::{NewProduct, Product, UpdateProduct};
use crate::db::schema::products;
use crate::query::{ProductFilter, SortKey};

pub fn create_product(conn: &mut PgConnection, new_product: NewProduct) -> QueryResult<Product> {
    diesel::insert_into(products::table)
        .values(&new_product)
        .get_result(conn)
}

pub fn get_product(conn: &mut PgConnection, id: i32) -> QueryResult<Product> {
    products::table.find(id).first(conn)
}

pub fn update_product(
    conn: &mut PgConnection,
    id: i32,
    changes: UpdateProduct,
) -> QueryResult<Product> {
    diesel::update(products::table.find(id))
        .set((changes, products::updated_at.eq(Utc::now().naive_utc())))
        .get_result(conn)
}

pub fn delete_product(conn: &mut PgConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(products::table.find(id)).execute(conn)
}

/// Runs the filter twice: once for the pre-pagination total, once for the
/// requested page. An out-of-range page simply loads an empty page.
pub fn list_products(
    conn: &mut PgConnection,
    filter: &ProductFilter,
) -> QueryResult<(Vec<Product>, i64)> {
    let total: i64 = apply_filter(products::table.into_boxed(), filter)
        .count()
        .get_result(conn)?;

    let mut query = apply_filter(products::table.into_boxed(), filter);
    query = match filter.sort {
        SortKey::PriceAsc => query.order(products::price.asc()),
        SortKey::PriceDesc => query.order(products::price.desc()),
        SortKey::Oldest => query.order((products::created_at.asc(), products::id.asc())),
        SortKey::Newest => query.order((products::created_at.desc(), products::id.desc())),
    };

    let items = query
        .offset(filter.offset())
        .limit(filter.limit)
        .load(conn)?;

    Ok((items, total))
}

fn apply_filter<'a>(
    mut query: products::BoxedQuery<'a, Pg>,
    filter: &ProductFilter,
) -> products::BoxedQuery<'a, Pg> {
    if let Some(category) = &filter.category {
        query = query.filter(products::category.eq(category.clone()));
    }

    // ANY-of match: the product's size set must intersect the requested set.
    if !filter.sizes.is_empty() {
        query = query.filter(products::sizes.overlaps_with(filter.sizes.clone()));
    }

    if let Some(min) = filter.min_price {
        query = query.filter(products::price.ge(min));
    }

    if let Some(max) = filter.max_price {
        query = query.filter(products::price.le(max));
    }

    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        query = query.filter(
            products::title
                .ilike(pattern.clone())
                .or(products::description.ilike(pattern)),
        );
    }

    if let Some(exclude) = filter.exclude {
        query = query.filter(products::id.ne(exclude));
    }

    query
}

/// Substring pattern for ILIKE with the LIKE metacharacters escaped, so a
/// search for `100%` matches the literal text.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
