//! Catalog service: validation and CRUD orchestration over the product
//! repository and the upload store. Image files are written before the
//! record and compensated on failure, so a stored record never points at a
//! missing file; orphaned files are the acceptable failure mode, dangling
//! references are not.

use crate::db::connection::{PgPool, PgPooledConnection};
use crate::db::models::{NewProduct, Product, UpdateProduct};
use crate::db::repository;
use crate::error::ApiError;
use crate::models::ProductForm;
use crate::query::ProductFilter;
use crate::uploads::{FileStore, StoredImage};

/// Context object constructed once at startup; owns the pool and the file
/// store instead of reaching for process-global state.
pub struct CatalogService {
    pool: PgPool,
    store: FileStore,
}

struct ValidDraft {
    title: String,
    description: String,
    category: String,
    price: f64,
    sizes: Vec<String>,
    discount_amount: f64,
    discount_percentage: f64,
}

impl CatalogService {
    pub fn new(pool: PgPool, store: FileStore) -> Self {
        CatalogService { pool, store }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    fn conn(&self) -> Result<PgPooledConnection, ApiError> {
        self.pool.get().map_err(ApiError::from)
    }

    pub fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), ApiError> {
        let mut conn = self.conn()?;
        repository::list_products(&mut conn, filter).map_err(ApiError::from)
    }

    pub fn get(&self, id: i32) -> Result<Product, ApiError> {
        let mut conn = self.conn()?;
        repository::get_product(&mut conn, id).map_err(ApiError::from)
    }

    /// Creates a product from an already-uploaded image set. Any failure
    /// (validation, pool acquisition, the insert itself) removes the
    /// uploaded files before the error propagates.
    pub fn create(
        &self,
        form: ProductForm,
        images: Vec<StoredImage>,
    ) -> Result<Product, ApiError> {
        let draft = match validate_form(&form) {
            Ok(draft) => draft,
            Err(message) => {
                self.discard_images(&images);
                return Err(ApiError::validation(message, &form));
            }
        };
        if images.is_empty() {
            return Err(ApiError::validation(
                "Please upload at least one product image",
                &form,
            ));
        }

        let record = assemble_record(draft, &images);

        let mut conn = match self.conn() {
            Ok(conn) => conn,
            Err(err) => {
                self.discard_images(&images);
                return Err(err);
            }
        };
        match repository::create_product(&mut conn, record) {
            Ok(product) => Ok(product),
            Err(err) => {
                self.discard_images(&images);
                Err(err.into())
            }
        }
    }

    /// Full field overwrite. A non-empty image set replaces the gallery
    /// wholesale; the superseded files are removed only after the record
    /// write succeeds. An empty image set keeps the existing gallery.
    pub fn update(
        &self,
        id: i32,
        form: ProductForm,
        images: Vec<StoredImage>,
    ) -> Result<Product, ApiError> {
        let draft = match validate_form(&form) {
            Ok(draft) => draft,
            Err(message) => {
                self.discard_images(&images);
                return Err(ApiError::validation(message, &form));
            }
        };

        let mut conn = match self.conn() {
            Ok(conn) => conn,
            Err(err) => {
                self.discard_images(&images);
                return Err(err);
            }
        };
        let existing = match repository::get_product(&mut conn, id) {
            Ok(product) => product,
            Err(err) => {
                self.discard_images(&images);
                return Err(err.into());
            }
        };

        let changes = assemble_changes(draft, &images);

        match repository::update_product(&mut conn, id, changes) {
            Ok(product) => {
                if !images.is_empty() {
                    for url in &existing.gallery {
                        self.store.remove_url(url);
                    }
                }
                Ok(product)
            }
            Err(err) => {
                self.discard_images(&images);
                Err(err.into())
            }
        }
    }

    /// Removes the record first, then best-effort removes its gallery
    /// files; file-removal failure is logged, never propagated. A second
    /// delete of the same id is NotFound.
    pub fn delete(&self, id: i32) -> Result<(), ApiError> {
        let mut conn = self.conn()?;
        let existing = repository::get_product(&mut conn, id)?;
        repository::delete_product(&mut conn, id)?;
        for url in &existing.gallery {
            self.store.remove_url(url);
        }
        Ok(())
    }

    pub fn discard_images(&self, images: &[StoredImage]) {
        for image in images {
            self.store.discard(image);
        }
    }
}

/// Assembles the insert row. The caller guarantees a non-empty image set;
/// the primary image is always the first gallery entry.
fn assemble_record(draft: ValidDraft, images: &[StoredImage]) -> NewProduct {
    let gallery: Vec<String> = images.iter().map(StoredImage::url).collect();
    NewProduct {
        title: draft.title,
        description: draft.description,
        price: draft.price,
        category: draft.category,
        sizes: draft.sizes,
        src_url: gallery[0].clone(),
        gallery,
        discount_amount: draft.discount_amount,
        discount_percentage: draft.discount_percentage,
        rating: 0.0,
    }
}

/// Assembles the overwrite changeset. An empty image set leaves `src_url`
/// and `gallery` untouched; otherwise both are replaced together so the
/// primary image stays the first gallery entry.
fn assemble_changes(draft: ValidDraft, images: &[StoredImage]) -> UpdateProduct {
    let (src_url, gallery) = if images.is_empty() {
        (None, None)
    } else {
        let urls: Vec<String> = images.iter().map(StoredImage::url).collect();
        (Some(urls[0].clone()), Some(urls))
    };
    UpdateProduct {
        title: Some(draft.title),
        description: Some(draft.description),
        price: Some(draft.price),
        category: Some(draft.category),
        sizes: Some(draft.sizes),
        src_url,
        gallery,
        discount_amount: Some(draft.discount_amount),
        discount_percentage: Some(draft.discount_percentage),
    }
}

fn validate_form(form: &ProductForm) -> Result<ValidDraft, String> {
    if form.title.trim().is_empty()
        || form.description.trim().is_empty()
        || form.category.trim().is_empty()
        || form.price.trim().is_empty()
        || form.sizes.is_empty()
    {
        return Err(
            "Please fill in all required fields and select at least one size".to_string(),
        );
    }

    let price: f64 = form
        .price
        .trim()
        .parse()
        .map_err(|_| "Price must be a number".to_string())?;
    if !price.is_finite() || price < 0.0 {
        return Err("Price must be a non-negative number".to_string());
    }

    // The original form treats an absent or unparsable discount as zero.
    let discount_amount = form.discount_amount.trim().parse().unwrap_or(0.0);
    let discount_percentage = form.discount_percentage.trim().parse().unwrap_or(0.0);
    if discount_amount < 0.0 {
        return Err("Discount amount must not be negative".to_string());
    }
    if !(0.0..=100.0).contains(&discount_percentage) {
        return Err("Discount percentage must be between 0 and 100".to_string());
    }

    Ok(ValidDraft {
        title: form.title.trim().to_string(),
        description: form.description.trim().to_string(),
        category: form.category.trim().to_string(),
        price,
        sizes: form.sizes.clone(),
        discount_amount,
        discount_percentage,
    })
}
