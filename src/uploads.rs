//! Upload store for product images. Files are written before the product
//! record so a record never references a missing file; callers remove the
//! written files if the record write fails.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use actix_web::web::BytesMut;
use chrono::Utc;
use futures::StreamExt;
use rand::Rng;

use crate::error::ApiError;
use crate::models::ProductForm;

pub const URL_PREFIX: &str = "/uploads";

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// A file that has been written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
}

impl StoredImage {
    pub fn url(&self) -> String {
        format!("{}/{}", URL_PREFIX, self.file_name)
    }
}

pub struct FileStore {
    root: PathBuf,
    max_file_bytes: u64,
    max_gallery_files: usize,
}

impl FileStore {
    pub fn open(
        root: impl Into<PathBuf>,
        max_file_bytes: u64,
        max_gallery_files: usize,
    ) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FileStore {
            root,
            max_file_bytes,
            max_gallery_files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_gallery_files(&self) -> usize {
        self.max_gallery_files
    }

    /// Streams one multipart file field to disk, enforcing the type
    /// allowlist and the per-file size ceiling. A partial write is removed
    /// before the error is returned.
    pub async fn save_field(&self, field: &mut Field) -> Result<StoredImage, ApiError> {
        let file_name = field
            .content_disposition()
            .get_filename()
            .map(str::to_string)
            .unwrap_or_default();
        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        let ext = allowed_image_ext(&file_name, content_type.as_deref()).ok_or_else(|| {
            ApiError::invalid("Only image files are allowed (jpg, jpeg, png, webp)")
        })?;

        let name = unique_name(&ext);
        let path = self.root.join(&name);
        let mut file = fs::File::create(&path)?;

        let mut written: u64 = 0;
        while let Some(chunk) = field.next().await {
            let data = match chunk {
                Ok(data) => data,
                Err(err) => {
                    self.discard_path(&path);
                    return Err(ApiError::invalid(format!("Error uploading files: {}", err)));
                }
            };
            written += data.len() as u64;
            if written > self.max_file_bytes {
                self.discard_path(&path);
                return Err(ApiError::invalid("Image exceeds the maximum upload size"));
            }
            if let Err(err) = file.write_all(&data) {
                self.discard_path(&path);
                return Err(err.into());
            }
        }

        Ok(StoredImage { file_name: name })
    }

    pub fn remove(&self, file_name: &str) -> std::io::Result<()> {
        fs::remove_file(self.root.join(file_name))
    }

    /// Best-effort removal by public reference; failures are logged, never
    /// propagated.
    pub fn remove_url(&self, url: &str) {
        let Some(file_name) = url.strip_prefix(&format!("{}/", URL_PREFIX)) else {
            return;
        };
        if let Err(err) = self.remove(file_name) {
            log::warn!("failed to remove image file {}: {}", file_name, err);
        }
    }

    pub fn discard(&self, image: &StoredImage) {
        if let Err(err) = self.remove(&image.file_name) {
            log::warn!("failed to remove image file {}: {}", image.file_name, err);
        }
    }

    fn discard_path(&self, path: &Path) {
        if let Err(err) = fs::remove_file(path) {
            log::warn!("failed to remove partial upload {}: {}", path.display(), err);
        }
    }
}

/// Returns the lowercased extension when both the file name and the
/// declared content type pass the image allowlist.
fn allowed_image_ext(file_name: &str, content_type: Option<&str>) -> Option<String> {
    let ext = file_name.rsplit_once('.')?.1.to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    let mime = content_type?;
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return None;
    }
    Some(ext)
}

/// Timestamp plus random suffix, unique per file.
fn unique_name(ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("product-{}-{}.{}", Utc::now().timestamp_millis(), suffix, ext)
}

/// Collects a multipart product submission: text fields into a
/// [`ProductForm`], file fields (`gallery` or `image`) into the store. If
/// any field fails partway, every file already written for this request is
/// removed before the error propagates; partial galleries are never left
/// behind.
pub async fn collect_product_form(
    store: &FileStore,
    mut payload: Multipart,
) -> Result<(ProductForm, Vec<StoredImage>), ApiError> {
    let mut form = ProductForm::default();
    let mut images: Vec<StoredImage> = Vec::new();

    while let Some(item) = payload.next().await {
        let step = handle_field(store, item, &mut form, &mut images).await;
        if let Err(err) = step {
            for image in &images {
                store.discard(image);
            }
            return Err(err);
        }
    }

    Ok((form, images))
}

async fn handle_field(
    store: &FileStore,
    item: Result<Field, actix_multipart::MultipartError>,
    form: &mut ProductForm,
    images: &mut Vec<StoredImage>,
) -> Result<(), ApiError> {
    let mut field =
        item.map_err(|err| ApiError::invalid(format!("Error uploading files: {}", err)))?;
    let name = field
        .content_disposition()
        .get_name()
        .unwrap_or_default()
        .to_string();

    match name.as_str() {
        "title" => form.title = read_text(&mut field).await?,
        "description" => form.description = read_text(&mut field).await?,
        "price" => form.price = read_text(&mut field).await?,
        "category" => form.category = read_text(&mut field).await?,
        "discountAmount" => form.discount_amount = read_text(&mut field).await?,
        "discountPercentage" => form.discount_percentage = read_text(&mut field).await?,
        "sizes" => {
            let size = read_text(&mut field).await?;
            if !size.is_empty() {
                form.sizes.push(size);
            }
        }
        "gallery" | "image" => {
            if images.len() >= store.max_gallery_files() {
                return Err(ApiError::invalid(format!(
                    "A gallery may hold at most {} images",
                    store.max_gallery_files()
                )));
            }
            images.push(store.save_field(&mut field).await?);
        }
        _ => drain(&mut field).await?,
    }

    Ok(())
}

async fn read_text(field: &mut Field) -> Result<String, ApiError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let data =
            chunk.map_err(|err| ApiError::invalid(format!("Error uploading files: {}", err)))?;
        buf.extend_from_slice(&data);
    }
    String::from_utf8(buf.to_vec())
        .map(|text| text.trim().to_string())
        .map_err(|_| ApiError::invalid("Form fields must be valid UTF-8"))
}

async fn drain(field: &mut Field) -> Result<(), ApiError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|err| ApiError::invalid(format!("Error uploading files: {}", err)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_requires_extension_and_content_type() {
        assert_eq!(
            allowed_image_ext("photo.JPG", Some("image/jpeg")).as_deref(),
            Some("jpg")
        );
        assert_eq!(
            allowed_image_ext("photo.webp", Some("image/webp")).as_deref(),
            Some("webp")
        );
        assert_eq!(allowed_image_ext("photo.gif", Some("image/gif")), None);
        assert_eq!(allowed_image_ext("photo.png", Some("text/plain")), None);
        assert_eq!(allowed_image_ext("photo.png", None), None);
        assert_eq!(allowed_image_ext("no-extension", Some("image/png")), None);
    }

    #[test]
    fn unique_names_do_not_collide() {
        let a = unique_name("jpg");
        let b = unique_name("jpg");
        assert!(a.starts_with("product-"));
        assert!(a.ends_with(".jpg"));
        assert_ne!(a, b);
    }

    #[test]
    fn stored_image_url_is_rooted_at_uploads() {
        let image = StoredImage {
            file_name: "product-1-1.png".into(),
        };
        assert_eq!(image.url(), "/uploads/product-1-1.png");
    }

    #[test]
    fn remove_url_deletes_only_prefixed_references() {
        let dir = std::env::temp_dir().join(format!(
            "storefront-uploads-{}-{}",
            std::process::id(),
            rand::thread_rng().gen_range(0..u32::MAX)
        ));
        let store = FileStore::open(&dir, 1024, 5).unwrap();

        let name = unique_name("jpg");
        fs::write(store.root().join(&name), b"fake").unwrap();

        // A reference outside the uploads prefix is ignored.
        store.remove_url("/elsewhere/file.jpg");
        assert!(store.root().join(&name).exists());

        store.remove_url(&format!("{}/{}", URL_PREFIX, name));
        assert!(!store.root().join(&name).exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
