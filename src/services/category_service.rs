use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;

use crate::database::parse_id;
use crate::models::{Category, CategoryForm, CategoryResponse};
use crate::services::image_service::{UploadedFile, CATEGORY_FOLDER};
use crate::state::AppState;
use crate::utils::AppError;

/// Resolves the image for a create/update: an uploaded file wins over a URL.
async fn resolve_image(
    state: &AppState,
    file: Option<UploadedFile>,
    image_url: Option<&str>,
) -> Result<Option<String>, AppError> {
    if let Some(file) = file {
        let url = state
            .images
            .upload(file.bytes, &file.content_type, CATEGORY_FOLDER)
            .await?;
        return Ok(Some(url));
    }
    Ok(image_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from))
}

pub async fn create_category(
    state: &AppState,
    form: CategoryForm,
    file: Option<UploadedFile>,
) -> Result<CategoryResponse, AppError> {
    let name = form
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Name is required".to_string()))?
        .to_string();

    if file.is_none() && form.image_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
        return Err(AppError::InvalidRequest("Image is required".to_string()));
    }

    let image = resolve_image(state, file, form.image_url.as_deref())
        .await?
        .ok_or_else(|| AppError::InvalidRequest("Image is required".to_string()))?;

    let now = BsonDateTime::now();
    let mut category = Category {
        id: None,
        name,
        image,
        description: form.description.map(|d| d.trim().to_string()).unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let result = state.db.categories().insert_one(&category).await?;
    category.id = result.inserted_id.as_object_id();

    log::info!("✅ Category created: {}", category.name);
    Ok(CategoryResponse::from(category))
}

pub async fn list_categories(state: &AppState) -> Result<Vec<CategoryResponse>, AppError> {
    let cursor = state
        .db
        .categories()
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?;

    let categories: Vec<Category> = cursor.try_collect().await?;
    Ok(categories.into_iter().map(CategoryResponse::from).collect())
}

pub async fn get_category(state: &AppState, id: &str) -> Result<CategoryResponse, AppError> {
    let id = parse_id(id)?;
    state
        .db
        .categories()
        .find_one(doc! { "_id": id })
        .await?
        .map(CategoryResponse::from)
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

/// Builds the `$set` document for a partial update. Only fields present in
/// the form are touched.
pub fn category_update_doc(form: &CategoryForm, image: Option<String>) -> Result<Document, AppError> {
    let mut set = doc! { "updatedAt": BsonDateTime::now() };

    if let Some(name) = form.name.as_deref().map(str::trim) {
        if name.is_empty() {
            return Err(AppError::InvalidRequest("Name is required".to_string()));
        }
        set.insert("name", name);
    }
    if let Some(description) = form.description.as_deref() {
        set.insert("description", description.trim());
    }
    if let Some(image) = image {
        set.insert("image", image);
    }

    Ok(set)
}

pub async fn update_category(
    state: &AppState,
    id: &str,
    form: CategoryForm,
    file: Option<UploadedFile>,
) -> Result<CategoryResponse, AppError> {
    let id = parse_id(id)?;
    // Validate before uploading anything
    category_update_doc(&form, None)?;

    let image = resolve_image(state, file, form.image_url.as_deref()).await?;
    let set = category_update_doc(&form, image)?;

    state
        .db
        .categories()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .map(CategoryResponse::from)
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

pub async fn delete_category(state: &AppState, id: &str) -> Result<(), AppError> {
    let id = parse_id(id)?;
    let result = state.db.categories().delete_one(doc! { "_id": id }).await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    log::info!("🗑️ Category deleted: {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_doc_only_sets_present_fields() {
        let form = CategoryForm {
            name: Some(" Drinks ".to_string()),
            ..Default::default()
        };
        let set = category_update_doc(&form, None).unwrap();
        assert_eq!(set.get_str("name").unwrap(), "Drinks");
        assert!(set.get("description").is_none());
        assert!(set.get("image").is_none());
        assert!(set.get_datetime("updatedAt").is_ok());
    }

    #[test]
    fn test_update_doc_with_new_image() {
        let set = category_update_doc(
            &CategoryForm::default(),
            Some("https://img.test/c.jpg".to_string()),
        )
        .unwrap();
        assert_eq!(set.get_str("image").unwrap(), "https://img.test/c.jpg");
        assert!(set.get("name").is_none());
    }

    #[test]
    fn test_update_doc_rejects_blank_name() {
        let form = CategoryForm {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        let err = category_update_doc(&form, None).unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
    }
}
