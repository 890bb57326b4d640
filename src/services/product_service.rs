use futures::future::try_join_all;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};

use crate::database::parse_id;
use crate::models::{PopulatedProduct, Product, ProductForm, ProductPage, ProductResponse};
use crate::services::image_service::{UploadedFile, PRODUCT_FOLDER};
use crate::services::product_query::{lookup_category_stages, ProductListParams, ProductQuery};
use crate::state::AppState;
use crate::utils::text::fold_diacritics;
use crate::utils::AppError;

/// Runs the listing: total count and page window are fetched concurrently,
/// the count ignoring the window.
pub async fn list_products(
    state: &AppState,
    params: &ProductListParams,
) -> Result<ProductPage, AppError> {
    let query = ProductQuery::from_params(params);
    let collection = state.db.products();

    let count = async {
        Ok::<u64, AppError>(collection.count_documents(query.filter.clone()).await?)
    };
    let page = async {
        let cursor = collection
            .aggregate(query.pipeline())
            .with_type::<PopulatedProduct>()
            .await?;
        Ok::<Vec<PopulatedProduct>, AppError>(cursor.try_collect().await?)
    };

    let (total, products) = futures::try_join!(count, page)?;

    Ok(ProductPage {
        total,
        page: query.page,
        limit: query.limit,
        total_pages: query.total_pages(total),
        products: products.into_iter().map(ProductResponse::from).collect(),
    })
}

async fn find_populated(state: &AppState, id: ObjectId) -> Result<Option<ProductResponse>, AppError> {
    let mut pipeline = vec![doc! { "$match": { "_id": id } }];
    pipeline.extend(lookup_category_stages());

    let mut cursor = state
        .db
        .products()
        .aggregate(pipeline)
        .with_type::<PopulatedProduct>()
        .await?;

    Ok(cursor.try_next().await?.map(ProductResponse::from))
}

pub async fn get_product(state: &AppState, id: &str) -> Result<ProductResponse, AppError> {
    let id = parse_id(id)?;
    find_populated(state, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Parses a category reference and checks that the category exists.
async fn existing_category(state: &AppState, raw: &str) -> Result<ObjectId, AppError> {
    let id = ObjectId::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidRequest("Invalid category id".to_string()))?;

    if state.db.categories().find_one(doc! { "_id": id }).await?.is_none() {
        return Err(AppError::InvalidRequest("Category not found".to_string()));
    }
    Ok(id)
}

/// Uploads every file concurrently, keeping the request order.
async fn upload_images(state: &AppState, files: Vec<UploadedFile>) -> Result<Vec<String>, AppError> {
    let uploads = files.into_iter().map(|file| {
        let images = state.images.clone();
        log::debug!(
            "Uploading {} ({} bytes)",
            file.file_name.as_deref().unwrap_or("unnamed"),
            file.bytes.len()
        );
        async move {
            images
                .upload(file.bytes, &file.content_type, PRODUCT_FOLDER)
                .await
        }
    });
    try_join_all(uploads).await
}

fn validate_numbers(form: &ProductForm) -> Result<(), AppError> {
    if form.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(AppError::InvalidRequest("price must not be negative".to_string()));
    }
    if form.quantity.is_some_and(|q| q < 0) {
        return Err(AppError::InvalidRequest("quantity must not be negative".to_string()));
    }
    if form.star.is_some_and(|s| !(0.0..=5.0).contains(&s)) {
        return Err(AppError::InvalidRequest("star must be between 0 and 5".to_string()));
    }
    Ok(())
}

/// Checks everything a new product needs before any upload happens.
pub fn validate_new_product(form: &ProductForm, file_count: usize) -> Result<(), AppError> {
    if form.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        return Err(AppError::InvalidRequest("Name is required".to_string()));
    }
    if form.quantity.is_none() {
        return Err(AppError::InvalidRequest("Quantity is required".to_string()));
    }
    if form.price.is_none() {
        return Err(AppError::InvalidRequest("Price is required".to_string()));
    }
    if form.category.as_deref().map_or(true, |c| c.trim().is_empty()) {
        return Err(AppError::InvalidRequest("Category is required".to_string()));
    }
    if file_count == 0 && form.image_urls.is_empty() {
        return Err(AppError::InvalidRequest("At least one image is required".to_string()));
    }
    validate_numbers(form)
}

pub async fn create_product(
    state: &AppState,
    form: ProductForm,
    files: Vec<UploadedFile>,
) -> Result<ProductResponse, AppError> {
    validate_new_product(&form, files.len())?;

    let category = existing_category(state, form.category.as_deref().unwrap_or_default()).await?;
    let images = if files.is_empty() {
        form.image_urls
    } else {
        upload_images(state, files).await?
    };

    let name = form.name.unwrap_or_default().trim().to_string();
    let now = BsonDateTime::now();
    let product = Product {
        id: None,
        name_folded: fold_diacritics(&name),
        name,
        quantity: form.quantity.unwrap_or_default(),
        price: form.price.unwrap_or_default(),
        tag: form.tag.unwrap_or_default(),
        category,
        description: form.description.unwrap_or_default(),
        images,
        star: form.star.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let result = state.db.products().insert_one(&product).await?;
    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("Inserted product has no ObjectId".to_string()))?;

    log::info!("✅ Product created: {} ({})", product.name, id);

    find_populated(state, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Builds the `$set` document for a partial update. `category` must already
/// be resolved; `images` replaces the whole list when present.
pub fn product_update_doc(
    form: &ProductForm,
    category: Option<ObjectId>,
    images: Option<Vec<String>>,
) -> Result<Document, AppError> {
    validate_numbers(form)?;

    let mut set = doc! { "updatedAt": BsonDateTime::now() };

    if let Some(name) = form.name.as_deref().map(str::trim) {
        if name.is_empty() {
            return Err(AppError::InvalidRequest("Name is required".to_string()));
        }
        set.insert("name", name);
        set.insert("nameFolded", fold_diacritics(name));
    }
    if let Some(quantity) = form.quantity {
        set.insert("quantity", quantity);
    }
    if let Some(price) = form.price {
        set.insert("price", price);
    }
    if let Some(tag) = &form.tag {
        set.insert("tag", tag.clone());
    }
    if let Some(category) = category {
        set.insert("category", category);
    }
    if let Some(description) = form.description.as_deref() {
        set.insert("description", description);
    }
    if let Some(star) = form.star {
        set.insert("star", star);
    }
    if let Some(images) = images {
        set.insert("images", images);
    }

    Ok(set)
}

pub async fn update_product(
    state: &AppState,
    id: &str,
    form: ProductForm,
    files: Vec<UploadedFile>,
) -> Result<ProductResponse, AppError> {
    let id = parse_id(id)?;
    // Validate before uploading anything
    product_update_doc(&form, None, None)?;

    let category = match form.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => Some(existing_category(state, raw).await?),
        None => None,
    };

    let images = if !files.is_empty() {
        Some(upload_images(state, files).await?)
    } else if !form.image_urls.is_empty() {
        Some(form.image_urls.clone())
    } else {
        None
    };

    let set = product_update_doc(&form, category, images)?;
    let result = state
        .db
        .products()
        .update_one(doc! { "_id": id }, doc! { "$set": set })
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    find_populated(state, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

pub async fn delete_product(state: &AppState, id: &str) -> Result<(), AppError> {
    let id = parse_id(id)?;
    let result = state.db.products().delete_one(doc! { "_id": id }).await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    log::info!("🗑️ Product deleted: {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> ProductForm {
        ProductForm {
            name: Some("Bún Bò Huế".to_string()),
            quantity: Some(10),
            price: Some(45000.0),
            category: Some(ObjectId::new().to_hex()),
            image_urls: vec!["https://img.test/bun.jpg".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_form_is_valid() {
        assert!(validate_new_product(&complete_form(), 0).is_ok());
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let mut form = complete_form();
        form.name = None;
        assert_eq!(validate_new_product(&form, 0).unwrap_err().to_string(), "Name is required");

        let mut form = complete_form();
        form.price = None;
        assert_eq!(validate_new_product(&form, 0).unwrap_err().to_string(), "Price is required");

        let mut form = complete_form();
        form.category = Some(" ".to_string());
        assert_eq!(validate_new_product(&form, 0).unwrap_err().to_string(), "Category is required");
    }

    #[test]
    fn test_at_least_one_image() {
        let mut form = complete_form();
        form.image_urls.clear();
        assert_eq!(
            validate_new_product(&form, 0).unwrap_err().to_string(),
            "At least one image is required"
        );
        // An uploaded file satisfies the requirement
        assert!(validate_new_product(&form, 1).is_ok());
    }

    #[test]
    fn test_out_of_range_numbers() {
        let mut form = complete_form();
        form.price = Some(-1.0);
        assert!(validate_new_product(&form, 0).is_err());

        let mut form = complete_form();
        form.star = Some(7.0);
        assert!(validate_new_product(&form, 0).is_err());
    }

    #[test]
    fn test_update_doc_refreshes_folded_name() {
        let form = ProductForm {
            name: Some("Phở Bò".to_string()),
            ..Default::default()
        };
        let set = product_update_doc(&form, None, None).unwrap();
        assert_eq!(set.get_str("name").unwrap(), "Phở Bò");
        assert_eq!(set.get_str("nameFolded").unwrap(), "pho bo");
        assert!(set.get("price").is_none());
    }

    #[test]
    fn test_update_doc_partial_fields() {
        let category = ObjectId::new();
        let form = ProductForm {
            price: Some(30000.0),
            tag: Some(vec!["hot".to_string()]),
            ..Default::default()
        };
        let set = product_update_doc(
            &form,
            Some(category),
            Some(vec!["https://img.test/new.jpg".to_string()]),
        )
        .unwrap();

        assert_eq!(set.get_f64("price").unwrap(), 30000.0);
        assert_eq!(set.get_object_id("category").unwrap(), category);
        assert_eq!(set.get_array("images").unwrap().len(), 1);
        assert_eq!(set.get_array("tag").unwrap().len(), 1);
        assert!(set.get("name").is_none());
        assert!(set.get("quantity").is_none());
    }
}
