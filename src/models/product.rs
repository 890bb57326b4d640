use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::models::category::{Category, CategoryResponse};
use crate::utils::error::AppError;

/// Product (collection `products`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Lowercase, diacritic-free copy of `name` used by search
    pub name_folded: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub tag: Vec<String>,
    pub category: ObjectId,
    #[serde(default)]
    pub description: String,
    pub images: Vec<String>,
    #[serde(default)]
    pub star: f64,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// Product as returned by the `$lookup` pipeline: the category reference is
/// replaced by the category document, or absent if it no longer exists.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedProduct {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub tag: Vec<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub description: String,
    pub images: Vec<String>,
    #[serde(default)]
    pub star: f64,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// Fields accepted on create/update, collected from multipart text parts.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
    pub tag: Option<Vec<String>>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub star: Option<f64>,
    pub image_urls: Vec<String>,
}

impl ProductForm {
    /// Applies one text part. Unknown fields are ignored.
    pub fn apply_field(&mut self, field: &str, value: String) -> Result<(), AppError> {
        let value = value.trim().to_string();
        match field {
            "name" => self.name = Some(value),
            "quantity" => self.quantity = Some(parse_number::<i64>(field, &value)?),
            "price" => self.price = Some(parse_number::<f64>(field, &value)?),
            "star" => self.star = Some(parse_number::<f64>(field, &value)?),
            "category" => self.category = Some(value),
            "description" => self.description = Some(value),
            // Repeated `tag` parts accumulate; a single part may be comma-separated
            "tag" | "tag[]" => {
                let tags = self.tag.get_or_insert_with(Vec::new);
                tags.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from),
                );
            }
            "images" | "images[]" | "image" => {
                if !value.is_empty() {
                    self.image_urls.push(value);
                }
            }
            _ => log::debug!("Ignoring unknown product field '{}'", field),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, AppError> {
    value
        .parse::<T>()
        .map_err(|_| AppError::InvalidRequest(format!("{} must be a number", field)))
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub tag: Vec<String>,
    pub category: Option<CategoryResponse>,
    pub description: String,
    pub images: Vec<String>,
    pub star: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PopulatedProduct> for ProductResponse {
    fn from(p: PopulatedProduct) -> Self {
        ProductResponse {
            id: p.id.to_hex(),
            name: p.name,
            quantity: p.quantity,
            price: p.price,
            tag: p.tag,
            category: p.category.map(CategoryResponse::from),
            description: p.description,
            images: p.images,
            star: p.star,
            created_at: p.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: p.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

/// One page of the product listing.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub products: Vec<ProductResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_parses_numbers() {
        let mut form = ProductForm::default();
        form.apply_field("price", " 35000 ".to_string()).unwrap();
        form.apply_field("quantity", "12".to_string()).unwrap();
        assert_eq!(form.price, Some(35000.0));
        assert_eq!(form.quantity, Some(12));
    }

    #[test]
    fn test_form_rejects_non_numeric_price() {
        let mut form = ProductForm::default();
        let err = form.apply_field("price", "cheap".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "price must be a number");
    }

    #[test]
    fn test_form_collects_tags_and_images() {
        let mut form = ProductForm::default();
        form.apply_field("tag", "spicy, noodle".to_string()).unwrap();
        form.apply_field("tag", "hue".to_string()).unwrap();
        form.apply_field("images", "https://img.test/1.jpg".to_string()).unwrap();
        form.apply_field("images", "".to_string()).unwrap();
        assert_eq!(
            form.tag,
            Some(vec!["spicy".to_string(), "noodle".to_string(), "hue".to_string()])
        );
        assert_eq!(form.image_urls, vec!["https://img.test/1.jpg".to_string()]);
    }

    #[test]
    fn test_response_without_category() {
        let now = BsonDateTime::now();
        let populated = PopulatedProduct {
            id: ObjectId::new(),
            name: "Bún Bò".to_string(),
            quantity: 3,
            price: 45000.0,
            tag: vec![],
            category: None,
            description: String::new(),
            images: vec!["https://img.test/bun.jpg".to_string()],
            star: 4.5,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(ProductResponse::from(populated)).unwrap();
        assert!(json["category"].is_null());
        assert_eq!(json["name"], "Bún Bò");
        assert!(json.get("nameFolded").is_none());
    }
}
