use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Product category (collection `categories`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub description: String,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// Fields accepted on create/update, parsed from a multipart form.
/// `image_url` is only used when no file was uploaded.
#[derive(Debug, Default)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        CategoryResponse {
            id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: c.name,
            image: c.image,
            description: c.description,
            created_at: c.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: c.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}
