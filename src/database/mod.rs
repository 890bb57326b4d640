use mongodb::bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Collection, Database};
use std::error::Error;

use crate::models::{Category, Product, User};
use crate::utils::error::AppError;

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const CATEGORIES: &str = "categories";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.app_name = Some("vfood-api".to_string());

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the handlers rely on. The unique email index is
    /// what actually enforces one account per address.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // Unique index failures are fatal: duplicate emails already exist
        self.users().create_index(email_index).await?;
        log::info!("   ✅ Index created: users(email) unique");

        for (keys, label) in [
            (doc! { "price": 1 }, "products(price)"),
            (doc! { "nameFolded": 1 }, "products(nameFolded)"),
            (doc! { "category": 1 }, "products(category)"),
        ] {
            let index = IndexModel::builder().keys(keys).build();
            match self.products().create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index {} not created: {}", label, e),
            }
        }

        let categories_index = IndexModel::builder()
            .keys(doc! { "createdAt": -1 })
            .build();

        match self.categories().create_index(categories_index).await {
            Ok(_) => log::info!("   ✅ Index created: categories(createdAt)"),
            Err(e) => log::debug!("   ℹ️  Index categories(createdAt) not created: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    pub fn products(&self) -> Collection<Product> {
        self.db.collection(PRODUCTS)
    }

    pub fn categories(&self) -> Collection<Category> {
        self.db.collection(CATEGORIES)
    }

    /// Check if the connection is healthy
    pub async fn health_check(&self) -> bool {
        self.db
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await
            .is_ok()
    }
}

/// Parses a path id, rejecting anything that is not a 24-hex ObjectId.
pub fn parse_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id.trim()).map_err(|_| AppError::InvalidRequest("Invalid id".to_string()))
}

/// True when a write failed on a unique index (E11000).
pub fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = ObjectId::new();
        assert_eq!(parse_id(&id.to_hex()).unwrap(), id);
        assert_eq!(parse_id(&format!(" {} ", id.to_hex())).unwrap(), id);

        let err = parse_id("not-an-id").unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(err.to_string(), "Invalid id");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/vfood_test".to_string());

        let db = MongoDB::new(&url, "vfood_test").await;
        assert!(db.is_ok());
        assert!(db.unwrap().health_check().await);
    }
}
