//! Product lookups against the marketplace catalog.

use anyhow::Result;
use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Collection, Database,
};

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product_exists(&self, product_id: &str) -> Result<bool>;
}

/// Reads the `products` collection written by the listing routes.
#[derive(Clone)]
pub struct MongoProductCatalog {
    products: Collection<Document>,
}

impl MongoProductCatalog {
    pub fn new(db: &Database) -> Self {
        Self {
            products: db.collection("products"),
        }
    }
}

#[async_trait]
impl ProductCatalog for MongoProductCatalog {
    async fn product_exists(&self, product_id: &str) -> Result<bool> {
        // Product ids are ObjectIds; anything else cannot match.
        let Ok(id) = ObjectId::parse_str(product_id) else {
            tracing::debug!(product_id = %product_id, "Product id is not an ObjectId");
            return Ok(false);
        };

        let found = self
            .products
            .find_one(doc! { "_id": id }, None)
            .await?
            .is_some();

        Ok(found)
    }
}
