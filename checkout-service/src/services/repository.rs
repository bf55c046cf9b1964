use crate::models::{fields, PaymentRecord, PaymentStatus};
use anyhow::Result;
use async_trait::async_trait;
use mongodb::options::IndexOptions;
use mongodb::{
    bson::{doc, DateTime},
    Collection, Database, IndexModel,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Result of a status update keyed by order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record matched and now carries the requested status.
    Updated,
    /// The record exists but its current status forbids the transition.
    Unchanged(PaymentStatus),
    /// No record exists for the order id.
    Missing,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, record: PaymentRecord) -> Result<()>;
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentRecord>>;
    async fn mark_completed(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<UpdateOutcome>;
    async fn mark_failed(&self, order_id: &str) -> Result<UpdateOutcome>;
    async fn health_check(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoPaymentStore {
    db: Database,
    payments: Collection<PaymentRecord>,
}

impl MongoPaymentStore {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            payments: db.collection("payments"),
        }
    }

    /// Initialize indexes on the payments collection.
    pub async fn init_indexes(&self) -> Result<()> {
        // One record per gateway order
        let order_index = IndexModel::builder()
            .keys(doc! { fields::ORDER_ID: 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_order_id_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        // Buyer purchase history, newest first
        let buyer_index = IndexModel::builder()
            .keys(doc! { fields::BUYER: 1, fields::CREATED_AT: -1 })
            .options(
                IndexOptions::builder()
                    .name("payment_buyer_created_idx".to_string())
                    .build(),
            )
            .build();

        self.payments
            .create_indexes([order_index, buyer_index], None)
            .await?;

        tracing::info!("Checkout service indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MongoPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        self.payments.insert_one(record, None).await?;
        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentRecord>> {
        let filter = doc! { fields::ORDER_ID: order_id };
        let record = self.payments.find_one(filter, None).await?;
        Ok(record)
    }

    async fn mark_completed(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<UpdateOutcome> {
        let filter = doc! { fields::ORDER_ID: order_id };
        let update = doc! {
            "$set": {
                fields::PAYMENT_ID: payment_id,
                fields::SIGNATURE: signature,
                fields::STATUS: PaymentStatus::Completed.as_str(),
                fields::UPDATED_AT: DateTime::now(),
            }
        };

        let result = self.payments.update_one(filter, update, None).await?;

        if result.matched_count == 0 {
            Ok(UpdateOutcome::Missing)
        } else {
            Ok(UpdateOutcome::Updated)
        }
    }

    async fn mark_failed(&self, order_id: &str) -> Result<UpdateOutcome> {
        // Completed records are terminal
        let filter = doc! {
            fields::ORDER_ID: order_id,
            fields::STATUS: { "$ne": PaymentStatus::Completed.as_str() },
        };
        let update = doc! {
            "$set": {
                fields::STATUS: PaymentStatus::Failed.as_str(),
                fields::UPDATED_AT: DateTime::now(),
            }
        };

        let result = self.payments.update_one(filter, update, None).await?;
        if result.matched_count > 0 {
            return Ok(UpdateOutcome::Updated);
        }

        match self.find_by_order_id(order_id).await? {
            Some(record) => Ok(UpdateOutcome::Unchanged(record.status)),
            None => Ok(UpdateOutcome::Missing),
        }
    }

    async fn health_check(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

/// Process-local store used by tests and database-less local runs.
pub struct InMemoryPaymentStore {
    records: Mutex<HashMap<String, PaymentRecord>>,
}

impl Default for InMemoryPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<F>(&self, order_id: &str, next: PaymentStatus, apply: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&mut PaymentRecord),
    {
        let mut records = self
            .records
            .lock()
            .map_err(|e| anyhow::anyhow!("Payment store mutex poisoned: {}", e))?;

        let Some(record) = records.get_mut(order_id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if !record.status.can_transition_to(next) {
            return Ok(UpdateOutcome::Unchanged(record.status));
        }

        apply(record);
        record.status = next;
        record.updated_at = DateTime::now();
        Ok(UpdateOutcome::Updated)
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| anyhow::anyhow!("Payment store mutex poisoned: {}", e))?;

        if records.contains_key(&record.order_id) {
            return Err(anyhow::anyhow!(
                "Payment record already exists for order {}",
                record.order_id
            ));
        }

        records.insert(record.order_id.clone(), record);
        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| anyhow::anyhow!("Payment store mutex poisoned: {}", e))?;
        Ok(records.get(order_id).cloned())
    }

    async fn mark_completed(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<UpdateOutcome> {
        self.update(order_id, PaymentStatus::Completed, |record| {
            record.payment_id = Some(payment_id.to_string());
            record.signature = Some(signature.to_string());
        })
    }

    async fn mark_failed(&self, order_id: &str) -> Result<UpdateOutcome> {
        self.update(order_id, PaymentStatus::Failed, |_| {})
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
