use mongodb::bson::{oid::ObjectId, Bson, DateTime};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Stored field names, shared with the documents already in the
/// marketplace's `payments` collection.
pub mod fields {
    pub const ORDER_ID: &str = "razorpay_order_id";
    pub const PAYMENT_ID: &str = "razorpay_payment_id";
    pub const SIGNATURE: &str = "razorpay_signature";
    pub const BUYER: &str = "buyerEmail";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Ledger entry for one checkout attempt.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentRecord {
    #[serde(rename = "razorpay_order_id")]
    pub order_id: String,
    #[serde(rename = "razorpay_payment_id", default)]
    pub payment_id: Option<String>,
    #[serde(rename = "razorpay_signature", default)]
    pub signature: Option<String>,
    /// Catalog reference. Stored as an ObjectId when it is one.
    #[serde(
        rename = "productId",
        serialize_with = "serialize_product_ref",
        deserialize_with = "deserialize_product_ref"
    )]
    pub product_id: String,
    #[serde(rename = "buyerEmail")]
    pub buyer: String,
    /// Major currency units (rupees).
    pub amount: f64,
    /// Smallest currency unit (paise), as sent to the gateway.
    #[serde(rename = "amountMinor", default)]
    pub amount_minor: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: PaymentStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    #[serde(rename = "updatedAt", default = "DateTime::now")]
    pub updated_at: DateTime,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn serialize_product_ref<S>(product_id: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ObjectId::parse_str(product_id) {
        Ok(oid) => oid.serialize(serializer),
        Err(_) => serializer.serialize_str(product_id),
    }
}

fn deserialize_product_ref<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(s) => Ok(s),
        other => Err(de::Error::custom(format!(
            "productId must be an ObjectId or string, got {:?}",
            other.element_type()
        ))),
    }
}

impl PaymentRecord {
    /// A fresh `pending` record for a gateway order.
    pub fn pending(
        order_id: impl Into<String>,
        product_id: impl Into<String>,
        buyer: impl Into<String>,
        amount_minor: i64,
        currency: impl Into<String>,
        receipt: Option<String>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            order_id: order_id.into(),
            payment_id: None,
            signature: None,
            product_id: product_id.into(),
            buyer: buyer.into(),
            amount: amount_minor as f64 / 100.0,
            amount_minor,
            currency: currency.into(),
            receipt,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Whether a record in this status may move to `next`.
    ///
    /// Nothing returns to `pending`, and `completed` is terminal.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match (self, next) {
            (_, PaymentStatus::Pending) => false,
            (PaymentStatus::Completed, PaymentStatus::Failed) => false,
            _ => true,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
