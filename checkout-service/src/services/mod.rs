pub mod catalog;
pub mod checkout;
pub mod jwt;
pub mod metrics;
pub mod razorpay;
pub mod repository;

pub use catalog::{MongoProductCatalog, ProductCatalog};
pub use checkout::{CheckoutError, CheckoutService, OrderRequest};
pub use jwt::{JwtVerifier, MarketplaceClaims};
pub use metrics::{get_metrics, init_metrics};
pub use razorpay::{PaymentVerification, RazorpayClient, RazorpayOrder, SignatureVerifier};
pub use repository::{InMemoryPaymentStore, MongoPaymentStore, PaymentStore, UpdateOutcome};
