use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub razorpay: RazorpayConfig,
    pub auth: AuthConfig,
    pub checkout: CheckoutConfig,
    pub observability: ObservabilityConfig,
    pub service_name: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Clone, Debug)]
pub struct RazorpayConfig {
    /// Publishable key id, handed to the browser for the payment sheet.
    pub key_id: String,
    pub key_secret: Secret<String>,
    /// Secret used to verify the checkout signature. Razorpay signs with the key secret.
    pub signature_secret: Secret<String>,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HS256 secret shared with the marketplace login routes.
    pub jwt_secret: Secret<String>,
}

#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub currency: String,
    /// Reject checkouts whose product id is not in the `products` collection.
    pub verify_product: bool,
}

#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("PORT")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let db_url = var("MONGODB_URI").context("MONGODB_URI must be set")?;
        let db_name = var("MONGODB_DATABASE").unwrap_or_else(|| "marketplace".to_string());

        let key_id = var("RAZORPAY_KEY_ID").unwrap_or_default();
        let key_secret = var("RAZORPAY_KEY_SECRET").unwrap_or_default();
        let signature_secret =
            var("RAZORPAY_SIGNATURE_SECRET").unwrap_or_else(|| key_secret.clone());
        let api_base_url = var("RAZORPAY_API_BASE_URL")
            .unwrap_or_else(|| "https://api.razorpay.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let currency = var("CHECKOUT_CURRENCY").unwrap_or_else(|| "INR".to_string());
        let verify_product = match var("CHECKOUT_VERIFY_PRODUCT") {
            Some(value) => value
                .parse::<bool>()
                .context("CHECKOUT_VERIFY_PRODUCT must be true or false")?,
            None => true,
        };

        let log_level =
            var("LOG_LEVEL").unwrap_or_else(|| "info,checkout_service=debug".to_string());
        let otlp_endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT");

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            razorpay: RazorpayConfig {
                key_id,
                key_secret: Secret::new(key_secret),
                signature_secret: Secret::new(signature_secret),
                api_base_url,
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(jwt_secret),
            },
            checkout: CheckoutConfig {
                currency,
                verify_product,
            },
            observability: ObservabilityConfig {
                log_level,
                otlp_endpoint,
            },
            service_name: "checkout-service".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("MONGODB_URI", "mongodb://localhost:27017"),
        ("JWT_SECRET", "jwt-secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.db_name, "marketplace");
        assert_eq!(config.checkout.currency, "INR");
        assert!(config.checkout.verify_product);
        assert_eq!(config.razorpay.api_base_url, "https://api.razorpay.com/v1");
        assert!(config.razorpay.key_id.is_empty());
        assert!(config.observability.otlp_endpoint.is_none());
    }

    #[test]
    fn test_signature_secret_falls_back_to_key_secret() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("RAZORPAY_KEY_SECRET", "key_secret"));
        let config = load(&vars).unwrap();
        assert_eq!(config.razorpay.signature_secret.expose_secret(), "key_secret");

        vars.push(("RAZORPAY_SIGNATURE_SECRET", "separate"));
        let config = load(&vars).unwrap();
        assert_eq!(config.razorpay.signature_secret.expose_secret(), "separate");
        assert_eq!(config.razorpay.key_secret.expose_secret(), "key_secret");
    }

    #[test]
    fn test_missing_required_values() {
        let err = load(&[("JWT_SECRET", "x")]).unwrap_err();
        assert!(err.to_string().contains("MONGODB_URI"));

        let err = load(&[("MONGODB_URI", "mongodb://localhost")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "not-a-port"));
        assert!(load(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("CHECKOUT_VERIFY_PRODUCT", "maybe"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed_from_api_base() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("RAZORPAY_API_BASE_URL", "http://localhost:9999/v1/"));
        let config = load(&vars).unwrap();
        assert_eq!(config.razorpay.api_base_url, "http://localhost:9999/v1");
    }
}
