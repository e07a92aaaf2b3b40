use crate::domain::model::ProductId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Product {product_id} is not in the cart")]
    NotInCart { product_id: ProductId },

    #[error("Product {product_id} is out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: i64,
        available: u32,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Inventory service error: {message}")]
    ServiceError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, CartError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    OutOfStock,
    Service,
    Storage,
    Configuration,
}

impl CartError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CartError::NotInCart { .. } => ErrorCategory::NotFound,
            CartError::OutOfStock { .. } => ErrorCategory::OutOfStock,
            CartError::ApiError(_) | CartError::ServiceError { .. } => ErrorCategory::Service,
            CartError::StorageError { .. }
            | CartError::IoError(_)
            | CartError::SerializationError(_)
            | CartError::ValidationError { .. } => ErrorCategory::Storage,
            CartError::ConfigError { .. }
            | CartError::ConfigValidationError { .. }
            | CartError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CartError::NotInCart { product_id } => {
                format!("Product {} is not in your cart", product_id)
            }
            CartError::OutOfStock {
                product_id,
                available,
                ..
            } => format!(
                "Product {} only has {} unit(s) in stock",
                product_id, available
            ),
            CartError::ApiError(_) | CartError::ServiceError { .. } => {
                "Could not reach the inventory service".to_string()
            }
            CartError::StorageError { .. }
            | CartError::IoError(_)
            | CartError::SerializationError(_)
            | CartError::ValidationError { .. } => "Could not read or save the cart".to_string(),
            _ => format!("Invalid configuration: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::NotFound => "Run `cart-store show` to list the products in the cart",
            ErrorCategory::OutOfStock => "Request a smaller quantity",
            ErrorCategory::Service => "Check that the inventory endpoint is reachable and retry",
            ErrorCategory::Storage => {
                "Check the storage directory permissions or remove the corrupted cart file"
            }
            ErrorCategory::Configuration => "Fix the configuration file or command-line flags",
        }
    }
}
