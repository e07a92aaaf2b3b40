use crate::core::{InventoryService, Product, ProductId, Stock};
use crate::utils::error::{CartError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 透過 HTTP 查詢庫存: `GET {endpoint}/products/{id}` 與
/// `GET {endpoint}/stock/{id}`
#[derive(Debug, Clone)]
pub struct HttpInventory {
    client: Client,
    endpoint: String,
}

impl HttpInventory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), path);

        tracing::debug!("Making API request to: {}", url);
        let response = self.client.get(&url).send().await?;
        tracing::debug!("API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(CartError::ServiceError {
                message: format!("GET {} returned {}", url, response.status()),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl InventoryService for HttpInventory {
    async fn product(&self, id: ProductId) -> Result<Product> {
        let product: Product = self.get_json(&format!("products/{}", id)).await?;
        ensure_same_id("product", id, product.id)?;
        Ok(product)
    }

    async fn stock(&self, id: ProductId) -> Result<Stock> {
        let stock: Stock = self.get_json(&format!("stock/{}", id)).await?;
        ensure_same_id("stock", id, stock.id)?;
        Ok(stock)
    }
}

fn ensure_same_id(record: &str, requested: ProductId, returned: ProductId) -> Result<()> {
    if requested != returned {
        return Err(CartError::ServiceError {
            message: format!(
                "{} lookup for {} returned a record for {}",
                record, requested, returned
            ),
        });
    }
    Ok(())
}
