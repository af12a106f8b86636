//! HTTP client for the shop server REST API

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::message::CommittedPayload;
use shared::models::{
    CatalogChanges, CatalogSnapshot, ConfirmOrderRequest, Order, OrderCreate, OrderList,
    OrderStatus, OrderSummary, Product, RejectOrderRequest, UserOrdersRequest,
};

use crate::{ClientConfig, ClientError, ClientResult};

/// HTTP client for making requests to the shop server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request without body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.client.put(self.url(path)).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    ///
    /// Failures carry an `ApiResponse` body whose code is mapped back to an
    /// error; anything else is reported with the status and raw text.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            let err = match serde_json::from_str::<ApiResponse<Value>>(&text) {
                Ok(body) => body.into_error(),
                Err(_) => AppError::with_message(
                    ErrorCode::Unknown,
                    format!("HTTP {}: {}", status.as_u16(), text),
                ),
            };
            return Err(err.into());
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::InvalidResponse(format!("Unexpected response body: {e}")))
    }

    // ========== Orders ==========

    /// Place an order (starts in `Pending`)
    pub async fn create_order(&self, order: &OrderCreate) -> ClientResult<Order> {
        self.post("order/new-order", order).await
    }

    pub async fn user_orders(&self, user_id: &str) -> ClientResult<Vec<Order>> {
        let request = UserOrdersRequest {
            user_id: user_id.to_string(),
        };
        let list: OrderList = self.post("order/get-user-orders", &request).await?;
        Ok(list.orders)
    }

    pub async fn all_orders(&self) -> ClientResult<Vec<Order>> {
        let list: OrderList = self.post_empty("order/get-all-orders").await?;
        Ok(list.orders)
    }

    /// Advance an order to `status`
    pub async fn confirm_order(&self, order_id: &str, status: OrderStatus) -> ClientResult<Order> {
        let request = ConfirmOrderRequest {
            order_id: order_id.to_string(),
            status,
        };
        self.put("order/confirm-order", &request).await
    }

    /// Cancel an order
    pub async fn reject_order(&self, order_id: &str) -> ClientResult<Order> {
        let request = RejectOrderRequest {
            order_id: order_id.to_string(),
        };
        self.put("order/reject-order", &request).await
    }

    pub async fn order_summary(&self) -> ClientResult<OrderSummary> {
        self.get("order/summary").await
    }

    // ========== Catalog ==========

    /// Full catalog for refetch
    pub async fn catalog_snapshot(&self) -> ClientResult<CatalogSnapshot> {
        self.get("product/all").await
    }

    pub async fn product(&self, product_id: &str) -> ClientResult<Product> {
        self.get(&format!("product/{product_id}")).await
    }

    /// Products committed after version `since`
    pub async fn catalog_changes(&self, since: u64) -> ClientResult<CatalogChanges> {
        self.get(&format!("product/changes?since={since}")).await
    }

    /// Add a product from a field map (optionally with an `id`)
    pub async fn create_product(&self, fields: &Map<String, Value>) -> ClientResult<CommittedPayload> {
        self.post("product/new-product", fields).await
    }

    pub async fn health(&self) -> ClientResult<Value> {
        self.get("health").await
    }
}
