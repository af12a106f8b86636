//! Client configuration

use crate::message::MessageClientConfig;

/// Client configuration for connecting to the shop server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Event channel TCP address (e.g., "127.0.0.1:8081")
    pub message_tcp_addr: Option<String>,

    /// Name announced in the handshake
    pub client_name: String,

    /// Session id to ask for; the server generates one when unset
    pub client_id: Option<String>,

    /// Event channel settings
    pub message: MessageClientConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: 30,
            message_tcp_addr: None,
            client_name: "shop-client".to_string(),
            client_id: None,
            message: MessageClientConfig::default(),
        }
    }

    /// Set the event channel TCP address
    pub fn with_message_tcp_addr(mut self, addr: impl Into<String>) -> Self {
        self.message_tcp_addr = Some(addr.into());
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_message_config(mut self, message: MessageClientConfig) -> Self {
        self.message = message;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}
