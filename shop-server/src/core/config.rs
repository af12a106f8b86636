/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | MESSAGE_TCP_PORT | 8081 | TCP 消息总线端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 滚动日志目录 (不设置则输出到 stdout) |
/// | CHANNEL_CAPACITY | 1024 | 广播通道容量 |
/// | DEDUP_CAPACITY | 4096 | 每个商品记住的已提交 requestId 条数 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | HANDSHAKE_TIMEOUT_MS | 10000 | TCP 会话发送握手的时限(毫秒) |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=8080 LOG_LEVEL=debug cargo run -p shop-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// TCP 消息总线端口
    pub message_tcp_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志级别
    pub log_level: String,
    /// 日志目录
    pub log_dir: Option<String>,
    /// 广播通道容量，落后超过此数量的连接会收到 Resync
    pub channel_capacity: usize,
    /// 每个商品的去重窗口 (0 表示关闭去重)
    pub dedup_capacity: usize,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 连接建立后等待握手的时限 (毫秒)
    pub handshake_timeout_ms: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            http_port: env_or("HTTP_PORT", 3000),
            message_tcp_port: env_or("MESSAGE_TCP_PORT", 8081),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            channel_capacity: env_or("CHANNEL_CAPACITY", 1024usize).max(1),
            dedup_capacity: env_or("DEDUP_CAPACITY", 4096),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            handshake_timeout_ms: env_or("HANDSHAKE_TIMEOUT_MS", 10000),
        }
    }

    /// 使用自定义端口覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(http_port: u16, message_tcp_port: u16) -> Self {
        let mut config = Self::from_env();
        config.http_port = http_port;
        config.message_tcp_port = message_tcp_port;
        config
    }

    /// TCP 消息总线监听地址
    pub fn tcp_listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.message_tcp_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_keep_other_defaults() {
        let config = Config::with_overrides(0, 0);
        assert_eq!(config.http_port, 0);
        assert_eq!(config.message_tcp_port, 0);
        assert!(config.channel_capacity >= 1);
        assert_eq!(config.tcp_listen_addr(), "0.0.0.0:0");
    }
}
