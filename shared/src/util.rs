/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a unique request id for a catalog edit submission.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
