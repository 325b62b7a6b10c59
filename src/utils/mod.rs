pub mod logging;

pub use logging::init_logging;

/// Milliseconds since the Unix epoch, the timestamp unit on the wire.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
