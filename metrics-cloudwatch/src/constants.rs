/// The user agent sent by the HTTP client.
pub const USER_AGENT: &str = concat!("metrics-cloudwatch/", env!("CARGO_PKG_VERSION"));
