use std::time::Duration;

use ::reqwest::blocking::Client as ReqwestClient;
use ::reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use ::reqwest::Proxy;
use url::Url;

use crate::client::{ClientError, PutMetricsClient};
use crate::constants::USER_AGENT;
use crate::protocol::{self, PutMetricDataInput};

/// Options of an [`HttpClient`].
#[derive(Clone, Debug)]
pub struct HttpClientOptions {
    /// The endpoint requests are posted to.
    pub endpoint: Url,
    /// Extra headers sent with every request, such as signed authorization
    /// headers.
    pub headers: Vec<(String, String)>,
    /// A proxy all requests go through.
    pub proxy: Option<Url>,
    /// Timeout of a single request. `None` uses the reqwest default.
    pub timeout: Option<Duration>,
    /// The `User-Agent` header.
    pub user_agent: String,
}

impl HttpClientOptions {
    /// Creates options posting to `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            headers: Vec::new(),
            proxy: None,
            timeout: None,
            user_agent: USER_AGENT.to_owned(),
        }
    }

    /// Creates options posting to the public CloudWatch endpoint of `region`.
    pub fn for_region(region: &str) -> Result<Self, url::ParseError> {
        Url::parse(&format!("https://monitoring.{region}.amazonaws.com/")).map(Self::new)
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Url) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A [`PutMetricsClient`] posting batches via the [`reqwest`] library.
///
/// Each batch is one blocking JSON request using the CloudWatch
/// `PutMetricData` target. Responses outside of `2xx` are returned as
/// [`ClientError::Status`].
///
/// [`reqwest`]: https://crates.io/crates/reqwest
#[derive(Debug)]
pub struct HttpClient {
    client: ReqwestClient,
    endpoint: Url,
    headers: HeaderMap,
}

impl HttpClient {
    /// Creates a new client.
    pub fn new(options: HttpClientOptions) -> Result<Self, ClientError> {
        let mut builder = ReqwestClient::builder().user_agent(options.user_agent.as_str());
        if let Some(url) = options.proxy.as_ref() {
            builder = builder.proxy(Proxy::all(url.as_str())?);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Self::with_client(options, client)
    }

    /// Creates a new client that uses the specified [`ReqwestClient`].
    ///
    /// Proxy, timeout and user agent of the options are ignored.
    pub fn with_client(options: HttpClientOptions, client: ReqwestClient) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(protocol::CONTENT_TYPE));
        headers.insert(
            "x-amz-target",
            HeaderValue::from_static(protocol::PUT_METRIC_DATA_TARGET),
        );
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(ClientError::other)?;
            let value = HeaderValue::from_str(value).map_err(ClientError::other)?;
            headers.append(name, value);
        }

        Ok(Self {
            client,
            endpoint: options.endpoint,
            headers,
        })
    }
}

impl PutMetricsClient for HttpClient {
    fn put_metric_data(&self, input: &PutMetricDataInput) -> Result<(), ClientError> {
        let body = input.to_json()?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = match response.text() {
            Ok(text) => text,
            Err(err) => {
                log::debug!("failed to read response body: {}", err);
                String::new()
            }
        };
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
