use crate::error::{AggregationError, Result};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

const FIWARE_SERVICE: HeaderName = HeaderName::from_static("fiware-service");
const FIWARE_SERVICE_PATH: HeaderName = HeaderName::from_static("fiware-servicepath");

/// An [`HttpClient`] wrapper that scopes every request to one FIWARE tenant
/// by setting `Fiware-Service` and `Fiware-ServicePath`.
///
/// An empty service is left off entirely so Orion falls back to its default
/// tenant.
pub struct FiwareTenant<C> {
    inner: C,
    service: Option<HeaderValue>,
    service_path: HeaderValue,
}

impl<C> FiwareTenant<C> {
    pub fn new(inner: C, service: Option<&str>, service_path: &str) -> Result<Self> {
        let header = |name: &str, value: &str| {
            HeaderValue::from_str(value).map_err(|_| {
                AggregationError::invalid(format!("{name} '{value}' is not a valid header value"))
            })
        };

        Ok(Self {
            inner,
            service: service
                .filter(|s| !s.is_empty())
                .map(|s| header("Fiware-Service", s))
                .transpose()?,
            service_path: header("Fiware-ServicePath", service_path)?,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for FiwareTenant<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let headers = req.headers_mut();
        if let Some(service) = &self.service {
            headers.insert(FIWARE_SERVICE, service.clone());
        }
        headers.insert(FIWARE_SERVICE_PATH, self.service_path.clone());
        self.inner.execute(req).await
    }
}
