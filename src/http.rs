//! HTTP client construction for the backend service.
//!
//! Shared between the plain JSON wrappers and the streaming call sites.

use reqwest::{Client, RequestBuilder};

use crate::options::ServiceOptions;

/// Build a configured HTTP client from service options.
///
/// Applies the common configuration: timeout and proxy.
pub fn build_http_client(options: &ServiceOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in the service options.
pub fn add_extra_headers(mut request: RequestBuilder, options: &ServiceOptions) -> RequestBuilder {
    if let Some(headers) = &options.extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}
