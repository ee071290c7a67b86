mod basic;
mod client;
mod tenant;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use tenant::FiwareTenant;

use reqwest::{Method, Request, Url};

/// Builds a GET request for `url` with the given query pairs.
pub fn get_request(url: &Url, params: &[(&str, String)]) -> Request {
    let mut url = url.clone();
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Request::new(Method::GET, url)
}
