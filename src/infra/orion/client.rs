use async_trait::async_trait;
use reqwest::{Method, Request, StatusCode, Url, header};
use tracing::debug;

use crate::error::{AggregationError, Result};
use crate::fetch::{HttpClient, get_request};
use crate::infra::orion::entity::{ENTITY_TYPE, OrionEntity, decode_entities};
use crate::model::RatingRecord;
use crate::rating::{NewRating, Submitter};
use crate::services::{RatingQuery, RatingSource};

/// [`RatingSource`] backed by an Orion context broker's NGSIv2 API.
pub struct OrionClient<C> {
    http: C,
    entities_url: Url,
}

impl<C: HttpClient> OrionClient<C> {
    pub fn new(http: C, base_url: &str) -> Result<Self> {
        let mut entities_url = Url::parse(base_url)
            .map_err(|e| AggregationError::invalid(format!("Orion URI '{base_url}': {e}")))?;
        // Appended so a gateway prefix such as `/orion` survives.
        entities_url
            .path_segments_mut()
            .map_err(|_| AggregationError::invalid(format!("Orion URI '{base_url}' cannot be a base")))?
            .pop_if_empty()
            .extend(["v2", "entities"]);
        Ok(Self { http, entities_url })
    }

    fn query_params(query: &RatingQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("type", ENTITY_TYPE.to_string()),
            ("q", query.q()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
            ("orderBy", "!timestamp".to_string()),
        ];
        if let Some(geo) = &query.geo {
            params.push(("georel", geo.georel()));
            params.push(("geometry", geo.geometry().to_string()));
            params.push(("coords", geo.coords()));
        }
        params
    }
}

#[async_trait]
impl<C: HttpClient> RatingSource for OrionClient<C> {
    #[tracing::instrument(skip(self), fields(q = %query.q(), limit = query.limit, offset = query.offset))]
    async fn query(&self, query: &RatingQuery) -> Result<Vec<RatingRecord>> {
        let req = get_request(&self.entities_url, &Self::query_params(query));
        let body = self.http.send_expecting(req, &[StatusCode::OK]).await?;

        let json: Vec<serde_json::Value> = serde_json::from_str(&body).map_err(|e| {
            AggregationError::upstream(format!("Failed to parse Orion response: {e}"))
        })?;
        let fetched = json.len();
        let records = decode_entities(json);

        debug!(fetched, decoded = records.len(), "Orion query complete");
        Ok(records)
    }

    #[tracing::instrument(skip(self, rating, submitter))]
    async fn create(&self, id: &str, rating: &NewRating, submitter: &Submitter) -> Result<()> {
        let entity = OrionEntity::from_rating(id, rating, submitter);
        let body = serde_json::to_vec(&entity)
            .map_err(|e| AggregationError::invalid(format!("Failed to encode entity: {e}")))?;

        let mut req = Request::new(Method::POST, self.entities_url.clone());
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        *req.body_mut() = Some(body.into());

        self.http.send_expecting(req, &[StatusCode::CREATED]).await?;
        debug!("Entity created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_bounds;
    use crate::services::GeoFilter;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Replies with a canned status and body, remembering each request.
    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<(Method, Url, Option<Vec<u8>>)>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl HttpClient for Canned {
        async fn execute(&self, req: Request) -> reqwest::Result<reqwest::Response> {
            let body = req.body().and_then(|b| b.as_bytes()).map(|b| b.to_vec());
            self.seen
                .lock()
                .unwrap()
                .push((req.method().clone(), req.url().clone(), body));
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(resp.into())
        }
    }

    fn query() -> RatingQuery {
        RatingQuery {
            start: Utc.with_ymd_and_hms(2024, 3, 14, 15, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 20, 14, 59, 59).unwrap(),
            limit: 100,
            offset: 0,
            nickname: None,
            geo: None,
        }
    }

    const ENTITIES: &str = r#"[
        {
            "id": "a",
            "type": "happiness",
            "timestamp": { "type": "DateTime", "value": "2024-03-16T05:02:38.150Z" },
            "location": { "type": "geo:json", "value": { "type": "Point", "coordinates": [139.72, 35.62] } },
            "happiness1": { "type": "Number", "value": 1 },
            "happiness2": { "type": "Number", "value": 0 },
            "happiness3": { "type": "Number", "value": 0 },
            "happiness4": { "type": "Number", "value": 0 },
            "happiness5": { "type": "Number", "value": 0 },
            "happiness6": { "type": "Number", "value": 0 }
        },
        { "id": "broken", "type": "happiness" }
    ]"#;

    #[tokio::test]
    async fn test_query_builds_orion_params() {
        let client = OrionClient::new(Canned::new(200, "[]"), "http://orion:1026").unwrap();
        let geo = GeoFilter::CoveredBy(parse_bounds("35.0,139.0,34.0,138.0").unwrap());
        client.query(&query().with_geo(geo)).await.unwrap();

        let seen = client.http.seen.lock().unwrap();
        let (method, url, _) = &seen[0];
        assert_eq!(*method, Method::GET);
        assert_eq!(url.path(), "/v2/entities");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(
            get("q"),
            Some("timestamp>=2024-03-14T15:00:00.000Z;timestamp<=2024-03-20T14:59:59.000Z")
        );
        assert_eq!(get("orderBy"), Some("!timestamp"));
        assert_eq!(get("limit"), Some("100"));
        assert_eq!(get("georel"), Some("coveredBy"));
        assert_eq!(get("geometry"), Some("polygon"));
        assert_eq!(get("coords"), Some("35,138;35,139;34,139;34,138;35,138"));
    }

    #[tokio::test]
    async fn test_query_skips_undecodable_entities() {
        let client = OrionClient::new(Canned::new(200, ENTITIES), "http://orion:1026").unwrap();
        let records = client.query(&query()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a");
    }

    #[tokio::test]
    async fn test_query_server_error_is_retryable() {
        let client = OrionClient::new(Canned::new(503, "busy"), "http://orion:1026").unwrap();
        let err = client.query(&query()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_query_rejects_non_array_body() {
        let client = OrionClient::new(Canned::new(200, "{}"), "http://orion:1026").unwrap();
        assert!(client.query(&query()).await.is_err());
    }

    #[tokio::test]
    async fn test_create_posts_entity_and_expects_201() {
        let rating = NewRating::parse(
            35.68,
            139.76,
            None,
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            crate::rating::SelectionRule::AtLeastOne,
            Utc::now(),
        )
        .unwrap();
        let submitter = Submitter::default();

        let client = OrionClient::new(Canned::new(201, ""), "http://orion:1026").unwrap();
        client.create("id-1", &rating, &submitter).await.unwrap();
        {
            let seen = client.http.seen.lock().unwrap();
            let (method, url, body) = &seen[0];
            assert_eq!(*method, Method::POST);
            assert_eq!(url.as_str(), "http://orion:1026/v2/entities");
            let json: serde_json::Value = serde_json::from_slice(body.as_ref().unwrap()).unwrap();
            assert_eq!(json["id"], "id-1");
            assert_eq!(json["location"]["value"]["coordinates"][0], 139.76);
        }

        let rejected = OrionClient::new(Canned::new(200, ""), "http://orion:1026").unwrap();
        assert!(rejected.create("id-2", &rating, &submitter).await.is_err());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(OrionClient::new(Canned::new(200, "[]"), "not a url").is_err());
        assert!(OrionClient::new(Canned::new(200, "[]"), "mailto:orion@example.com").is_err());
    }

    #[test]
    fn test_base_url_path_prefix_is_kept() {
        let cases = [
            ("http://orion:1026", "/v2/entities"),
            ("http://orion:1026/", "/v2/entities"),
            ("http://gw.local/orion", "/orion/v2/entities"),
            ("http://gw.local/orion/", "/orion/v2/entities"),
            ("https://gw.local/api/orion", "/api/orion/v2/entities"),
        ];
        for (base, path) in cases {
            let client = OrionClient::new(Canned::new(200, "[]"), base).unwrap();
            assert_eq!(client.entities_url.path(), path, "base {base}");
        }
    }

    #[tokio::test]
    async fn test_query_goes_through_gateway_prefix() {
        let client = OrionClient::new(Canned::new(200, "[]"), "http://gw.local/orion").unwrap();
        client.query(&query()).await.unwrap();

        let seen = client.http.seen.lock().unwrap();
        assert_eq!(seen[0].1.path(), "/orion/v2/entities");
        assert_eq!(seen[0].1.host_str(), Some("gw.local"));
    }
}
