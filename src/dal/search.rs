use crate::schema::{PlaceCandidate, SearchBy};
use failure::Fallible;
use reqwest::{header::AUTHORIZATION, Client};
use serde_derive::Deserialize;
use std::{sync::Arc, time::Duration};

/// Where the Kakao Local API lives.
pub const KAKAO_BASE_URL: &str = "https://dapi.kakao.com";

/// A client for the external place-search provider (the Kakao Local API). A client created with
/// `PlaceSearch::disabled` never finds anything.
#[derive(Clone, Debug)]
pub struct PlaceSearch {
    inner: Option<Arc<SearchInner>>,
}

impl PlaceSearch {
    /// A client that never finds anything, for when no API key is configured.
    pub fn disabled() -> PlaceSearch {
        PlaceSearch { inner: None }
    }

    /// Creates a client for the Kakao Local API.
    pub fn kakao(api_key: String, timeout: Duration) -> Fallible<PlaceSearch> {
        PlaceSearch::with_base_url(api_key, KAKAO_BASE_URL.to_string(), timeout)
    }

    /// Creates a client for a Kakao-compatible API at the given base URL.
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Fallible<PlaceSearch> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(PlaceSearch {
            inner: Some(Arc::new(SearchInner {
                api_key,
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            })),
        })
    }

    /// Whether searches actually go anywhere.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Searches for places by keyword (`SearchBy::Name`) or by address.
    pub async fn search(&self, query: &str, by: SearchBy) -> Fallible<Vec<PlaceCandidate>> {
        let inner = match self.inner {
            Some(ref inner) => inner,
            None => return Ok(Vec::new()),
        };

        let endpoint = match by {
            SearchBy::Name => "keyword",
            SearchBy::Address => "address",
        };
        let url = format!("{}/v2/local/search/{}.json", inner.base_url, endpoint);
        let resp = inner
            .client
            .get(&url)
            .query(&[("query", query)])
            .header(AUTHORIZATION, format!("KakaoAK {}", inner.api_key))
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;
        Ok(candidates(resp))
    }
}

#[derive(Debug)]
struct SearchInner {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    documents: Vec<Document>,
}

/// A search hit. Keyword searches fill in everything; address searches only have the address and
/// coordinates. Coordinates come as decimal strings.
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    place_name: Option<String>,
    address_name: String,
    #[serde(default)]
    road_address_name: Option<String>,
    x: String,
    y: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    place_url: Option<String>,
}

/// Turns a search response into candidates, dropping any hit whose coordinates don't parse.
fn candidates(resp: SearchResponse) -> Vec<PlaceCandidate> {
    resp.documents
        .into_iter()
        .filter_map(|doc| {
            let lng = doc.x.trim().parse::<f64>().ok()?;
            let lat = doc.y.trim().parse::<f64>().ok()?;
            let address = doc
                .road_address_name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| doc.address_name.clone());
            Some(PlaceCandidate {
                id: None,
                external_id: doc.id.filter(|s| !s.is_empty()),
                name: doc
                    .place_name
                    .filter(|s| !s.is_empty())
                    .unwrap_or(doc.address_name),
                address,
                lat: Some(lat),
                lng: Some(lng),
                phone: doc.phone.filter(|s| !s.is_empty()),
                url: doc.place_url.filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{candidates, PlaceSearch, SearchResponse};
    use crate::schema::SearchBy;
    use serde_json::json;

    #[test]
    fn keyword_hits_become_candidates() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "documents": [{
                "id": "8217054",
                "place_name": "Gyeongbokgung",
                "address_name": "1-1 Sejongno, Jongno-gu, Seoul",
                "road_address_name": "161 Sajik-ro, Jongno-gu, Seoul",
                "x": "126.977041",
                "y": "37.579617",
                "phone": "02-3700-3900",
                "place_url": "http://place.map.kakao.com/8217054",
                "category_name": "Travel > Attraction"
            }],
            "meta": { "total_count": 1 }
        }))
        .unwrap();

        let found = candidates(resp);
        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.id, None);
        assert_eq!(c.external_id.as_ref().map(|s| &s[..]), Some("8217054"));
        assert_eq!(c.name, "Gyeongbokgung");
        assert_eq!(c.address, "161 Sajik-ro, Jongno-gu, Seoul");
        assert_eq!(c.lat, Some(37.579617));
        assert_eq!(c.lng, Some(126.977041));
        assert_eq!(c.phone.as_ref().map(|s| &s[..]), Some("02-3700-3900"));
    }

    #[test]
    fn address_hits_use_the_address_as_the_name() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "documents": [
                {
                    "address_name": "Sejongno 1-1",
                    "road_address": null,
                    "x": "126.9",
                    "y": "37.5"
                },
                {
                    "address_name": "Nowhere",
                    "x": "not a number",
                    "y": "37.5"
                }
            ]
        }))
        .unwrap();

        let found = candidates(resp);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Sejongno 1-1");
        assert_eq!(found[0].address, "Sejongno 1-1");
        assert_eq!(found[0].external_id, None);
        assert_eq!(found[0].url, None);
    }

    #[tokio::test]
    async fn disabled_search_finds_nothing() {
        let search = PlaceSearch::disabled();
        assert!(!search.is_enabled());
        let found = search.search("Gyeongbokgung", SearchBy::Name).await.unwrap();
        assert!(found.is_empty());
    }
}
