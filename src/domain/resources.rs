//! Upstream resources exposed by the proxy.
//!
//! Each builder maps inbound query parameters onto upstream parameter names, applies the
//! defaults, and attaches the cache policy. Every parameter that is forwarded upstream is
//! part of the cache key, so no two distinct upstream queries share an entry.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheKey;

use super::error::RequestError;
use super::request::{API_KEY_PARAM, CachePolicy, Endpoints, UpstreamRequest, present};

/// TTL for feed-style and search queries.
pub const FEED_TTL: Duration = Duration::from_secs(1800);
/// TTL for single-object lookups.
pub const LOOKUP_TTL: Duration = Duration::from_secs(86_400);
/// TTL for EPIC daily metadata.
pub const EPIC_TTL: Duration = Duration::from_secs(3600);

const DEFAULT_SEARCH_TERM: &str = "space";
const DEFAULT_PAGE: &str = "1";
const DEFAULT_ROVER: &str = "curiosity";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct NeoFeedQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ImageSearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EpicQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DonkiQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct MarsQuery {
    pub rover: Option<String>,
    pub sol: Option<String>,
    pub earth_date: Option<String>,
    pub camera: Option<String>,
    pub page: Option<String>,
}

/// Near-earth object approach feed (`/neo/rest/v1/feed`).
pub fn neo_feed(endpoints: &Endpoints, query: &NeoFeedQuery) -> UpstreamRequest {
    let start = present(&query.start_date);
    let end = present(&query.end_date);
    let key = CacheKey::compose(
        "neo:feed",
        &[start.unwrap_or("today"), end.unwrap_or("today")],
    );

    UpstreamRequest::new("NEO feed", endpoints.api(&["neo", "rest", "v1", "feed"]))
        .param(API_KEY_PARAM, endpoints.api_key.as_str())
        .param_opt("start_date", start)
        .param_opt("end_date", end)
        .cached(CachePolicy::new(key, FEED_TTL))
}

/// Single near-earth object by its SPK-ID (`/neo/rest/v1/neo/{id}`).
pub fn neo_lookup(endpoints: &Endpoints, id: &str) -> UpstreamRequest {
    UpstreamRequest::new("NEO id", endpoints.api(&["neo", "rest", "v1", "neo", id]))
        .param(API_KEY_PARAM, endpoints.api_key.as_str())
        .cached(CachePolicy::new(
            CacheKey::compose("neo:id", &[id]),
            LOOKUP_TTL,
        ))
}

/// InSight lander weather telemetry. Uncached, single attempt.
pub fn insight_weather(endpoints: &Endpoints) -> UpstreamRequest {
    UpstreamRequest::new("InSight weather", endpoints.api(&["insight_weather", ""]))
        .param(API_KEY_PARAM, endpoints.api_key.as_str())
        .param("feedtype", "json")
        .param("ver", "1.0")
        .single_attempt()
}

/// Image & Video Library search. The library needs no credential.
pub fn image_search(endpoints: &Endpoints, query: &ImageSearchQuery) -> UpstreamRequest {
    let term = present(&query.q).unwrap_or(DEFAULT_SEARCH_TERM);
    let page = present(&query.page).unwrap_or(DEFAULT_PAGE);

    UpstreamRequest::new("Image search", endpoints.images(&["search"]))
        .param("q", term)
        .param("page", page)
        .cached(CachePolicy::new(
            CacheKey::compose("imagesearch", &[term, page]),
            FEED_TTL,
        ))
}

/// EPIC image collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpicCollection {
    Natural,
    Enhanced,
}

impl EpicCollection {
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        match raw.to_ascii_lowercase().as_str() {
            "natural" => Ok(Self::Natural),
            "enhanced" => Ok(Self::Enhanced),
            _ => Err(RequestError::invalid(
                "collection",
                format!("`{raw}` is not one of natural, enhanced"),
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::Enhanced => "enhanced",
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Self::Natural => "EPIC natural",
            Self::Enhanced => "EPIC enhanced",
        }
    }
}

/// EPIC image metadata for a day (`/EPIC/api/{collection}`), latest when no date is given.
pub fn epic_metadata(
    endpoints: &Endpoints,
    collection: &str,
    query: &EpicQuery,
) -> Result<UpstreamRequest, RequestError> {
    let collection = EpicCollection::parse(collection)?;
    let date = present(&query.date);
    let key = CacheKey::compose(
        "epic",
        &[collection.as_str(), date.unwrap_or("latest")],
    );

    Ok(UpstreamRequest::new(
        collection.operation(),
        endpoints.api(&["EPIC", "api", collection.as_str()]),
    )
    .param(API_KEY_PARAM, endpoints.api_key.as_str())
    .param_opt("date", date)
    .cached(CachePolicy::new(key, EPIC_TTL)))
}

/// DONKI space-weather notification types, with their upstream path names.
const DONKI_KINDS: &[&str] = &[
    "FLR",
    "CME",
    "CMEAnalysis",
    "GST",
    "IPS",
    "SEP",
    "MPC",
    "RBE",
    "HSS",
    "WSAEnlilSimulations",
    "notifications",
];

fn donki_kind(raw: &str) -> Result<&'static str, RequestError> {
    DONKI_KINDS
        .iter()
        .copied()
        .find(|kind| kind.eq_ignore_ascii_case(raw))
        .ok_or_else(|| {
            RequestError::invalid("type", format!("`{raw}` is not a known DONKI event type"))
        })
}

/// DONKI space-weather events (`/DONKI/{kind}`).
pub fn donki(
    endpoints: &Endpoints,
    kind: &str,
    query: &DonkiQuery,
) -> Result<UpstreamRequest, RequestError> {
    let kind = donki_kind(kind)?;
    let start = present(&query.start_date);
    let end = present(&query.end_date);
    let key = CacheKey::compose(
        "donki",
        &[kind, start.unwrap_or(""), end.unwrap_or("")],
    );

    Ok(UpstreamRequest::new("DONKI", endpoints.api(&["DONKI", kind]))
        .param(API_KEY_PARAM, endpoints.api_key.as_str())
        .param_opt("startDate", start)
        .param_opt("endDate", end)
        .cached(CachePolicy::new(key, FEED_TTL)))
}

const MARS_ROVERS: &[&str] = &["curiosity", "opportunity", "spirit", "perseverance"];

/// Mars rover photos (`/mars-photos/api/v1/rovers/{rover}/photos`).
pub fn mars_photos(endpoints: &Endpoints, query: &MarsQuery) -> Result<UpstreamRequest, RequestError> {
    let requested = present(&query.rover).unwrap_or(DEFAULT_ROVER);
    let rover = MARS_ROVERS
        .iter()
        .copied()
        .find(|rover| rover.eq_ignore_ascii_case(requested))
        .ok_or_else(|| RequestError::invalid("rover", format!("`{requested}` is not a known rover")))?;

    let sol = present(&query.sol);
    let earth_date = present(&query.earth_date);
    let camera = present(&query.camera);
    let page = present(&query.page).unwrap_or(DEFAULT_PAGE);
    let key = CacheKey::compose(
        "mars",
        &[
            rover,
            sol.unwrap_or(""),
            earth_date.unwrap_or(""),
            camera.unwrap_or(""),
            page,
        ],
    );

    Ok(UpstreamRequest::new(
        "Mars photos",
        endpoints.api(&["mars-photos", "api", "v1", "rovers", rover, "photos"]),
    )
    .param(API_KEY_PARAM, endpoints.api_key.as_str())
    .param("page", page)
    .param_opt("sol", sol)
    .param_opt("earth_date", earth_date)
    .param_opt("camera", camera)
    .cached(CachePolicy::new(key, FEED_TTL)))
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::domain::request::RetryMode;

    fn endpoints() -> Endpoints {
        Endpoints {
            api_base: Url::parse("https://api.nasa.gov").expect("url"),
            images_base: Url::parse("https://images-api.nasa.gov").expect("url"),
            epic_archive_base: Url::parse("https://epic.gsfc.nasa.gov/archive").expect("url"),
            api_key: "KEY".to_string(),
        }
    }

    fn param<'a>(request: &'a UpstreamRequest, name: &str) -> Option<&'a str> {
        request
            .params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn neo_feed_defaults_key_to_today() {
        let request = neo_feed(&endpoints(), &NeoFeedQuery::default());
        assert_eq!(request.url.as_str(), "https://api.nasa.gov/neo/rest/v1/feed");
        assert_eq!(param(&request, "api_key"), Some("KEY"));
        assert_eq!(param(&request, "start_date"), None);

        let cache = request.cache.expect("feed is cached");
        assert_eq!(cache.key.as_str(), "neo:feed:today:today");
        assert_eq!(cache.ttl, FEED_TTL);
    }

    #[test]
    fn neo_feed_forwards_dates() {
        let query = NeoFeedQuery {
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-07".to_string()),
        };
        let request = neo_feed(&endpoints(), &query);
        assert_eq!(param(&request, "start_date"), Some("2024-01-01"));
        assert_eq!(param(&request, "end_date"), Some("2024-01-07"));
        assert_eq!(
            request.cache.expect("cached").key.as_str(),
            "neo:feed:2024-01-01:2024-01-07"
        );
    }

    #[test]
    fn neo_lookup_uses_day_long_ttl() {
        let request = neo_lookup(&endpoints(), "3542519");
        assert_eq!(
            request.url.as_str(),
            "https://api.nasa.gov/neo/rest/v1/neo/3542519"
        );
        let cache = request.cache.expect("lookup is cached");
        assert_eq!(cache.key.as_str(), "neo:id:3542519");
        assert_eq!(cache.ttl, LOOKUP_TTL);
    }

    #[test]
    fn insight_is_uncached_single_attempt() {
        let request = insight_weather(&endpoints());
        assert_eq!(request.url.as_str(), "https://api.nasa.gov/insight_weather/");
        assert_eq!(param(&request, "feedtype"), Some("json"));
        assert_eq!(param(&request, "ver"), Some("1.0"));
        assert!(request.cache.is_none());
        assert_eq!(request.retry, RetryMode::Disabled);
    }

    #[test]
    fn image_search_defaults_term_and_page() {
        let request = image_search(&endpoints(), &ImageSearchQuery::default());
        assert_eq!(request.url.as_str(), "https://images-api.nasa.gov/search");
        assert_eq!(param(&request, "q"), Some("space"));
        assert_eq!(param(&request, "page"), Some("1"));
        assert_eq!(param(&request, "api_key"), None);
        assert_eq!(
            request.cache.expect("cached").key.as_str(),
            "imagesearch:space:1"
        );
    }

    #[test]
    fn image_search_page_is_part_of_key() {
        let first = image_search(
            &endpoints(),
            &ImageSearchQuery {
                q: Some("moon".to_string()),
                page: Some("1".to_string()),
            },
        );
        let second = image_search(
            &endpoints(),
            &ImageSearchQuery {
                q: Some("moon".to_string()),
                page: Some("2".to_string()),
            },
        );
        assert_ne!(first.cache, second.cache);
    }

    #[test]
    fn epic_metadata_has_fixed_hour_ttl() {
        let request =
            epic_metadata(&endpoints(), "Enhanced", &EpicQuery::default()).expect("known collection");
        assert_eq!(request.url.as_str(), "https://api.nasa.gov/EPIC/api/enhanced");
        let cache = request.cache.expect("cached");
        assert_eq!(cache.key.as_str(), "epic:enhanced:latest");
        assert_eq!(cache.ttl, EPIC_TTL);
    }

    #[test]
    fn epic_metadata_rejects_unknown_collection() {
        let err = epic_metadata(&endpoints(), "infrared", &EpicQuery::default())
            .expect_err("unknown collection");
        assert!(matches!(err, RequestError::Invalid { field: "collection", .. }));
    }

    #[test]
    fn donki_kind_is_case_insensitive() {
        let query = DonkiQuery {
            start_date: Some("2024-01-01".to_string()),
            end_date: None,
        };
        let request = donki(&endpoints(), "flr", &query).expect("known kind");
        assert_eq!(request.url.as_str(), "https://api.nasa.gov/DONKI/FLR");
        assert_eq!(param(&request, "startDate"), Some("2024-01-01"));
        assert_eq!(param(&request, "endDate"), None);
        assert_eq!(
            request.cache.expect("cached").key.as_str(),
            "donki:FLR:2024-01-01:"
        );
    }

    #[test]
    fn donki_rejects_unknown_kind() {
        assert!(donki(&endpoints(), "../planetary", &DonkiQuery::default()).is_err());
    }

    #[test]
    fn mars_defaults_to_curiosity_first_page() {
        let request = mars_photos(&endpoints(), &MarsQuery::default()).expect("default rover");
        assert_eq!(
            request.url.as_str(),
            "https://api.nasa.gov/mars-photos/api/v1/rovers/curiosity/photos"
        );
        assert_eq!(param(&request, "page"), Some("1"));
        assert_eq!(request.cache.expect("cached").key.as_str(), "mars:curiosity::::1");
    }

    #[test]
    fn mars_camera_is_part_of_key() {
        let query = MarsQuery {
            sol: Some("1000".to_string()),
            camera: Some("FHAZ".to_string()),
            ..Default::default()
        };
        let request = mars_photos(&endpoints(), &query).expect("default rover");
        assert_eq!(param(&request, "camera"), Some("FHAZ"));
        assert_eq!(
            request.cache.expect("cached").key.as_str(),
            "mars:curiosity:1000::FHAZ:1"
        );
    }

    #[test]
    fn mars_rejects_unknown_rover() {
        let query = MarsQuery {
            rover: Some("sojourner".to_string()),
            ..Default::default()
        };
        assert!(mars_photos(&endpoints(), &query).is_err());
    }
}
