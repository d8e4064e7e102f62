//! Sherpa Romeo publication records and open-access license selection.

use serde::{Deserialize, Serialize};

use super::de;

/// Hosting locations that count as open deposit
pub const ALLOWED_LOCATIONS: [&str; 4] = [
    "any_website",
    "non_commercial_website",
    "institutional_repository",
    "non_commercial_repository",
];

const CREATIVE_COMMONS: &str = "https://creativecommons.org/";

/// Response of the `cgi/retrieve` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyResponse {
    #[serde(rename = "items", default)]
    pub publications: Vec<Publication>,
}

impl PolicyResponse {
    /// First Creative Commons license of an embargo-free, openly hosted
    /// condition for the published version, in policy order. Empty if none.
    pub fn get_license(&self) -> String {
        self.publications
            .iter()
            .flat_map(|p| p.publisher_policies.iter())
            .flat_map(|policy| policy.permitted_oa.iter())
            .filter(|oa| oa.is_open_published())
            .flat_map(|oa| oa.license.iter())
            .find_map(License::uri)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Publication {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(rename = "publisher_policy", default)]
    pub publisher_policies: Vec<PublisherPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublisherPolicy {
    #[serde(default, deserialize_with = "de::string")]
    pub uri: String,

    #[serde(default, deserialize_with = "de::string")]
    pub open_access_prohibited: String,

    #[serde(default)]
    pub permitted_oa: Vec<PermittedOa>,
}

/// One permitted open-access condition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermittedOa {
    /// e.g. `submitted`, `accepted`, `published`
    #[serde(default)]
    pub article_version: Vec<String>,

    #[serde(default)]
    pub location: Location,

    #[serde(default)]
    pub embargo: Option<Embargo>,

    #[serde(default)]
    pub license: Vec<License>,

    #[serde(default)]
    pub conditions: Vec<String>,

    #[serde(default, deserialize_with = "de::string")]
    pub additional_oa_fee: String,
}

impl PermittedOa {
    fn is_open_published(&self) -> bool {
        self.article_version.iter().any(|v| v == "published")
            && self.location.is_allowed()
            && self.embargo.as_ref().map_or(0, |e| e.amount) == 0
    }
}

/// Permitted hosting locations.
///
/// Sherpa nests them as `{"location": [...], "location_phrases": [...]}`;
/// a bare list is accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocationRepr")]
pub struct Location {
    pub locations: Vec<String>,
}

impl Location {
    pub fn is_allowed(&self) -> bool {
        self.locations
            .iter()
            .any(|l| ALLOWED_LOCATIONS.contains(&l.as_str()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocationRepr {
    List(Vec<String>),
    Object {
        #[serde(default)]
        location: Vec<String>,
    },
}

impl From<LocationRepr> for Location {
    fn from(repr: LocationRepr) -> Self {
        let locations = match repr {
            LocationRepr::List(locations) => locations,
            LocationRepr::Object { location } => location,
        };
        Self { locations }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embargo {
    #[serde(default)]
    pub amount: u32,

    #[serde(default)]
    pub units: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct License {
    /// Sherpa license id, e.g. `cc_by_nc`
    #[serde(default)]
    pub license: String,

    #[serde(default, deserialize_with = "de::string")]
    pub version: String,
}

impl License {
    /// Creative Commons URI for `cc_*` licenses
    pub fn uri(&self) -> Option<String> {
        let mut parts = self.license.split('_');
        if parts.next() != Some("cc") {
            return None;
        }
        let kind = parts.collect::<Vec<_>>().join("-");
        if kind == "public-domain" {
            return Some(format!("{CREATIVE_COMMONS}publicdomain/"));
        }
        let version = if self.version.is_empty() {
            "4.0"
        } else {
            self.version.as_str()
        };
        Some(format!("{CREATIVE_COMMONS}licenses/{kind}/{version}/"))
    }
}
