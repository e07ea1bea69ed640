//! Payloads exchanged with the analytics backend.

use std::fmt;
use std::str::FromStr;

use mib_core::entitlement::OrderRecord;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Report family, used as the `{kind}_report` path prefix upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Suburb,
    Property,
    Region,
}

impl ReportKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suburb => "suburb",
            Self::Property => "property",
            Self::Region => "region",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "suburb" => Ok(Self::Suburb),
            "property" => Ok(Self::Property),
            "region" => Ok(Self::Region),
            other => Err(format!("Unknown report kind: {other}")),
        }
    }
}

/// One report section as the browser receives it.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Raw HTML fragment.
    Html(String),
    /// JSON payload, possibly carrying an `html` fragment of its own.
    Json {
        data: serde_json::Value,
        html: Option<String>,
    },
    /// Backend failed, returned a non-2xx status or an empty body.
    Unavailable,
}

impl Section {
    /// Interpret a successful response body. Valid JSON objects and arrays
    /// are kept as data; anything else is treated as HTML.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self::Unavailable;
        }

        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(data @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                let html = data
                    .get("html")
                    .and_then(serde_json::Value::as_str)
                    .map(String::from);
                Self::Json { data, html }
            }
            _ => Self::Html(body.to_string()),
        }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

#[derive(Serialize)]
struct SectionBody<'a> {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            Self::Html(html) => SectionBody {
                available: true,
                html: Some(html),
                data: None,
            },
            Self::Json { data, html } => SectionBody {
                available: true,
                html: html.as_deref(),
                data: Some(data),
            },
            Self::Unavailable => SectionBody {
                available: false,
                html: None,
                data: None,
            },
        };
        body.serialize(serializer)
    }
}

/// Private and public schools for a suburb.
#[derive(Debug, Clone, Serialize)]
pub struct Schools {
    pub private: Section,
    pub public: Section,
}

/// An address search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSuggestion {
    #[serde(alias = "address", alias = "display_name")]
    pub label: String,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng")]
    pub longitude: Option<f64>,
}

/// Orders response: either a bare array or wrapped in `{orders: [...]}`.
///
/// Entries stay raw until [`OrdersResponse::into_orders`] so one malformed
/// order cannot sink the rest.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrdersResponse {
    List(Vec<Value>),
    Wrapped { orders: Vec<Value> },
}

impl OrdersResponse {
    /// Decode each entry on its own, skipping the ones that do not decode.
    pub(crate) fn into_orders(self) -> Vec<OrderRecord> {
        let (Self::List(entries) | Self::Wrapped { orders: entries }) = self;
        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(order) => Some(order),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed order entry");
                    None
                }
            })
            .collect()
    }
}

/// Address search response: a bare array or `{results: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AddressResponse {
    List(Vec<AddressSuggestion>),
    Wrapped { results: Vec<AddressSuggestion> },
}

impl AddressResponse {
    pub(crate) fn into_suggestions(self) -> Vec<AddressSuggestion> {
        match self {
            Self::List(results) | Self::Wrapped { results } => results,
        }
    }
}
