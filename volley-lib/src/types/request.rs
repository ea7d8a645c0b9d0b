use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use url::Url;

use crate::ErrorKind;

/// One request of a batch.
///
/// The dispatcher never looks inside a descriptor; it is handed to the
/// configured [`RequestExecutor`](crate::RequestExecutor) as is, and from
/// there to the [`Transport`](crate::Transport).
///
/// Descriptors can be read from JSON:
///
/// ```
/// use volley_lib::RequestDescriptor;
///
/// let request: RequestDescriptor = serde_json::from_str(
///     r#"{"method": "post", "url": "https://example.com/items", "json": {"id": 1}}"#,
/// ).unwrap();
/// assert_eq!(request.method, http::Method::POST);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestDescriptor {
    /// HTTP method, case-insensitive when deserialized. Defaults to `GET`.
    #[serde(default = "default_method")]
    #[serde(deserialize_with = "deserialize_method")]
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,

    /// Target URL
    pub url: Url,

    /// Query parameters appended to the URL
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,

    /// Extra headers sent with this request only
    #[serde(default, skip_serializing_if = "HeaderMap::is_empty")]
    #[serde(deserialize_with = "deserialize_headers")]
    #[serde(serialize_with = "serialize_headers")]
    pub headers: HeaderMap,

    /// JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,

    /// Raw or form-encoded body, ignored when `json` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RequestData>,

    /// Timeout for this request, overriding the client-wide timeout
    #[serde(default, with = "humantime_serde")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Create a request with the given method and no body, headers or
    /// query parameters
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            params: BTreeMap::new(),
            headers: HeaderMap::new(),
            json: None,
            data: None,
            timeout: None,
        }
    }

    /// Create a `GET` request
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a JSON body
    #[must_use]
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    /// Set a raw or form-encoded body
    #[must_use]
    pub fn with_data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set a per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// A copy of this request pointed at another page of the same resource.
    ///
    /// Query parameters are dropped because pagination links carry their own
    /// query string. Method, headers, body and timeout are kept.
    #[must_use]
    pub fn follow(&self, url: Url) -> Self {
        Self {
            url,
            params: BTreeMap::new(),
            ..self.clone()
        }
    }
}

/// Body given as `data`.
///
/// A string is sent as is. An object of string values is sent as an
/// `application/x-www-form-urlencoded` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestData {
    /// Raw body
    Raw(String),
    /// Form fields
    Form(BTreeMap<String, String>),
}

impl From<String> for RequestData {
    fn from(body: String) -> Self {
        Self::Raw(body)
    }
}

impl From<&str> for RequestData {
    fn from(body: &str) -> Self {
        Self::Raw(body.to_string())
    }
}

impl From<BTreeMap<String, String>> for RequestData {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self::Form(fields)
    }
}

impl TryFrom<&str> for RequestDescriptor {
    type Error = ErrorKind;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        let parsed = Url::parse(url).map_err(|e| ErrorKind::InvalidUrl(url.to_string(), e))?;
        Ok(Self::get(parsed))
    }
}

impl TryFrom<String> for RequestDescriptor {
    type Error = ErrorKind;

    fn try_from(url: String) -> Result<Self, Self::Error> {
        Self::try_from(url.as_str())
    }
}

impl From<Url> for RequestDescriptor {
    fn from(url: Url) -> Self {
        Self::get(url)
    }
}

impl Display for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

const fn default_method() -> Method {
    Method::GET
}

fn deserialize_method<'de, D>(deserializer: D) -> Result<Method, D::Error>
where
    D: Deserializer<'de>,
{
    let method = String::deserialize(deserializer)?;
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| serde::de::Error::custom(format!("Invalid HTTP method '{method}'")))
}

fn serialize_method<S>(method: &Method, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(method.as_str())
}

/// Headers are written as a plain `{"name": "value"}` object
fn deserialize_headers<'de, D>(deserializer: D) -> Result<HeaderMap, D::Error>
where
    D: Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    let mut header_map = HeaderMap::new();

    for (name, value) in map {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("Invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| {
            serde::de::Error::custom(format!("Invalid header value '{value}': {e}"))
        })?;
        header_map.insert(header_name, header_value);
    }

    Ok(header_map)
}

fn serialize_headers<S>(headers: &HeaderMap, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let map: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or("").to_string()))
        .collect();
    map.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_minimal_descriptor_defaults_to_get() {
        let request: RequestDescriptor =
            serde_json::from_value(json!({"url": "https://example.com/"})).unwrap();

        assert_eq!(request.method, Method::GET);
        assert!(request.params.is_empty());
        assert!(request.headers.is_empty());
        assert_eq!(request.json, None);
    }

    #[test]
    fn test_full_descriptor() {
        let request: RequestDescriptor = serde_json::from_value(json!({
            "method": "patch",
            "url": "https://example.com/items/1",
            "params": {"verbose": "true"},
            "headers": {"Authorization": "Bearer token123"},
            "json": {"name": "new"},
            "timeout": "2s"
        }))
        .unwrap();

        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.params.get("verbose").map(String::as_str), Some("true"));
        assert_eq!(request.headers["authorization"], "Bearer token123");
        assert_eq!(request.json, Some(json!({"name": "new"})));
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_data_as_string_or_form() {
        let raw: RequestDescriptor =
            serde_json::from_value(json!({"url": "https://example.com/", "data": "a=1"}))
                .unwrap();
        assert_eq!(raw.data, Some(RequestData::Raw("a=1".to_string())));

        let form: RequestDescriptor = serde_json::from_value(
            json!({"url": "https://example.com/", "data": {"b": "2", "a": "1"}}),
        )
        .unwrap();
        assert_eq!(
            form.data,
            Some(RequestData::Form(BTreeMap::from([
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ])))
        );
    }

    #[test]
    fn test_data_with_nested_values_is_rejected() {
        let result = serde_json::from_value::<RequestDescriptor>(
            json!({"url": "https://example.com/", "data": {"a": {"b": 1}}}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = serde_json::from_value::<RequestDescriptor>(
            json!({"url": "https://example.com/", "allow_redirects": false}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = serde_json::from_value::<RequestDescriptor>(
            json!({"url": "https://example.com/", "headers": {"bad header": "x"}}),
        );
        assert!(result.unwrap_err().to_string().contains("Invalid header name"));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let request = RequestDescriptor::try_from("https://example.com/").unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"method": "GET", "url": "https://example.com/"}));
    }

    #[test]
    fn test_follow_keeps_method_and_drops_params() {
        let request = RequestDescriptor::try_from("https://example.com/items")
            .unwrap()
            .with_param("page", "1")
            .with_json(json!({"filter": "all"}));

        let next = request.follow(Url::parse("https://example.com/items?page=2").unwrap());

        assert_eq!(next.url.as_str(), "https://example.com/items?page=2");
        assert!(next.params.is_empty());
        assert_eq!(next.json, request.json);
        assert_eq!(next.method, request.method);
    }

    #[test]
    fn test_invalid_url() {
        let error = RequestDescriptor::try_from("not a url").unwrap_err();
        assert!(matches!(error, ErrorKind::InvalidUrl(..)));
    }
}
