use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use wiremock::{Match, Request};

/// # Panics
///
/// Will panic if a file can't be read or missing
#[must_use = "This function returns the body of the file as a string"]
pub fn body_from_file(path: &str) -> String {
    fs::read_to_string(path).expect("Failed to read file")
}

pub struct JsonFieldExactMatcher(String, Value);

impl JsonFieldExactMatcher {
    /// Specify the expected value for a top-level field of a JSON body.
    pub fn new<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Self(key.into(), value.into())
    }
}

/// Shorthand for [`JsonFieldExactMatcher::new`].
pub fn json_field<K, V>(key: K, value: V) -> JsonFieldExactMatcher
where
    K: Into<String>,
    V: Into<Value>,
{
    JsonFieldExactMatcher::new(key, value)
}

impl Match for JsonFieldExactMatcher {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| body.get(&self.0).cloned())
            .is_some_and(|value| value == self.1)
    }
}

/// Matches a `{"hashes": [...]}` body regardless of hash order.
pub struct HashesMatcher(BTreeSet<String>);

/// Shorthand for [`HashesMatcher`].
pub fn hashes<I, S>(expected: I) -> HashesMatcher
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    HashesMatcher(expected.into_iter().map(Into::into).collect())
}

impl Match for HashesMatcher {
    fn matches(&self, request: &Request) -> bool {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return false;
        };
        let Some(list) = body.get("hashes").and_then(Value::as_array) else {
            return false;
        };
        let received: BTreeSet<String> = list
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect();
        received.len() == list.len() && received == self.0
    }
}
