//! URL, query-string and URL-encoded form encoding.
//!
//! Two escape sets are used:
//! - [`COMPONENT`] escapes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
//!   (the `encodeURIComponent` set), for keys, values and plain segments.
//! - [`URI`] additionally keeps the reserved characters `; , / ? : @ & = + $ #`
//!   (the `encodeURI` set), for path segments that contain `/`.

use crate::base::predicates;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

pub const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const URI: &AsciiSet = &COMPONENT
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

/// Percent-encode a single URL component.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Percent-encode a URI fragment, keeping reserved characters.
pub fn encode_uri(input: &str) -> String {
    utf8_percent_encode(input, URI).to_string()
}

/// Encode one path segment: component-encoded unless it contains `/`.
pub fn encode_segment(segment: &str) -> String {
    if segment.contains('/') {
        encode_uri(segment)
    } else {
        encode_component(segment)
    }
}

/// A query parameter value: one scalar or a list sent as repeated keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// Values in the order they are emitted.
    pub fn values(&self) -> &[String] {
        match self {
            QueryValue::One(v) => std::slice::from_ref(v),
            QueryValue::Many(vs) => vs,
        }
    }
}

/// Conversion into a query value. `None` means "absent" and drops the key.
pub trait IntoQueryValue {
    fn into_query_value(self) -> Option<QueryValue>;
}

macro_rules! scalar_query_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoQueryValue for $t {
                fn into_query_value(self) -> Option<QueryValue> {
                    Some(QueryValue::One(self.to_string()))
                }
            }
        )*
    };
}

scalar_query_value!(
    &str, String, &String, char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64,
);

impl IntoQueryValue for QueryValue {
    fn into_query_value(self) -> Option<QueryValue> {
        Some(self)
    }
}

impl<T: IntoQueryValue> IntoQueryValue for Option<T> {
    fn into_query_value(self) -> Option<QueryValue> {
        self.and_then(IntoQueryValue::into_query_value)
    }
}

fn flatten<I>(items: I) -> Option<QueryValue>
where
    I: IntoIterator,
    I::Item: IntoQueryValue,
{
    let mut values = Vec::new();
    for item in items {
        match item.into_query_value() {
            Some(QueryValue::One(v)) => values.push(v),
            Some(QueryValue::Many(vs)) => values.extend(vs),
            None => {}
        }
    }
    Some(QueryValue::Many(values))
}

impl<T: IntoQueryValue> IntoQueryValue for Vec<T> {
    fn into_query_value(self) -> Option<QueryValue> {
        flatten(self)
    }
}

impl<T: IntoQueryValue, const N: usize> IntoQueryValue for [T; N] {
    fn into_query_value(self) -> Option<QueryValue> {
        flatten(self)
    }
}

impl<T: IntoQueryValue + Clone> IntoQueryValue for &[T] {
    fn into_query_value(self) -> Option<QueryValue> {
        flatten(self.iter().cloned())
    }
}

impl IntoQueryValue for Value {
    fn into_query_value(self) -> Option<QueryValue> {
        match self {
            Value::Null => None,
            Value::Array(items) => Some(QueryValue::Many(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(scalar_text)
                    .collect(),
            )),
            other => Some(QueryValue::One(scalar_text(&other))),
        }
    }
}

impl IntoQueryValue for &Value {
    fn into_query_value(self) -> Option<QueryValue> {
        self.clone().into_query_value()
    }
}

/// Text form of a JSON value inside a query string or form body.
///
/// Strings are used as-is, other primitives by their literal, and objects
/// and arrays are JSON-stringified.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        v if predicates::is_primitive(v) => v.to_string(),
        v => serde_json::to_string(v).unwrap_or_default(),
    }
}

fn encode_pair(key: &str, value: &str) -> String {
    format!("{}={}", encode_component(key), encode_component(value))
}

/// Join already-encoded segments with `/` and append the query string.
///
/// Every value of a list parameter becomes its own `key=value` pair, in
/// list order. Parameters keep the order they were first set in.
pub fn build_url(segments: &[String], params: &[(String, QueryValue)]) -> String {
    let mut url = segments.join("/");

    if !params.is_empty() {
        let pairs: Vec<String> = params
            .iter()
            .flat_map(|(key, value)| value.values().iter().map(move |v| encode_pair(key, v)))
            .collect();
        url.push('?');
        url.push_str(&pairs.join("&"));
    }

    url
}

/// Encode a JSON object as `application/x-www-form-urlencoded`.
///
/// Arrays expand to repeated keys; other values count as one-element lists.
pub fn encode_form_object(object: &Map<String, Value>) -> String {
    object
        .iter()
        .flat_map(|(key, value)| {
            let items: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                single => vec![single],
            };
            items
                .into_iter()
                .map(|item| encode_pair(key, &scalar_text(item)))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join("&")
}
