//! OData v2 JSON envelope helpers shared by the transport and the controllers.

use serde::{
    de::{self, DeserializeOwned},
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;

pub const METADATA_FIELD: &str = "__metadata";
pub const DEFERRED_FIELD: &str = "__deferred";
pub const NEXT_FIELD: &str = "__next";
pub const RESULTS_FIELD: &str = "results";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub uri: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredLink {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    d: Value,
}

/// One page of a collection response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionPage {
    pub items: Vec<Value>,
    pub next: Option<String>,
}

pub fn parse_collection(raw: &str) -> serde_json::Result<CollectionPage> {
    let Envelope { d } = serde_json::from_str(raw)?;
    let page = match d {
        Value::Null => CollectionPage::default(),
        Value::Array(items) => CollectionPage { items, next: None },
        Value::Object(mut body) => match body.remove(RESULTS_FIELD) {
            Some(Value::Array(items)) => CollectionPage {
                items,
                next: body
                    .get(NEXT_FIELD)
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            Some(_) => return Err(de::Error::custom("`results` must be an array")),
            None => CollectionPage {
                items: vec![Value::Object(body)],
                next: None,
            },
        },
        other => {
            return Err(de::Error::custom(format!(
                "unexpected envelope payload: {other}"
            )))
        }
    };
    Ok(page)
}

/// Returns the first entity of a response, `None` when the envelope is empty.
pub fn parse_single(raw: &str) -> serde_json::Result<Option<Value>> {
    Ok(parse_collection(raw)?.items.into_iter().next())
}

pub fn is_deferred(value: &Value) -> bool {
    value.get(DEFERRED_FIELD).is_some()
}

/// Inline items of a nested collection. `None` for deferred links, nulls and scalars.
pub fn inline_items(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(body) => match body.get(RESULTS_FIELD) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// A navigation property that is either inlined or deferred for a later fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Linked<T> {
    Deferred(DeferredLink),
    Inline(Vec<T>),
}

impl<T> Linked<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Deferred(_) => &[],
            Self::Inline(items) => items,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl<T> Default for Linked<T> {
    fn default() -> Self {
        Self::Inline(Vec::new())
    }
}

impl<T: Serialize> Serialize for Linked<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct DeferredBody<'a> {
            #[serde(rename = "__deferred")]
            deferred: &'a DeferredLink,
        }

        match self {
            Self::Deferred(link) => DeferredBody { deferred: link }.serialize(serializer),
            Self::Inline(items) => items.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Linked<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Some(link) = value.get(DEFERRED_FIELD) {
            return DeferredLink::deserialize(link)
                .map(Self::Deferred)
                .map_err(de::Error::custom);
        }
        let items = inline_items(&value)
            .ok_or_else(|| de::Error::custom("expected a deferred link or an entity collection"))?;
        items
            .iter()
            .map(T::deserialize)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Inline)
            .map_err(de::Error::custom)
    }
}

/// `"/Date(<millis>[+-hhmm])/"` encoding used for date fields.
pub mod odata_date {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Some(inner) = raw
            .strip_prefix("/Date(")
            .and_then(|rest| rest.strip_suffix(")/"))
        {
            // The offset suffix only annotates the original zone; millis are UTC.
            let end = inner
                .get(1..)?
                .find(['+', '-'])
                .map(|idx| idx + 1)
                .unwrap_or(inner.len());
            let millis = inner[..end].parse::<i64>().ok()?;
            return DateTime::from_timestamp_millis(millis);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|value| value.with_timezone(&Utc))
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        format!("/Date({})/", value.timestamp_millis())
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid OData date `{raw}`"))),
            None => Ok(None),
        }
    }
}
