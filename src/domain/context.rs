//! Authentication context: the situational facts known at sign-in time

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Facts about one authentication attempt, built per request by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub user_auth_methods: Vec<String>,
    /// Additional attributes reachable through dotted paths (`device.platform`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthContext {
    pub fn username(&self) -> Option<&str> {
        non_empty(self.username.as_deref())
    }

    pub fn ip_address(&self) -> Option<&str> {
        non_empty(self.ip_address.as_deref())
    }

    pub fn geo_country(&self) -> Option<&str> {
        non_empty(self.geo_country.as_deref())
    }

    /// Resolve a dotted path against the context.
    ///
    /// Any missing segment resolves to `None`; traversal never fails.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let root = serde_json::to_value(self).ok()?;
        let mut current = &root;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
