//! Immutable request values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ResourceError;
use crate::name::ResourceName;
use crate::request::patch::PatchOperation;

/// The seven operations a resource can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Create,
    Read,
    Update,
    Delete,
    Patch,
    Action,
    Query,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Create => "create",
            RequestType::Read => "read",
            RequestType::Update => "update",
            RequestType::Delete => "delete",
            RequestType::Patch => "patch",
            RequestType::Action => "action",
            RequestType::Query => "query",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the total size of a paged query result should be reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountPolicy {
    #[default]
    None,
    Estimate,
    Exact,
}

impl CountPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountPolicy::None => "NONE",
            CountPolicy::Estimate => "ESTIMATE",
            CountPolicy::Exact => "EXACT",
        }
    }
}

impl FromStr for CountPolicy {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(CountPolicy::None),
            "ESTIMATE" => Ok(CountPolicy::Estimate),
            "EXACT" => Ok(CountPolicy::Exact),
            _ => Err(ResourceError::BadRequest(format!(
                "'{}' is not a valid count policy",
                s
            ))),
        }
    }
}

/// One query sort key: a field pointer and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

impl FromStr for SortKey {
    type Err = ResourceError;

    /// `+name`, `-name` or a bare `name` (ascending).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ascending, field) = match s.as_bytes().first() {
            Some(b'+') => (true, &s[1..]),
            Some(b'-') => (false, &s[1..]),
            _ => (true, s),
        };
        if field.is_empty() {
            return Err(ResourceError::BadRequest(format!(
                "'{}' is not a valid sort key",
                s
            )));
        }
        Ok(Self {
            field: field.to_string(),
            ascending,
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.ascending { '+' } else { '-' }, self.field)
    }
}

/// Query parameters. Exactly one of the three selectors may be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub query_filter: Option<String>,
    pub query_id: Option<String>,
    pub query_expression: Option<String>,
    pub sort_keys: Vec<SortKey>,
    pub page_size: u32,
    pub paged_results_offset: u32,
    pub paged_results_cookie: Option<String>,
    pub total_paged_results_policy: CountPolicy,
}

impl QueryParams {
    pub(crate) fn selector_count(&self) -> usize {
        [&self.query_filter, &self.query_id, &self.query_expression]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }
}

/// The operation-specific part of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Create {
        content: Value,
        new_resource_id: Option<String>,
    },
    Read,
    Update {
        content: Value,
        revision: Option<String>,
    },
    Delete {
        revision: Option<String>,
    },
    Patch {
        operations: Vec<PatchOperation>,
        revision: Option<String>,
    },
    Action {
        action: String,
        content: Value,
    },
    Query(QueryParams),
}

impl RequestKind {
    pub fn request_type(&self) -> RequestType {
        match self {
            RequestKind::Create { .. } => RequestType::Create,
            RequestKind::Read => RequestType::Read,
            RequestKind::Update { .. } => RequestType::Update,
            RequestKind::Delete { .. } => RequestType::Delete,
            RequestKind::Patch { .. } => RequestType::Patch,
            RequestKind::Action { .. } => RequestType::Action,
            RequestKind::Query(_) => RequestType::Query,
        }
    }
}

/// A finished request. Built with [`crate::request::RequestBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub(crate) resource_name: ResourceName,
    pub(crate) fields: Vec<String>,
    pub(crate) additional_parameters: BTreeMap<String, String>,
    pub(crate) kind: RequestKind,
}

impl Request {
    pub fn resource_name(&self) -> &ResourceName {
        &self.resource_name
    }

    /// JSON pointers selecting the fields to return. Empty means all.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn additional_parameters(&self) -> &BTreeMap<String, String> {
        &self.additional_parameters
    }

    pub fn additional_parameter(&self, name: &str) -> Option<&str> {
        self.additional_parameters.get(name).map(String::as_str)
    }

    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    pub fn request_type(&self) -> RequestType {
        self.kind.request_type()
    }

    pub fn revision(&self) -> Option<&str> {
        match &self.kind {
            RequestKind::Update { revision, .. }
            | RequestKind::Delete { revision }
            | RequestKind::Patch { revision, .. } => revision.as_deref(),
            _ => None,
        }
    }

    /// The same request addressed to a different resource.
    ///
    /// Routers use this to forward the unmatched suffix.
    pub fn with_resource_name(mut self, resource_name: ResourceName) -> Self {
        self.resource_name = resource_name;
        self
    }

    /// Diagnostic JSON rendering, also used by the CLI.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("method".into(), json!(self.request_type().as_str()));
        out.insert("resourcePath".into(), json!(self.resource_name.to_string()));
        if !self.fields.is_empty() {
            out.insert("fields".into(), json!(self.fields));
        }
        if !self.additional_parameters.is_empty() {
            out.insert(
                "additionalParameters".into(),
                json!(self.additional_parameters),
            );
        }

        match &self.kind {
            RequestKind::Create {
                content,
                new_resource_id,
            } => {
                out.insert("content".into(), content.clone());
                if let Some(id) = new_resource_id {
                    out.insert("newResourceId".into(), json!(id));
                }
            }
            RequestKind::Read => {}
            RequestKind::Update { content, revision } => {
                out.insert("content".into(), content.clone());
                if let Some(rev) = revision {
                    out.insert("revision".into(), json!(rev));
                }
            }
            RequestKind::Delete { revision } => {
                if let Some(rev) = revision {
                    out.insert("revision".into(), json!(rev));
                }
            }
            RequestKind::Patch {
                operations,
                revision,
            } => {
                let ops: Vec<Value> = operations.iter().map(PatchOperation::to_json).collect();
                out.insert("patchOperations".into(), Value::Array(ops));
                if let Some(rev) = revision {
                    out.insert("revision".into(), json!(rev));
                }
            }
            RequestKind::Action { action, content } => {
                out.insert("action".into(), json!(action));
                out.insert("content".into(), content.clone());
            }
            RequestKind::Query(query) => {
                for (key, value) in [
                    ("queryFilter", &query.query_filter),
                    ("queryId", &query.query_id),
                    ("queryExpression", &query.query_expression),
                    ("pagedResultsCookie", &query.paged_results_cookie),
                ] {
                    if let Some(v) = value {
                        out.insert(key.into(), json!(v));
                    }
                }
                if !query.sort_keys.is_empty() {
                    let keys: Vec<String> =
                        query.sort_keys.iter().map(ToString::to_string).collect();
                    out.insert("sortKeys".into(), json!(keys));
                }
                out.insert("pageSize".into(), json!(query.page_size));
                out.insert(
                    "pagedResultsOffset".into(),
                    json!(query.paged_results_offset),
                );
                out.insert(
                    "totalPagedResultsPolicy".into(),
                    json!(query.total_paged_results_policy.as_str()),
                );
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("-age".parse::<SortKey>().unwrap(), SortKey::descending("age"));
        assert_eq!("+age".parse::<SortKey>().unwrap(), SortKey::ascending("age"));
        assert_eq!("age".parse::<SortKey>().unwrap(), SortKey::ascending("age"));
        assert!("-".parse::<SortKey>().is_err());
        assert_eq!(SortKey::descending("name").to_string(), "-name");
    }

    #[test]
    fn test_count_policy_parse() {
        assert_eq!("exact".parse::<CountPolicy>().unwrap(), CountPolicy::Exact);
        assert_eq!(CountPolicy::default(), CountPolicy::None);
        assert!("lots".parse::<CountPolicy>().is_err());
    }
}
