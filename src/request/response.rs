//! Successful outcomes of a request.

use serde_json::{json, Map, Value};

use crate::request::model::CountPolicy;
use crate::resources::filter::filter_resource;

/// Field holding a resource's id in rendered content.
pub const FIELD_ID: &str = "_id";
/// Field holding a resource's revision in rendered content.
pub const FIELD_REVISION: &str = "_rev";

/// Value of `total_paged_results` when no count was computed.
pub const NO_COUNT: i64 = -1;

/// A single resource: identity, revision and JSON content.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub id: Option<String>,
    pub revision: Option<String>,
    pub content: Value,
}

impl ResourceResponse {
    pub fn new(id: Option<String>, revision: Option<String>, content: Value) -> Self {
        Self {
            id,
            revision,
            content,
        }
    }

    /// Content with `_id` and `_rev` folded in when the content is an object.
    pub fn to_json(&self) -> Value {
        let mut content = self.content.clone();
        if let Value::Object(map) = &mut content {
            if let Some(id) = &self.id {
                map.insert(FIELD_ID.into(), json!(id));
            }
            if let Some(rev) = &self.revision {
                map.insert(FIELD_REVISION.into(), json!(rev));
            }
        }
        content
    }

    fn filtered(self, fields: &[String]) -> Self {
        Self {
            content: filter_resource(&self.content, fields),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    pub content: Value,
}

impl ActionResponse {
    pub fn new(content: Value) -> Self {
        Self { content }
    }
}

/// A page of query results plus the summary that terminates it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub resources: Vec<ResourceResponse>,
    pub paged_results_cookie: Option<String>,
    pub total_paged_results_policy: CountPolicy,
    pub total_paged_results: i64,
}

impl QueryResponse {
    pub fn new(resources: Vec<ResourceResponse>) -> Self {
        Self {
            resources,
            paged_results_cookie: None,
            total_paged_results_policy: CountPolicy::None,
            total_paged_results: NO_COUNT,
        }
    }

    pub fn to_json(&self) -> Value {
        let results: Vec<Value> = self.resources.iter().map(ResourceResponse::to_json).collect();
        let mut out = Map::new();
        out.insert("resultCount".into(), json!(results.len()));
        out.insert("result".into(), Value::Array(results));
        out.insert(
            "pagedResultsCookie".into(),
            self.paged_results_cookie
                .as_ref()
                .map_or(Value::Null, |c| json!(c)),
        );
        out.insert(
            "totalPagedResultsPolicy".into(),
            json!(self.total_paged_results_policy.as_str()),
        );
        out.insert("totalPagedResults".into(), json!(self.total_paged_results));
        Value::Object(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Resource(ResourceResponse),
    Action(ActionResponse),
    Query(QueryResponse),
}

impl Response {
    pub fn to_json(&self) -> Value {
        match self {
            Response::Resource(resource) => resource.to_json(),
            Response::Action(action) => action.content.clone(),
            Response::Query(query) => query.to_json(),
        }
    }

    /// Project resource content onto the requested fields.
    ///
    /// Action results are returned untouched.
    pub fn filter_fields(self, fields: &[String]) -> Self {
        if fields.is_empty() {
            return self;
        }
        match self {
            Response::Resource(resource) => Response::Resource(resource.filtered(fields)),
            Response::Query(mut query) => {
                query.resources = query
                    .resources
                    .into_iter()
                    .map(|r| r.filtered(fields))
                    .collect();
                Response::Query(query)
            }
            action @ Response::Action(_) => action,
        }
    }
}

impl From<ResourceResponse> for Response {
    fn from(resource: ResourceResponse) -> Self {
        Response::Resource(resource)
    }
}

impl From<ActionResponse> for Response {
    fn from(action: ActionResponse) -> Self {
        Response::Action(action)
    }
}

impl From<QueryResponse> for Response {
    fn from(query: QueryResponse) -> Self {
        Response::Query(query)
    }
}
