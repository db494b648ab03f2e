//! Step-by-step construction of [`Request`] values.
//!
//! Setters never fail. The first problem is remembered and reported by
//! [`RequestBuilder::build`], so a half-built request is never observable.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ResourceError, ResourceResult};
use crate::name::ResourceName;
use crate::request::model::{CountPolicy, QueryParams, Request, RequestKind, SortKey};
use crate::request::patch::PatchOperation;

/// Parameter that stays available to action requests.
const MIME_TYPE_PARAMETER: &str = "_mimeType";

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    resource_name: ResourceName,
    fields: Vec<String>,
    additional_parameters: BTreeMap<String, String>,
    kind: RequestKind,
    error: Option<ResourceError>,
}

impl Request {
    pub fn create(resource_name: ResourceName, content: Value) -> RequestBuilder {
        RequestBuilder::new(
            resource_name,
            RequestKind::Create {
                content,
                new_resource_id: None,
            },
        )
    }

    pub fn read(resource_name: ResourceName) -> RequestBuilder {
        RequestBuilder::new(resource_name, RequestKind::Read)
    }

    pub fn update(resource_name: ResourceName, content: Value) -> RequestBuilder {
        RequestBuilder::new(
            resource_name,
            RequestKind::Update {
                content,
                revision: None,
            },
        )
    }

    pub fn delete(resource_name: ResourceName) -> RequestBuilder {
        RequestBuilder::new(resource_name, RequestKind::Delete { revision: None })
    }

    pub fn patch(resource_name: ResourceName, operations: Vec<PatchOperation>) -> RequestBuilder {
        RequestBuilder::new(
            resource_name,
            RequestKind::Patch {
                operations,
                revision: None,
            },
        )
    }

    pub fn action(resource_name: ResourceName, action: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(
            resource_name,
            RequestKind::Action {
                action: action.into(),
                content: Value::Null,
            },
        )
    }

    pub fn query(resource_name: ResourceName) -> RequestBuilder {
        RequestBuilder::new(resource_name, RequestKind::Query(QueryParams::default()))
    }
}

impl RequestBuilder {
    fn new(resource_name: ResourceName, kind: RequestKind) -> Self {
        Self {
            resource_name,
            fields: Vec::new(),
            additional_parameters: BTreeMap::new(),
            kind,
            error: None,
        }
    }

    fn fail(&mut self, error: ResourceError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn not_applicable(&mut self, setting: &str) {
        let error = ResourceError::InvalidArgument(format!(
            "{} does not apply to {} requests",
            setting,
            self.kind.request_type()
        ));
        self.fail(error);
    }

    fn is_reserved(&self, name: &str) -> bool {
        match self.kind {
            RequestKind::Action { .. } => name == MIME_TYPE_PARAMETER,
            _ => name.starts_with('_'),
        }
    }

    fn query_mut(&mut self, setting: &str) -> Option<&mut QueryParams> {
        if !matches!(self.kind, RequestKind::Query(_)) {
            self.not_applicable(setting);
            return None;
        }
        match &mut self.kind {
            RequestKind::Query(query) => Some(query),
            _ => None,
        }
    }

    /// Add a field to return, as a JSON pointer (`name` becomes `/name`).
    pub fn field(mut self, field: &str) -> Self {
        let pointer = if field.is_empty() || field.starts_with('/') {
            field.to_string()
        } else {
            format!("/{}", field)
        };
        self.fields.push(pointer);
        self
    }

    pub fn fields<'a>(self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        fields.into_iter().fold(self, Self::field)
    }

    /// Set a non-protocol parameter.
    ///
    /// Names starting with `_` belong to the protocol and are refused, except
    /// on actions where only `_mimeType` is held back.
    pub fn additional_parameter(mut self, name: &str, value: &str) -> Self {
        if self.is_reserved(name) {
            self.fail(ResourceError::BadRequest(format!(
                "unrecognized request parameter '{}'",
                name
            )));
        } else {
            self.additional_parameters
                .insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn revision(mut self, rev: impl Into<String>) -> Self {
        match &mut self.kind {
            RequestKind::Update { revision, .. }
            | RequestKind::Delete { revision }
            | RequestKind::Patch { revision, .. } => *revision = Some(rev.into()),
            _ => self.not_applicable("revision"),
        }
        self
    }

    pub fn new_resource_id(mut self, id: impl Into<String>) -> Self {
        match &mut self.kind {
            RequestKind::Create {
                new_resource_id, ..
            } => *new_resource_id = Some(id.into()),
            _ => self.not_applicable("new resource id"),
        }
        self
    }

    pub fn content(mut self, value: Value) -> Self {
        match &mut self.kind {
            RequestKind::Create { content, .. }
            | RequestKind::Update { content, .. }
            | RequestKind::Action { content, .. } => *content = value,
            _ => self.not_applicable("content"),
        }
        self
    }

    pub fn query_filter(mut self, filter: impl Into<String>) -> Self {
        if let Some(query) = self.query_mut("query filter") {
            query.query_filter = Some(filter.into());
        }
        self
    }

    pub fn query_id(mut self, id: impl Into<String>) -> Self {
        if let Some(query) = self.query_mut("query id") {
            query.query_id = Some(id.into());
        }
        self
    }

    pub fn query_expression(mut self, expression: impl Into<String>) -> Self {
        if let Some(query) = self.query_mut("query expression") {
            query.query_expression = Some(expression.into());
        }
        self
    }

    pub fn sort_key(mut self, key: SortKey) -> Self {
        if let Some(query) = self.query_mut("sort key") {
            query.sort_keys.push(key);
        }
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        if let Some(query) = self.query_mut("page size") {
            query.page_size = size;
        }
        self
    }

    pub fn paged_results_offset(mut self, offset: u32) -> Self {
        if let Some(query) = self.query_mut("paged results offset") {
            query.paged_results_offset = offset;
        }
        self
    }

    pub fn paged_results_cookie(mut self, cookie: impl Into<String>) -> Self {
        if let Some(query) = self.query_mut("paged results cookie") {
            query.paged_results_cookie = Some(cookie.into());
        }
        self
    }

    pub fn total_paged_results_policy(mut self, policy: CountPolicy) -> Self {
        if let Some(query) = self.query_mut("total paged results policy") {
            query.total_paged_results_policy = policy;
        }
        self
    }

    /// Finish the request, reporting the first problem seen while building.
    pub fn build(self) -> ResourceResult<Request> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match &self.kind {
            RequestKind::Query(query) if query.selector_count() == 0 => {
                return Err(ResourceError::BadRequest(
                    "a query needs a query filter, query id or query expression".to_string(),
                ));
            }
            RequestKind::Query(query) if query.selector_count() > 1 => {
                return Err(ResourceError::BadRequest(
                    "a query takes only one of query filter, query id or query expression"
                        .to_string(),
                ));
            }
            RequestKind::Action { action, .. } if action.is_empty() => {
                return Err(ResourceError::BadRequest(
                    "an action request needs an action name".to_string(),
                ));
            }
            _ => {}
        }
        Ok(Request {
            resource_name: self.resource_name,
            fields: self.fields,
            additional_parameters: self.additional_parameters,
            kind: self.kind,
        })
    }
}
