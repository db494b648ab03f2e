//! In-memory collection backing configured mounts.

use std::cmp::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::Context;
use crate::error::{ResourceError, ResourceResult};
use crate::request::handler::ready;
use crate::request::{
    ActionResponse, CountPolicy, PatchOp, PatchOperation, QueryParams, QueryResponse, Request,
    RequestKind, ResourceResponse, Response, ResponseFuture, SortKey,
};
use crate::resources::collection::CollectionProvider;

/// Filter accepted by [`MemoryCollection`] queries: everything.
pub const QUERY_FILTER_ALL: &str = "true";
/// Query id accepted by [`MemoryCollection`] queries: ids only.
pub const QUERY_ID_ALL_IDS: &str = "query-all-ids";

/// Revision wildcard matching any current revision.
const ANY_REVISION: &str = "*";

#[derive(Debug, Clone)]
struct StoredResource {
    /// Id as the creator spelled it.
    id: String,
    revision: u64,
    content: Value,
}

impl StoredResource {
    fn response(&self) -> ResourceResponse {
        ResourceResponse::new(
            Some(self.id.clone()),
            Some(self.revision.to_string()),
            self.content.clone(),
        )
    }

    fn check_revision(&self, expected: Option<&str>) -> ResourceResult<()> {
        match expected {
            None | Some(ANY_REVISION) => Ok(()),
            Some(rev) if rev == self.revision.to_string() => Ok(()),
            Some(rev) => Err(ResourceError::PreconditionFailed(format!(
                "resource '{}' is at revision {}, not {}",
                self.id, self.revision, rev
            ))),
        }
    }
}

/// Ids compare like resource name elements: ASCII case folded.
fn key(id: &str) -> String {
    id.to_ascii_lowercase()
}

/// A thread-safe collection held entirely in memory.
///
/// Revisions start at `0` and increase by one on every change. Ids are
/// matched ignoring ASCII case but reported as created. Queries support the
/// `true` filter and the `query-all-ids` query id.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    name: String,
    inner: Arc<DashMap<String, StoredResource>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn missing(&self, id: &str) -> ResourceError {
        ResourceError::NotFound(format!("resource '{}' not found in '{}'", id, self.name))
    }

    fn create(&self, request: &Request) -> ResourceResult<Response> {
        let RequestKind::Create {
            content,
            new_resource_id,
        } = request.kind()
        else {
            return Err(ResourceError::Internal("expected a create request".into()));
        };
        let id = new_resource_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match self.inner.entry(key(&id)) {
            Entry::Occupied(_) => Err(ResourceError::Conflict(format!(
                "resource '{}' already exists in '{}'",
                id, self.name
            ))),
            Entry::Vacant(slot) => {
                let stored = StoredResource {
                    id: id.clone(),
                    revision: 0,
                    content: content.clone(),
                };
                let response = stored.response();
                slot.insert(stored);
                tracing::debug!(collection = %self.name, id = %id, "Resource created");
                Ok(response.into())
            }
        }
    }

    fn read(&self, id: &str) -> ResourceResult<Response> {
        self.inner
            .get(&key(id))
            .map(|stored| stored.response().into())
            .ok_or_else(|| self.missing(id))
    }

    fn update(&self, id: &str, request: &Request) -> ResourceResult<Response> {
        let RequestKind::Update { content, .. } = request.kind() else {
            return Err(ResourceError::Internal("expected an update request".into()));
        };
        let mut stored = self.inner.get_mut(&key(id)).ok_or_else(|| self.missing(id))?;
        stored.check_revision(request.revision())?;
        stored.revision += 1;
        stored.content = content.clone();
        Ok(stored.response().into())
    }

    fn delete(&self, id: &str, request: &Request) -> ResourceResult<Response> {
        match self.inner.entry(key(id)) {
            Entry::Vacant(_) => Err(self.missing(id)),
            Entry::Occupied(slot) => {
                slot.get().check_revision(request.revision())?;
                let (_, stored) = slot.remove_entry();
                tracing::debug!(collection = %self.name, id = %stored.id, "Resource deleted");
                Ok(stored.response().into())
            }
        }
    }

    fn patch(&self, id: &str, request: &Request) -> ResourceResult<Response> {
        let RequestKind::Patch { operations, .. } = request.kind() else {
            return Err(ResourceError::Internal("expected a patch request".into()));
        };
        let mut stored = self.inner.get_mut(&key(id)).ok_or_else(|| self.missing(id))?;
        stored.check_revision(request.revision())?;

        let mut content = stored.content.clone();
        for operation in operations {
            apply(&mut content, operation)?;
        }
        stored.content = content;
        stored.revision += 1;
        Ok(stored.response().into())
    }

    fn count(&self) -> ResourceResult<Response> {
        Ok(ActionResponse::new(json!({ "count": self.inner.len() })).into())
    }

    fn query(&self, query: &QueryParams) -> ResourceResult<Response> {
        let ids_only = match (&query.query_filter, &query.query_id) {
            (Some(filter), _) if filter == QUERY_FILTER_ALL => false,
            (_, Some(id)) if id == QUERY_ID_ALL_IDS => true,
            _ => {
                return Err(ResourceError::NotSupported(format!(
                    "collection '{}' only supports the '{}' filter and the '{}' query id",
                    self.name, QUERY_FILTER_ALL, QUERY_ID_ALL_IDS
                )))
            }
        };

        let mut all: Vec<ResourceResponse> = self
            .inner
            .iter()
            .map(|entry| {
                let mut response = entry.value().response();
                if ids_only {
                    response.content = json!({});
                }
                response
            })
            .collect();
        all.sort_by(|a, b| compare_by_keys(a, b, &query.sort_keys));

        let total = all.len();
        let offset = match &query.paged_results_cookie {
            Some(cookie) => cookie.parse::<usize>().map_err(|_| {
                ResourceError::BadRequest(format!("invalid paged results cookie '{}'", cookie))
            })?,
            None => query.paged_results_offset as usize,
        };

        let mut page = QueryResponse::new(Vec::new());
        if query.page_size > 0 {
            let end = offset.saturating_add(query.page_size as usize).min(total);
            page.resources = all.into_iter().skip(offset).take(end.saturating_sub(offset)).collect();
            if end < total {
                page.paged_results_cookie = Some(end.to_string());
            }
        } else {
            page.resources = all.into_iter().skip(offset).collect();
        }
        if query.total_paged_results_policy != CountPolicy::None {
            page.total_paged_results_policy = query.total_paged_results_policy;
            page.total_paged_results = total as i64;
        }
        Ok(page.into())
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn compare_by_keys(a: &ResourceResponse, b: &ResourceResponse, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let pointer = if key.field.starts_with('/') {
            key.field.clone()
        } else {
            format!("/{}", key.field)
        };
        let order = compare_values(a.content.pointer(&pointer), b.content.pointer(&pointer));
        let order = if key.ascending { order } else { order.reverse() };
        if order.is_ne() {
            return order;
        }
    }
    a.id.cmp(&b.id)
}

fn split_pointer(pointer: &str) -> ResourceResult<(String, String)> {
    let (parent, last) = pointer.rsplit_once('/').ok_or_else(|| {
        ResourceError::BadRequest(format!("cannot patch the whole resource via '{}'", pointer))
    })?;
    Ok((parent.to_string(), last.replace("~1", "/").replace("~0", "~")))
}

/// Apply one operation to `content`. `copy`, `move` and `transform` are
/// not implemented by the in-memory store.
fn apply(content: &mut Value, operation: &PatchOperation) -> ResourceResult<()> {
    let (parent_pointer, key) = split_pointer(operation.field())?;
    let parent = content.pointer_mut(&parent_pointer).ok_or_else(|| {
        ResourceError::BadRequest(format!("no such field '{}'", parent_pointer))
    })?;
    let value = operation.value().cloned().unwrap_or(Value::Null);

    match (operation.op(), parent) {
        (PatchOp::Add, Value::Object(map)) => {
            let appends = !value.is_array() && matches!(map.get(&key), Some(Value::Array(_)));
            if !appends {
                map.insert(key, value);
            } else if let Some(Value::Array(items)) = map.get_mut(&key) {
                items.push(value);
            }
        }
        (PatchOp::Add, Value::Array(items)) if key == "-" => items.push(value),
        (PatchOp::Replace, Value::Object(map)) => {
            if value.is_null() {
                map.remove(&key);
            } else {
                map.insert(key, value);
            }
        }
        (PatchOp::Remove, Value::Object(map)) => {
            map.remove(&key);
        }
        (PatchOp::Remove, Value::Array(items)) => {
            let index: usize = key.parse().map_err(|_| {
                ResourceError::BadRequest(format!("'{}' is not an array index", key))
            })?;
            if index < items.len() {
                items.remove(index);
            }
        }
        (PatchOp::Increment, Value::Object(map)) => {
            let current = map.get(&key).and_then(Value::as_f64).unwrap_or_default();
            let amount = value.as_f64().unwrap_or_default();
            let sum = current + amount;
            let next = if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
                json!(sum as i64)
            } else {
                json!(sum)
            };
            map.insert(key, next);
        }
        (op @ (PatchOp::Copy | PatchOp::Move | PatchOp::Transform), _) => {
            return Err(ResourceError::NotSupported(format!(
                "patch operation '{}' is not supported by in-memory collections",
                op
            )));
        }
        (op, _) => {
            return Err(ResourceError::BadRequest(format!(
                "cannot apply '{}' to '{}'",
                op,
                operation.field()
            )));
        }
    }
    Ok(())
}

impl CollectionProvider for MemoryCollection {
    fn create_instance(&self, _context: Context, request: Request) -> ResponseFuture {
        ready(self.create(&request))
    }

    fn read_instance(&self, _context: Context, id: String, _request: Request) -> ResponseFuture {
        ready(self.read(&id))
    }

    fn update_instance(&self, _context: Context, id: String, request: Request) -> ResponseFuture {
        ready(self.update(&id, &request))
    }

    fn delete_instance(&self, _context: Context, id: String, request: Request) -> ResponseFuture {
        ready(self.delete(&id, &request))
    }

    fn patch_instance(&self, _context: Context, id: String, request: Request) -> ResponseFuture {
        ready(self.patch(&id, &request))
    }

    fn action_collection(&self, _context: Context, request: Request) -> ResponseFuture {
        match request.kind() {
            RequestKind::Action { action, .. } if action == "count" => ready(self.count()),
            RequestKind::Action { action, .. } => ready(Err(ResourceError::NotSupported(
                format!("action '{}' is not supported by '{}'", action, self.name),
            ))),
            _ => ready(Err(ResourceError::Internal("expected an action request".into()))),
        }
    }

    fn query_collection(&self, _context: Context, request: Request) -> ResponseFuture {
        match request.kind() {
            RequestKind::Query(query) => ready(self.query(query)),
            _ => ready(Err(ResourceError::Internal("expected a query request".into()))),
        }
    }
}
