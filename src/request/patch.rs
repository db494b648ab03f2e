//! Patch operations carried by patch requests.
//!
//! Only the shape of each operation is validated here. Applying a patch to
//! resource content is the resource provider's business.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{ResourceError, ResourceResult};

const FIELD_OPERATION: &str = "operation";
const FIELD_FIELD: &str = "field";
const FIELD_VALUE: &str = "value";
const FIELD_FROM: &str = "from";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Increment,
    Copy,
    Move,
    Transform,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
            PatchOp::Replace => "replace",
            PatchOp::Increment => "increment",
            PatchOp::Copy => "copy",
            PatchOp::Move => "move",
            PatchOp::Transform => "transform",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchOp {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchOp::Add),
            "remove" => Ok(PatchOp::Remove),
            "replace" => Ok(PatchOp::Replace),
            "increment" => Ok(PatchOp::Increment),
            "copy" => Ok(PatchOp::Copy),
            "move" => Ok(PatchOp::Move),
            "transform" => Ok(PatchOp::Transform),
            _ => Err(invalid(format!("invalid patch operation type '{}'", s))),
        }
    }
}

fn invalid(detail: impl fmt::Display) -> ResourceError {
    ResourceError::BadRequest(format!(
        "the provided content is not a valid JSON patch: {}",
        detail
    ))
}

fn normalize_pointer(field: &str) -> String {
    if field.is_empty() || field.starts_with('/') {
        field.to_string()
    } else {
        format!("/{}", field)
    }
}

/// One validated patch operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOperation {
    op: PatchOp,
    field: String,
    value: Option<Value>,
    from: Option<String>,
}

impl PatchOperation {
    /// Build and validate an operation.
    ///
    /// `add` and `transform` need a value, `increment` a numeric one, `copy`
    /// and `move` a source pointer.
    pub fn new(
        op: PatchOp,
        field: &str,
        value: Option<Value>,
        from: Option<&str>,
    ) -> ResourceResult<Self> {
        let value = value.filter(|v| !v.is_null());
        match op {
            PatchOp::Add | PatchOp::Transform if value.is_none() => {
                return Err(invalid(format!("no value provided for {} operation", op)));
            }
            PatchOp::Increment => match &value {
                None => return Err(invalid("no value provided for increment operation")),
                Some(v) if !v.is_number() => {
                    return Err(invalid("non-numeric value provided for increment operation"))
                }
                _ => {}
            },
            PatchOp::Copy | PatchOp::Move if from.is_none() => {
                return Err(invalid(format!("no source field provided for {} operation", op)));
            }
            _ => {}
        }
        Ok(Self {
            op,
            field: normalize_pointer(field),
            value,
            from: from.map(normalize_pointer),
        })
    }

    pub fn add(field: &str, value: Value) -> ResourceResult<Self> {
        Self::new(PatchOp::Add, field, Some(value), None)
    }

    pub fn remove(field: &str) -> ResourceResult<Self> {
        Self::new(PatchOp::Remove, field, None, None)
    }

    pub fn replace(field: &str, value: Value) -> ResourceResult<Self> {
        Self::new(PatchOp::Replace, field, Some(value), None)
    }

    pub fn increment(field: &str, amount: impl Into<serde_json::Number>) -> ResourceResult<Self> {
        Self::new(PatchOp::Increment, field, Some(Value::Number(amount.into())), None)
    }

    pub fn op(&self) -> PatchOp {
        self.op
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Parse `{"operation": .., "field": .., "value": ..}`.
    pub fn from_json(json: &Value) -> ResourceResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| invalid("operation is not an object"))?;
        let op: PatchOp = object
            .get(FIELD_OPERATION)
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing 'operation'"))?
            .parse()?;
        let field = object
            .get(FIELD_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing 'field'"))?;
        let from = match object.get(FIELD_FROM) {
            None | Some(Value::Null) => None,
            Some(Value::String(from)) => Some(from.as_str()),
            Some(_) => return Err(invalid("'from' must be a string")),
        };
        Self::new(op, field, object.get(FIELD_VALUE).cloned(), from)
    }

    /// Parse a JSON array of operations.
    pub fn list_from_json(json: &Value) -> ResourceResult<Vec<Self>> {
        json.as_array()
            .ok_or_else(|| {
                ResourceError::BadRequest(
                    "the provided content is not a JSON array of patch operations".to_string(),
                )
            })?
            .iter()
            .map(Self::from_json)
            .collect()
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert(FIELD_OPERATION.into(), Value::String(self.op.as_str().into()));
        out.insert(FIELD_FIELD.into(), Value::String(self.field.clone()));
        if let Some(from) = &self.from {
            out.insert(FIELD_FROM.into(), Value::String(from.clone()));
        }
        if let Some(value) = &self.value {
            out.insert(FIELD_VALUE.into(), value.clone());
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_operations() {
        let ops = PatchOperation::list_from_json(&json!([
            { "operation": "add", "field": "/name", "value": "bjensen" },
            { "operation": "REMOVE", "field": "email" },
            { "operation": "increment", "field": "/age", "value": 1 },
            { "operation": "move", "field": "/b", "from": "/a" }
        ]))
        .unwrap();

        assert_eq!(ops[0].op(), PatchOp::Add);
        assert_eq!(ops[1].op(), PatchOp::Remove);
        assert_eq!(ops[1].field(), "/email");
        assert_eq!(ops[2].value(), Some(&json!(1)));
        assert_eq!(ops[3].from(), Some("/a"));
    }

    #[test]
    fn test_rejects_invalid_operations() {
        for bad in [
            json!({ "operation": "add", "field": "/x" }),
            json!({ "operation": "increment", "field": "/x", "value": "one" }),
            json!({ "operation": "copy", "field": "/x" }),
            json!({ "operation": "frobnicate", "field": "/x", "value": 1 }),
            json!({ "field": "/x" }),
            json!("add"),
        ] {
            assert!(
                matches!(PatchOperation::from_json(&bad), Err(ResourceError::BadRequest(_))),
                "accepted {}",
                bad
            );
        }
        assert!(PatchOperation::list_from_json(&json!({})).is_err());
    }

    #[test]
    fn test_to_json() {
        let op = PatchOperation::replace("name", json!("x")).unwrap();
        assert_eq!(
            op.to_json(),
            json!({ "operation": "replace", "field": "/name", "value": "x" })
        );
    }
}
