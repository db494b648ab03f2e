//! Advice accumulated while a request is processed.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde_json::{json, Value};

use crate::error::{ResourceError, ResourceResult};

/// Name → ordered values, surfaced to the caller next to the response.
///
/// Values are only ever appended, and only by whoever owns the frame: with
/// `&mut` before it joins a chain, then through [`Context::put_advice`] on
/// the context whose own frame it is. Descendants can read it but not write.
///
/// [`Context::put_advice`]: crate::context::Context::put_advice
#[derive(Debug, Default)]
pub struct AdviceFrame {
    restricted_names: Vec<String>,
    advices: DashMap<String, Vec<String>>,
}

/// Printable ASCII only: 0x20..=0x7E.
fn is_legal(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

impl AdviceFrame {
    /// Create an empty advice frame refusing the given names.
    pub fn new<I, S>(restricted_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            restricted_names: restricted_names.into_iter().map(Into::into).collect(),
            advices: DashMap::new(),
        }
    }

    /// Append `value` to the list kept under `name`.
    pub fn put_advice(&mut self, name: &str, value: &str) -> ResourceResult<()> {
        self.append(name, value)
    }

    /// Append several values under one name, stopping at the first rejection.
    pub fn put_advices<'a>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = &'a str>,
    ) -> ResourceResult<()> {
        for value in values {
            self.append(name, value)?;
        }
        Ok(())
    }

    /// Shared-reference append for the context that owns this frame.
    pub(crate) fn append(&self, name: &str, value: &str) -> ResourceResult<()> {
        if self.is_restricted(name) {
            return Err(ResourceError::InvalidArgument(format!(
                "'{}' is a restricted advice name",
                name
            )));
        }
        if !is_legal(name) || !is_legal(value) {
            return Err(ResourceError::InvalidArgument(format!(
                "advice '{}' contains illegal characters",
                name.escape_debug()
            )));
        }
        self.advices
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    pub fn is_restricted(&self, name: &str) -> bool {
        self.restricted_names
            .iter()
            .any(|r| r.eq_ignore_ascii_case(name))
    }

    pub fn restricted_names(&self) -> &[String] {
        &self.restricted_names
    }

    /// Snapshot of all advice, ordered by name.
    pub fn advices(&self) -> BTreeMap<String, Vec<String>> {
        self.advices
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.advices.is_empty()
    }

    pub(crate) fn to_payload(&self) -> Value {
        json!({
            "advices": self.advices(),
            "restrictedAdviceNames": self.restricted_names,
        })
    }

    pub(crate) fn from_payload(payload: &Value) -> ResourceResult<Self> {
        let invalid = |what: &str| {
            ResourceError::ContextRestore(format!("advice payload has invalid {}", what))
        };

        let restricted: Vec<String> = match payload.get("restrictedAdviceNames") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|_| invalid("restrictedAdviceNames"))?,
        };
        let advices: BTreeMap<String, Vec<String>> = match payload.get("advices") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(v) => serde_json::from_value(v.clone()).map_err(|_| invalid("advices"))?,
        };

        let frame = AdviceFrame::new(restricted);
        for (name, values) in advices {
            frame.advices.insert(name, values);
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restricted_name_rejected() {
        let mut frame = AdviceFrame::new(["Content-Type"]);
        let err = frame.put_advice("Content-Type", "VALUE").unwrap_err();
        assert!(err.to_string().contains("restricted advice name"));
        assert!(frame.put_advice("content-type", "VALUE").is_err());
        assert!(frame.is_empty());
    }

    #[test]
    fn test_legal_characters_accepted() {
        let mut frame = AdviceFrame::new(Vec::<String>::new());
        for c in 0x20u8..=0x7e {
            let value = (c as char).to_string();
            frame.put_advice("ADVICE_NAME", &value).unwrap();
        }
        assert_eq!(frame.advices()["ADVICE_NAME"].len(), 95);
    }

    #[test]
    fn test_illegal_characters_rejected() {
        let mut frame = AdviceFrame::new(Vec::<String>::new());
        for c in (0u8..0x20).chain(std::iter::once(0x7f)) {
            let value = (c as char).to_string();
            let err = frame.put_advice("ADVICE_NAME", &value).unwrap_err();
            assert!(matches!(err, ResourceError::InvalidArgument(_)));
            assert!(err.to_string().contains("illegal characters"));
        }
        assert!(frame.put_advice("BAD\u{7f}", "ok").is_err());
        assert!(frame.put_advice("X", "caf\u{e9}").is_err());
    }

    #[test]
    fn test_values_are_ordered_and_non_unique() {
        let mut frame = AdviceFrame::new(Vec::<String>::new());
        frame.put_advices("Warning", ["a", "b", "a"]).unwrap();
        assert_eq!(frame.advices()["Warning"], vec!["a", "b", "a"]);
    }

    #[test]
    fn test_payload_round_trip() {
        let mut frame = AdviceFrame::new(["Content-Type"]);
        frame.put_advice("Warning", "version_is_not_supported").unwrap();
        let restored = AdviceFrame::from_payload(&frame.to_payload()).unwrap();
        assert_eq!(restored.advices(), frame.advices());
        assert!(restored.is_restricted("Content-Type"));
    }
}
