//! Hierarchical resource names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ResourceError, ResourceResult};
use crate::name::encoding::{url_decode, url_encode};

/// An immutable, ordered sequence of URL-decoded path elements.
///
/// Equality, ordering and hashing are ASCII case-insensitive over the decoded
/// elements, so `Users/%30` and `users/0` name the same resource. The decoded
/// elements keep their original case and `Display` renders them
/// percent-encoded with that case preserved.
#[derive(Clone)]
pub struct ResourceName {
    elements: Arc<[String]>,
}

fn empty_elements() -> &'static Arc<[String]> {
    static EMPTY: OnceLock<Arc<[String]>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::from(Vec::<String>::new()))
}

impl ResourceName {
    /// The shared zero-element name.
    pub fn empty() -> Self {
        Self {
            elements: empty_elements().clone(),
        }
    }

    fn from_vec(elements: Vec<String>) -> Self {
        if elements.is_empty() {
            Self::empty()
        } else {
            Self {
                elements: Arc::from(elements),
            }
        }
    }

    /// Parse a URL-encoded path such as `/users/hello%20world/`.
    ///
    /// One leading and one trailing `/` are ignored. Empty interior elements
    /// (`a//b`, `//a`, `a//`) and bad percent escapes are rejected.
    pub fn parse(path: &str) -> ResourceResult<Self> {
        let mut trimmed = path;
        if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        }
        if let Some(rest) = trimmed.strip_suffix('/') {
            trimmed = rest;
        }
        if trimmed.is_empty() {
            if path.len() > 1 {
                // "//" trims to nothing but still holds an empty element.
                return Err(ResourceError::MalformedName(format!(
                    "'{}' contains empty path elements",
                    path
                )));
            }
            return Ok(Self::empty());
        }

        let mut elements = Vec::new();
        for raw in trimmed.split('/') {
            if raw.is_empty() {
                return Err(ResourceError::MalformedName(format!(
                    "'{}' contains empty path elements",
                    path
                )));
            }
            elements.push(url_decode(raw)?);
        }
        Ok(Self::from_vec(elements))
    }

    /// Build a name from already-decoded elements.
    ///
    /// A `/` inside an element is content, not a separator.
    pub fn from_elements<I, S>(elements: I) -> ResourceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let elements: Vec<String> = elements.into_iter().map(Into::into).collect();
        if elements.iter().any(|e| e.is_empty()) {
            return Err(ResourceError::MalformedName(
                "resource name elements must not be empty".to_string(),
            ));
        }
        Ok(Self::from_vec(elements))
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Decoded elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.elements.iter()
    }

    /// Decoded element at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.elements.get(index).map(String::as_str)
    }

    /// True when both names share the same backing storage.
    pub fn ptr_eq(&self, other: &ResourceName) -> bool {
        Arc::ptr_eq(&self.elements, &other.elements)
    }

    /// All elements except the last, or `None` for the empty name.
    pub fn parent(&self) -> Option<ResourceName> {
        if self.is_empty() {
            None
        } else {
            Some(self.slice(0, self.size() - 1))
        }
    }

    /// The last decoded element, or `None` for the empty name.
    pub fn leaf(&self) -> Option<&str> {
        self.elements.last().map(String::as_str)
    }

    /// Append one decoded element.
    pub fn child(&self, element: impl fmt::Display) -> ResourceResult<ResourceName> {
        let element = element.to_string();
        if element.is_empty() {
            return Err(ResourceError::MalformedName(
                "resource name elements must not be empty".to_string(),
            ));
        }
        let mut elements = self.elements.to_vec();
        elements.push(element);
        Ok(Self::from_vec(elements))
    }

    /// Append all elements of `other`.
    pub fn concat(&self, other: &ResourceName) -> ResourceName {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut elements = self.elements.to_vec();
        elements.extend(other.elements.iter().cloned());
        Self::from_vec(elements)
    }

    /// Parse `path` and append its elements.
    pub fn concat_path(&self, path: &str) -> ResourceResult<ResourceName> {
        Ok(self.concat(&ResourceName::parse(path)?))
    }

    /// The first `n` elements.
    pub fn head(&self, n: usize) -> ResourceResult<ResourceName> {
        self.sub_sequence(0, n)
    }

    /// Everything after the first `n` elements.
    pub fn tail(&self, n: usize) -> ResourceResult<ResourceName> {
        self.sub_sequence(n, self.size())
    }

    /// Elements `begin..end`, 0-based and end-exclusive.
    pub fn sub_sequence(&self, begin: usize, end: usize) -> ResourceResult<ResourceName> {
        if begin > end || end > self.size() {
            return Err(ResourceError::InvalidArgument(format!(
                "range {}..{} out of bounds for resource name of size {}",
                begin,
                end,
                self.size()
            )));
        }
        Ok(self.slice(begin, end))
    }

    fn slice(&self, begin: usize, end: usize) -> ResourceName {
        if begin == 0 && end == self.size() {
            return self.clone();
        }
        Self::from_vec(self.elements[begin..end].to_vec())
    }

    /// True when the first `prefix.size()` elements equal `prefix`'s.
    pub fn starts_with(&self, prefix: &ResourceName) -> bool {
        prefix.size() <= self.size()
            && self
                .elements
                .iter()
                .zip(prefix.elements.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// [`ResourceName::starts_with`] against a URL-encoded prefix.
    pub fn starts_with_path(&self, prefix: &str) -> ResourceResult<bool> {
        Ok(self.starts_with(&ResourceName::parse(prefix)?))
    }

    /// Canonical form: percent-encoded and case-folded.
    pub fn to_canonical_string(&self) -> String {
        self.join(true)
    }

    fn join(&self, fold_case: bool) -> String {
        let mut out = String::new();
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            out.push_str(&url_encode(element, fold_case));
        }
        out
    }
}

/// ASCII case-insensitive byte-wise comparison of two elements.
pub(crate) fn compare_element(a: &str, b: &str) -> Ordering {
    let lhs = a.bytes().map(|c| c.to_ascii_lowercase());
    let rhs = b.bytes().map(|c| c.to_ascii_lowercase());
    lhs.cmp(rhs)
}

impl Ord for ResourceName {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.elements.iter().zip(other.elements.iter()) {
            match compare_element(a, b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        // Strict prefix sorts first.
        self.size().cmp(&other.size())
    }
}

impl PartialOrd for ResourceName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ResourceName {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ResourceName {}

impl Hash for ResourceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.size());
        for element in self.elements.iter() {
            for b in element.bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
            state.write_u8(b'/');
        }
    }
}

impl Default for ResourceName {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(false))
    }
}

impl fmt::Debug for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceName({:?})", self.join(false))
    }
}

impl FromStr for ResourceName {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceName::parse(s)
    }
}

impl<'a> IntoIterator for &'a ResourceName {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for ResourceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ResourceName::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn name(s: &str) -> ResourceName {
        ResourceName::parse(s).unwrap()
    }

    fn hash_of(n: &ResourceName) -> u64 {
        let mut h = DefaultHasher::new();
        n.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_parse_rejects_empty_elements() {
        for s in [
            "//",
            "one//two",
            "//one/two",
            "one/two//",
            "one/two//three",
            "//one/two/three",
            "one/two/three//",
            "must/not/contain//empty/elements",
        ] {
            assert!(
                matches!(ResourceName::parse(s), Err(ResourceError::MalformedName(_))),
                "expected {:?} to be rejected",
                s
            );
        }
    }

    #[test]
    fn test_parse_normalizes() {
        // (encoded, normalized, decoded elements)
        let cases: Vec<(&str, &str, Vec<&str>)> = vec![
            ("", "", vec![]),
            ("/", "", vec![]),
            ("users", "users", vec!["users"]),
            ("/users/", "users", vec!["users"]),
            ("/users/1/", "users/1", vec!["users", "1"]),
            (
                "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
                "abcdefghijklmnopqrstuvwxyz",
                vec!["ABCDEFGHIJKLMNOPQRSTUVWXYZ"],
            ),
            ("-._~!$&'()*+,;=:@", "-._~!$&'()*+,;=:@", vec!["-._~!$&'()*+,;=:@"]),
            ("%21%24%30%3A%41%5A%5F%61%7A", "!$0:az_az", vec!["!$0:AZ_az"]),
            ("foo%30%41%42%43/test/", "foo0abc/test", vec!["foo0ABC", "test"]),
            ("hello+world/test%2Fuser", "hello+world/test%2Fuser", vec!["hello+world", "test/user"]),
            ("test/hello%20world/user", "test/hello%20world/user", vec!["test", "hello world", "user"]),
        ];
        for (path, normalized, elements) in cases {
            let parsed = name(path);
            assert_eq!(parsed.size(), elements.len(), "size of {:?}", path);
            let decoded: Vec<&str> = parsed.iter().map(String::as_str).collect();
            assert_eq!(decoded, elements);
            assert_eq!(parsed, name(normalized));
            assert_eq!(parsed, ResourceName::from_elements(elements).unwrap());
        }
    }

    #[test]
    fn test_unsafe_characters_are_encoded() {
        let n = name("\u{0}\u{1f} \"#<>?[\\]^`{|}\u{7f}\u{80}\u{ff}\u{10000}");
        assert_eq!(
            n.to_string(),
            "%00%1F%20%22%23%3C%3E%3F%5B%5C%5D%5E%60%7B%7C%7D%7F%C2%80%C3%BF%F0%90%80%80"
        );
    }

    #[test]
    fn test_empty_is_shared() {
        assert!(name("").ptr_eq(&ResourceName::empty()));
        assert!(name("/").ptr_eq(&ResourceName::empty()));
        assert!(name("a").head(0).unwrap().ptr_eq(&ResourceName::empty()));
    }

    #[test]
    fn test_parent() {
        assert!(name("").parent().is_none());
        assert_eq!(name("users").parent().unwrap().to_string(), "");
        assert_eq!(name("users/1").parent().unwrap().to_string(), "users");
        assert_eq!(
            name("hello+world/test%2Fuser").parent().unwrap().to_string(),
            "hello+world"
        );
    }

    #[test]
    fn test_child_and_leaf() {
        assert_eq!(name("").child(123).unwrap().to_string(), "123");
        assert_eq!(name("users").child("BJENSEN").unwrap().to_string(), "users/BJENSEN");
        let child = name("users").child("hello /+world").unwrap();
        assert_eq!(child.to_string(), "users/hello%20%2F+world");
        assert_eq!(child.leaf(), Some("hello /+world"));
        assert!(name("users").child("").is_err());
    }

    #[test]
    fn test_compare() {
        let cases = [
            ("", "", Ordering::Equal),
            ("users", "", Ordering::Greater),
            ("", "users", Ordering::Less),
            ("users/1", "users", Ordering::Greater),
            ("users", "users/1", Ordering::Less),
            ("users/1", "users/2", Ordering::Less),
            ("Users/%30", "users/0", Ordering::Equal),
            ("Users/this th%41t", "users/this%20That", Ordering::Equal),
            ("Users/this+that", "users/this That", Ordering::Greater),
            ("Users/this+that", "users/this+That", Ordering::Equal),
        ];
        for (a, b, expected) in cases {
            assert_eq!(name(a).cmp(&name(b)), expected, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_equality_and_hash_ignore_case() {
        let a = name("hello/world");
        let b = name("HELLO/WORLD");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.to_canonical_string(), b.to_canonical_string());
    }

    #[test]
    fn test_concat() {
        assert_eq!(name("a/b").concat(&name("c/d")).to_string(), "a/b/c/d");
        assert_eq!(name("").concat_path("c/d").unwrap().to_string(), "c/d");
        assert_eq!(name("a/b").concat_path("").unwrap().to_string(), "a/b");
    }

    #[test]
    fn test_slicing() {
        let n = name("one/TWO/three");
        assert_eq!(n.sub_sequence(0, 2).unwrap(), name("one/two"));
        assert_eq!(n.sub_sequence(1, 3).unwrap(), name("two/three"));
        assert_eq!(n.sub_sequence(3, 3).unwrap().size(), 0);
        assert!(n.sub_sequence(2, 4).is_err());
        assert!(n.sub_sequence(2, 1).is_err());

        let n = name("ONE/TWO/THREE/FOUR");
        assert_eq!(n.head(2).unwrap(), name("ONE/two"));
        assert_eq!(n.tail(2).unwrap(), name("THREE/four"));
        assert!(n.head(5).is_err());
    }

    #[test]
    fn test_starts_with() {
        let cases = [
            ("", "", true),
            ("one", "", true),
            ("one", "on", false),
            ("one/two", "one", true),
            ("one/two", "one/tw", false),
            ("one/two/three", "ONE/two", true),
            ("one/two/three", "one/two/threee", false),
            ("one/two/three", "one/two/three/four", false),
        ];
        for (n, prefix, expected) in cases {
            assert_eq!(name(n).starts_with_path(prefix).unwrap(), expected, "{:?} {:?}", n, prefix);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let n = name("users/hello%20world");
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"users/hello%20world\"");
        let back: ResourceName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }
}
