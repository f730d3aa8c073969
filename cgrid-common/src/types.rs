//! # Domain Value Objects
//!
//! Purpose: Give callers byte-oriented value types for keys, cells,
//! mutations, and scan ranges without exposing any wire detail.
//!
//! ## Design Principles
//! 1. **Bytes First**: Rows, columns, and labels are raw bytes; `&str`
//!    arguments are accepted anywhere via `Into<Vec<u8>>`.
//! 2. **Builder-Friendly**: Optional components are chainable setters so a
//!    call site reads like the cell it describes.
//! 3. **No Wire Knowledge**: Conversion to wire structs lives in [`crate::wire`];
//!    these types never serialize themselves.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::collections::btree_set;
use std::fmt;

use bincode::{Decode, Encode};

/// A cell key or range boundary. Only the row is required; unset
/// components leave the boundary open in that dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub row: Vec<u8>,
    pub family: Option<Vec<u8>>,
    pub qualifier: Option<Vec<u8>>,
    pub visibility: Option<Vec<u8>>,
    pub timestamp: Option<i64>,
}

impl Key {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Key {
            row: row.into(),
            family: None,
            qualifier: None,
            visibility: None,
            timestamp: None,
        }
    }

    pub fn family(mut self, family: impl Into<Vec<u8>>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<Vec<u8>>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn visibility(mut self, visibility: impl Into<Vec<u8>>) -> Self {
        self.visibility = Some(visibility.into());
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A cell returned by a scan.
///
/// Accessors come in byte and lossy-UTF-8 flavors; the store itself is
/// typeless, so decoding is always the caller's call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    row: Vec<u8>,
    family: Vec<u8>,
    qualifier: Vec<u8>,
    visibility: Vec<u8>,
    timestamp: i64,
    value: Vec<u8>,
}

impl KeyValue {
    pub fn new(
        row: Vec<u8>,
        family: Vec<u8>,
        qualifier: Vec<u8>,
        visibility: Vec<u8>,
        timestamp: i64,
        value: Vec<u8>,
    ) -> Self {
        KeyValue {
            row,
            family,
            qualifier,
            visibility,
            timestamp,
            value,
        }
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn row_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.row)
    }

    pub fn family(&self) -> &[u8] {
        &self.family
    }

    pub fn family_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.family)
    }

    pub fn qualifier(&self) -> &[u8] {
        &self.qualifier
    }

    pub fn qualifier_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.qualifier)
    }

    pub fn visibility(&self) -> &[u8] {
        &self.visibility
    }

    pub fn visibility_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.visibility)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn value_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// One column update aimed at one row.
///
/// A mutation with `delete` set removes the addressed column instead of
/// writing `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub visibility: Vec<u8>,
    pub timestamp: Option<i64>,
    pub value: Vec<u8>,
    pub delete: bool,
}

impl Mutation {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Mutation {
            row: row.into(),
            family: Vec::new(),
            qualifier: Vec::new(),
            visibility: Vec::new(),
            timestamp: None,
            value: Vec::new(),
            delete: false,
        }
    }

    pub fn family(mut self, family: impl Into<Vec<u8>>) -> Self {
        self.family = family.into();
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<Vec<u8>>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    pub fn visibility(mut self, visibility: impl Into<Vec<u8>>) -> Self {
        self.visibility = visibility.into();
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }

    /// Marks this mutation as a column delete.
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }
}

/// A scan range over keys. Start defaults to inclusive, end to exclusive,
/// and a `None` boundary is open-ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub start: Option<Key>,
    pub start_inclusive: bool,
    pub end: Option<Key>,
    pub end_inclusive: bool,
}

impl Default for Range {
    fn default() -> Self {
        Range {
            start: None,
            start_inclusive: true,
            end: None,
            end_inclusive: false,
        }
    }
}

impl Range {
    pub fn new(start: Option<Key>, end: Option<Key>) -> Self {
        Range {
            start,
            end,
            ..Range::default()
        }
    }

    /// Range matching exactly one row, family, or column: the end key is
    /// the last given component followed by a `0x00` byte, exclusive.
    pub fn exact(
        row: impl Into<Vec<u8>>,
        family: Option<&[u8]>,
        qualifier: Option<&[u8]>,
    ) -> Self {
        let row = row.into();
        let (start, end) = match (family, qualifier) {
            (family, Some(qualifier)) => (
                key_with(&row, family, Some(qualifier)),
                key_with(&row, family, Some(&appended(qualifier, 0x00))),
            ),
            (Some(family), None) => (
                key_with(&row, Some(family), None),
                key_with(&row, Some(&appended(family, 0x00)), None),
            ),
            (None, None) => (Key::new(row.clone()), Key::new(appended(&row, 0x00))),
        };
        Range::new(Some(start), Some(end))
    }

    /// Range matching everything prefixed by the last given component: the
    /// end key appends a `0xff` byte and is inclusive.
    pub fn prefix(
        row: impl Into<Vec<u8>>,
        family: Option<&[u8]>,
        qualifier: Option<&[u8]>,
    ) -> Self {
        let row = row.into();
        let (start, end) = match (family, qualifier) {
            (family, Some(qualifier)) => (
                key_with(&row, family, Some(qualifier)),
                key_with(&row, family, Some(&appended(qualifier, 0xff))),
            ),
            (Some(family), None) => (
                key_with(&row, Some(family), None),
                key_with(&row, Some(&appended(family, 0xff)), None),
            ),
            (None, None) => (Key::new(row.clone()), Key::new(appended(&row, 0xff))),
        };
        Range {
            end_inclusive: true,
            ..Range::new(Some(start), Some(end))
        }
    }
}

fn key_with(row: &[u8], family: Option<&[u8]>, qualifier: Option<&[u8]>) -> Key {
    let mut key = Key::new(row.to_vec());
    if let Some(family) = family {
        key = key.family(family.to_vec());
    }
    if let Some(qualifier) = qualifier {
        key = key.qualifier(qualifier.to_vec());
    }
    key
}

fn appended(base: &[u8], suffix: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(base.len() + 1);
    out.extend_from_slice(base);
    out.push(suffix);
    out
}

/// Column selector for a scan: a family, optionally narrowed to one
/// qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanColumn {
    pub family: Vec<u8>,
    pub qualifier: Option<Vec<u8>>,
}

impl ScanColumn {
    pub fn new(family: impl Into<Vec<u8>>) -> Self {
        ScanColumn {
            family: family.into(),
            qualifier: None,
        }
    }

    pub fn qualifier(mut self, qualifier: impl Into<Vec<u8>>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

/// Server-side iterator attached to a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratorSetting {
    pub priority: i32,
    pub name: String,
    pub iterator_class: String,
    pub properties: std::collections::HashMap<String, String>,
}

impl IteratorSetting {
    pub fn new(priority: i32, name: impl Into<String>, iterator_class: impl Into<String>) -> Self {
        IteratorSetting {
            priority,
            name: name.into(),
            iterator_class: iterator_class.into(),
            properties: std::collections::HashMap::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A set of authorization labels. Labels are raw bytes; string input is
/// encoded on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationSet {
    labels: BTreeSet<Vec<u8>>,
}

impl AuthorizationSet {
    pub fn new() -> Self {
        AuthorizationSet::default()
    }

    pub fn insert(&mut self, label: impl Into<Vec<u8>>) -> bool {
        self.labels.insert(label.into())
    }

    pub fn contains(&self, label: impl AsRef<[u8]>) -> bool {
        self.labels.contains(label.as_ref())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Vec<u8>> {
        self.labels.iter()
    }

    /// Labels in wire form.
    pub fn to_vec(&self) -> Vec<Vec<u8>> {
        self.labels.iter().cloned().collect()
    }
}

impl<T: Into<Vec<u8>>> FromIterator<T> for AuthorizationSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        AuthorizationSet {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl IntoIterator for AuthorizationSet {
    type Item = Vec<u8>;
    type IntoIter = btree_set::IntoIter<Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.into_iter()
    }
}

/// Table time semantics: server-assigned wall-clock milliseconds or
/// logical counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub enum TimeType {
    Logical,
    #[default]
    Millis,
}

/// Durability level the server applies to a writer's mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Durability {
    Default,
    None,
    Log,
    Flush,
    Sync,
}

/// Opaque id naming server-side scanner or writer state. Two live
/// resources never share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        ResourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_defaults_and_builder() {
        let mutation = Mutation::new("row");
        assert_eq!(mutation.row, b"row");
        assert_eq!(mutation.family, b"");
        assert_eq!(mutation.qualifier, b"");
        assert_eq!(mutation.visibility, b"");
        assert_eq!(mutation.timestamp, None);
        assert_eq!(mutation.value, b"");
        assert!(!mutation.delete);

        let mutation = Mutation::new("r")
            .family("cf")
            .qualifier("cq")
            .visibility("v")
            .timestamp(123)
            .value("V")
            .delete();
        assert_eq!(mutation.family, b"cf");
        assert_eq!(mutation.qualifier, b"cq");
        assert_eq!(mutation.visibility, b"v");
        assert_eq!(mutation.timestamp, Some(123));
        assert_eq!(mutation.value, b"V");
        assert!(mutation.delete);
    }

    #[test]
    fn key_builder() {
        let key = Key::new("r").family("cf").visibility("v");
        assert_eq!(key.row, b"r");
        assert_eq!(key.family.as_deref(), Some(&b"cf"[..]));
        assert_eq!(key.qualifier, None);
        assert_eq!(key.visibility.as_deref(), Some(&b"v"[..]));
        assert_eq!(key.timestamp, None);
    }

    #[test]
    fn range_defaults() {
        let range = Range::new(Some(Key::new("row")), None);
        assert!(range.start_inclusive);
        assert!(!range.end_inclusive);
        assert_eq!(range.end, None);
    }

    #[test]
    fn range_exact_appends_zero_byte() {
        let range = Range::exact("row", None, None);
        assert_eq!(range.start, Some(Key::new("row")));
        assert_eq!(range.end, Some(Key::new(b"row\x00".to_vec())));
        assert!(!range.end_inclusive);

        let range = Range::exact("row", Some(b"cf"), None);
        assert_eq!(range.start, Some(Key::new("row").family("cf")));
        assert_eq!(range.end, Some(Key::new("row").family(b"cf\x00".to_vec())));

        let range = Range::exact("row", Some(b"cf"), Some(b"cq"));
        assert_eq!(range.start, Some(Key::new("row").family("cf").qualifier("cq")));
        assert_eq!(
            range.end,
            Some(Key::new("row").family("cf").qualifier(b"cq\x00".to_vec()))
        );
    }

    #[test]
    fn range_prefix_appends_ff_byte_inclusive() {
        let range = Range::prefix("row", None, None);
        assert_eq!(range.start, Some(Key::new("row")));
        assert_eq!(range.end, Some(Key::new(b"row\xff".to_vec())));
        assert!(range.end_inclusive);

        let range = Range::prefix("row", Some(b"cf"), Some(b"cq"));
        assert_eq!(
            range.end,
            Some(Key::new("row").family("cf").qualifier(b"cq\xff".to_vec()))
        );
        assert!(range.end_inclusive);
    }

    #[test]
    fn authorization_set_encodes_and_compares() {
        let auths: AuthorizationSet = ["A", "B"].into_iter().collect();
        assert!(auths.contains("A"));
        assert!(auths.contains(b"B"));
        assert!(!auths.contains("C"));
        assert_eq!(auths.len(), 2);
        assert_eq!(auths.to_vec(), vec![b"A".to_vec(), b"B".to_vec()]);
    }

    #[test]
    fn scan_column_optional_qualifier() {
        let column = ScanColumn::new("cf");
        assert_eq!(column.qualifier, None);
        let column = ScanColumn::new("cf").qualifier("cq");
        assert_eq!(column.qualifier.as_deref(), Some(&b"cq"[..]));
    }
}
