//! # Wire Model
//!
//! Purpose: Define the request/response frames exchanged with the remote
//! service and the wire-ready mirrors of the domain value objects.
//!
//! ## Design Principles
//! 1. **Closed Capability Set**: One request variant per remote entry
//!    point; there is no generic call frame.
//! 2. **One-Way Marshalling**: Domain types convert into wire types via
//!    `From`; only scan entries flow back the other way.
//! 3. **Shared By Both Ends**: Test servers decode the same frames the
//!    client encodes, with the same codec configuration.

use std::collections::HashMap;

use bincode::config::{BigEndian, Configuration, Fixint};
use bincode::{Decode, Encode};

use crate::options::{BatchScanOptions, ScanOptions, WriterOptions};
use crate::types::{
    Durability, IteratorSetting, Key, KeyValue, Mutation, Range, ResourceId, ScanColumn, TimeType,
};

/// Codec configuration shared by both ends of the wire.
pub fn codec_config() -> Configuration<BigEndian, Fixint> {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// One blocking request to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum Request {
    CreateScanner {
        secret: Vec<u8>,
        table: String,
        options: WireScanOptions,
    },
    CreateBatchScanner {
        secret: Vec<u8>,
        table: String,
        options: WireBatchScanOptions,
    },
    CreateWriter {
        secret: Vec<u8>,
        table: String,
        options: WireWriterOptions,
    },
    NextEntry {
        resource: ResourceId,
    },
    CloseScanner {
        resource: ResourceId,
    },
    ApplyUpdates {
        resource: ResourceId,
        batch: UpdateBatch,
    },
    CloseWriter {
        resource: ResourceId,
    },
    CreateTable {
        secret: Vec<u8>,
        table: String,
        versioning_iterator: bool,
        time_type: TimeType,
    },
    TableExists {
        secret: Vec<u8>,
        table: String,
    },
    ChangeUserAuthorizations {
        secret: Vec<u8>,
        user: String,
        authorizations: Vec<Vec<u8>>,
    },
    GetUserAuthorizations {
        secret: Vec<u8>,
        user: String,
    },
}

/// The matching response frame.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum Response {
    Resource(ResourceId),
    Entry(WireEntry),
    Bool(bool),
    Authorizations(Vec<Vec<u8>>),
    Unit,
    Fault(Fault),
}

/// Failure reported by the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Fault {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum FaultKind {
    /// Target table or resource id unknown to the remote side.
    NotFound,
    /// Scanner exhaustion signal; expected, not an error.
    NoMoreEntries,
    /// Any other remote failure.
    Internal,
}

/// A scanned cell as it crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireEntry {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub visibility: Vec<u8>,
    pub timestamp: i64,
    pub value: Vec<u8>,
}

impl From<WireEntry> for KeyValue {
    fn from(entry: WireEntry) -> Self {
        KeyValue::new(
            entry.row,
            entry.family,
            entry.qualifier,
            entry.visibility,
            entry.timestamp,
            entry.value,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireKey {
    pub row: Vec<u8>,
    pub family: Option<Vec<u8>>,
    pub qualifier: Option<Vec<u8>>,
    pub visibility: Option<Vec<u8>>,
    pub timestamp: Option<i64>,
}

impl From<&Key> for WireKey {
    fn from(key: &Key) -> Self {
        WireKey {
            row: key.row.clone(),
            family: key.family.clone(),
            qualifier: key.qualifier.clone(),
            visibility: key.visibility.clone(),
            timestamp: key.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireRange {
    pub start: Option<WireKey>,
    pub start_inclusive: bool,
    pub end: Option<WireKey>,
    pub end_inclusive: bool,
}

impl From<&Range> for WireRange {
    fn from(range: &Range) -> Self {
        WireRange {
            start: range.start.as_ref().map(WireKey::from),
            start_inclusive: range.start_inclusive,
            end: range.end.as_ref().map(WireKey::from),
            end_inclusive: range.end_inclusive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireScanColumn {
    pub family: Vec<u8>,
    pub qualifier: Option<Vec<u8>>,
}

impl From<&ScanColumn> for WireScanColumn {
    fn from(column: &ScanColumn) -> Self {
        WireScanColumn {
            family: column.family.clone(),
            qualifier: column.qualifier.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireIteratorSetting {
    pub priority: i32,
    pub name: String,
    pub iterator_class: String,
    pub properties: HashMap<String, String>,
}

impl From<&IteratorSetting> for WireIteratorSetting {
    fn from(setting: &IteratorSetting) -> Self {
        WireIteratorSetting {
            priority: setting.priority,
            name: setting.name.clone(),
            iterator_class: setting.iterator_class.clone(),
            properties: setting.properties.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireScanOptions {
    pub authorizations: Option<Vec<Vec<u8>>>,
    pub columns: Option<Vec<WireScanColumn>>,
    pub iterators: Option<Vec<WireIteratorSetting>>,
    pub range: Option<WireRange>,
    pub buffer_size: Option<u32>,
}

impl From<&ScanOptions> for WireScanOptions {
    fn from(options: &ScanOptions) -> Self {
        WireScanOptions {
            authorizations: options.authorizations.as_ref().map(|a| a.to_vec()),
            columns: options
                .columns
                .as_ref()
                .map(|columns| columns.iter().map(WireScanColumn::from).collect()),
            iterators: options
                .iterators
                .as_ref()
                .map(|iterators| iterators.iter().map(WireIteratorSetting::from).collect()),
            range: options.range.as_ref().map(WireRange::from),
            buffer_size: options.buffer_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireBatchScanOptions {
    pub authorizations: Option<Vec<Vec<u8>>>,
    pub columns: Option<Vec<WireScanColumn>>,
    pub iterators: Option<Vec<WireIteratorSetting>>,
    pub ranges: Option<Vec<WireRange>>,
    pub threads: Option<u32>,
}

impl From<&BatchScanOptions> for WireBatchScanOptions {
    fn from(options: &BatchScanOptions) -> Self {
        WireBatchScanOptions {
            authorizations: options.authorizations.as_ref().map(|a| a.to_vec()),
            columns: options
                .columns
                .as_ref()
                .map(|columns| columns.iter().map(WireScanColumn::from).collect()),
            iterators: options
                .iterators
                .as_ref()
                .map(|iterators| iterators.iter().map(WireIteratorSetting::from).collect()),
            ranges: options
                .ranges
                .as_ref()
                .map(|ranges| ranges.iter().map(WireRange::from).collect()),
            threads: options.threads,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct WireWriterOptions {
    pub max_memory: Option<u64>,
    pub latency_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub threads: Option<u32>,
    pub durability: Option<Durability>,
}

impl From<&WriterOptions> for WireWriterOptions {
    fn from(options: &WriterOptions) -> Self {
        WireWriterOptions {
            max_memory: options.max_memory,
            latency_ms: options.latency_ms,
            timeout_ms: options.timeout_ms,
            threads: options.threads,
            durability: options.durability,
        }
    }
}

/// One column update inside an apply-updates batch.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ColumnUpdate {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub visibility: Vec<u8>,
    pub timestamp: Option<i64>,
    pub value: Vec<u8>,
    pub delete: bool,
}

impl From<&Mutation> for ColumnUpdate {
    fn from(mutation: &Mutation) -> Self {
        ColumnUpdate {
            family: mutation.family.clone(),
            qualifier: mutation.qualifier.clone(),
            visibility: mutation.visibility.clone(),
            timestamp: mutation.timestamp,
            value: mutation.value.clone(),
            delete: mutation.delete,
        }
    }
}

/// All updates aimed at one row.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct RowUpdates {
    pub row: Vec<u8>,
    pub updates: Vec<ColumnUpdate>,
}

/// Row-indexed update batch for one apply-updates call.
///
/// Rows appear in first-appearance order of the source mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct UpdateBatch {
    rows: Vec<RowUpdates>,
}

impl UpdateBatch {
    /// Groups mutations by their target row.
    pub fn index<'a, I>(mutations: I) -> Self
    where
        I: IntoIterator<Item = &'a Mutation>,
    {
        let mut rows: Vec<RowUpdates> = Vec::new();
        let mut by_row: HashMap<Vec<u8>, usize> = HashMap::new();
        for mutation in mutations {
            let update = ColumnUpdate::from(mutation);
            match by_row.get(&mutation.row) {
                Some(&slot) => rows[slot].updates.push(update),
                None => {
                    by_row.insert(mutation.row.clone(), rows.len());
                    rows.push(RowUpdates {
                        row: mutation.row.clone(),
                        updates: vec![update],
                    });
                }
            }
        }
        UpdateBatch { rows }
    }

    pub fn rows(&self) -> &[RowUpdates] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_batch_groups_by_row_in_first_appearance_order() {
        let mutations = [
            Mutation::new("r1").family("a"),
            Mutation::new("r1").family("b"),
            Mutation::new("r2").family("c"),
        ];
        let batch = UpdateBatch::index(mutations.iter());

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[0].row, b"r1");
        assert_eq!(batch.rows()[0].updates.len(), 2);
        assert_eq!(batch.rows()[0].updates[0].family, b"a");
        assert_eq!(batch.rows()[0].updates[1].family, b"b");
        assert_eq!(batch.rows()[1].row, b"r2");
        assert_eq!(batch.rows()[1].updates.len(), 1);
        assert_eq!(batch.rows()[1].updates[0].family, b"c");
    }

    #[test]
    fn update_batch_interleaved_rows_keep_first_appearance_order() {
        let mutations = [
            Mutation::new("b").family("1"),
            Mutation::new("a").family("2"),
            Mutation::new("b").family("3"),
        ];
        let batch = UpdateBatch::index(mutations.iter());

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[0].row, b"b");
        assert_eq!(batch.rows()[0].updates.len(), 2);
        assert_eq!(batch.rows()[1].row, b"a");
    }

    #[test]
    fn scan_options_convert_to_wire_form() {
        let options = ScanOptions {
            authorizations: Some(["A"].into_iter().collect()),
            columns: Some(vec![ScanColumn::new("cf").qualifier("cq")]),
            iterators: Some(vec![
                IteratorSetting::new(10, "vers", "VersioningIterator").property("maxVersions", "1"),
            ]),
            range: Some(Range::exact("row", None, None)),
            buffer_size: Some(64),
        };
        let wire = WireScanOptions::from(&options);

        assert_eq!(wire.authorizations, Some(vec![b"A".to_vec()]));
        let columns = wire.columns.as_deref().unwrap_or(&[]);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].family, b"cf");
        assert_eq!(columns[0].qualifier.as_deref(), Some(&b"cq"[..]));
        let range = wire.range.as_ref().expect("range");
        assert_eq!(range.start.as_ref().expect("start").row, b"row");
        assert_eq!(range.end.as_ref().expect("end").row, b"row\x00");
        assert_eq!(wire.buffer_size, Some(64));
    }

    #[test]
    fn writer_options_convert_to_wire_form() {
        let options = WriterOptions {
            max_memory: Some(1 << 20),
            latency_ms: Some(500),
            timeout_ms: Some(10_000),
            threads: Some(4),
            durability: Some(Durability::Flush),
        };
        let wire = WireWriterOptions::from(&options);

        assert_eq!(wire.max_memory, Some(1 << 20));
        assert_eq!(wire.latency_ms, Some(500));
        assert_eq!(wire.timeout_ms, Some(10_000));
        assert_eq!(wire.threads, Some(4));
        assert_eq!(wire.durability, Some(Durability::Flush));
    }

    #[test]
    fn default_options_convert_to_empty_wire_form() {
        let wire = WireScanOptions::from(&ScanOptions::default());
        assert_eq!(wire.authorizations, None);
        assert_eq!(wire.columns, None);
        assert_eq!(wire.iterators, None);
        assert_eq!(wire.range, None);
        assert_eq!(wire.buffer_size, None);
    }
}
