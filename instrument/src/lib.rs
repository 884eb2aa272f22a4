//! Event tape: records structured `tracing` events as typed columns.
//!
//! Each event target becomes a table and each field a column, so the tape's
//! schema is whatever the instrumented code emits. Tables convert to polars
//! DataFrames for analysis and can be written out as parquet.
//!
//! ```ignore
//! // Instrumented code:
//! tracing::info!(target: "fill", tick, quantity, price);
//!
//! // Test:
//! let recording = instrument::Recording::start(["fill"]);
//! // ... run ticks on this thread ...
//! let tape = recording.finish();
//! let fills = tape.table("fill").unwrap().to_dataframe()?;
//! ```
//!
//! The tape lives in the subscriber rather than in thread-local storage, so a
//! subscriber set as the global default also sees events from worker threads.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Id, Level, Metadata, Subscriber};

// ============================================================================
// Columns
// ============================================================================

/// One field's values across every row of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    UInt(Vec<u64>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Flag(Vec<bool>),
    Text(Vec<String>),
}

impl ColumnData {
    fn empty_like(value: &Value, rows: usize) -> Self {
        match value {
            Value::UInt(_) => ColumnData::UInt(vec![0; rows]),
            Value::Int(_) => ColumnData::Int(vec![0; rows]),
            Value::Float(_) => ColumnData::Float(vec![0.0; rows]),
            Value::Flag(_) => ColumnData::Flag(vec![false; rows]),
            Value::Text(_) => ColumnData::Text(vec![String::new(); rows]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::UInt(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Flag(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill with the type's zero value up to `rows`.
    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self {
            ColumnData::UInt(v) => v.resize(rows, 0),
            ColumnData::Int(v) => v.resize(rows, 0),
            ColumnData::Float(v) => v.resize(rows, 0.0),
            ColumnData::Flag(v) => v.resize(rows, false),
            ColumnData::Text(v) => v.resize(rows, String::new()),
        }
    }

    /// Append `value`, widening integers into a float column. Values of an
    /// incompatible type are left to padding.
    fn push(&mut self, value: Value) {
        match (self, value) {
            (ColumnData::UInt(v), Value::UInt(x)) => v.push(x),
            (ColumnData::Int(v), Value::Int(x)) => v.push(x),
            (ColumnData::Int(v), Value::UInt(x)) => v.push(i64::try_from(x).unwrap_or(i64::MAX)),
            (ColumnData::Float(v), Value::Float(x)) => v.push(x),
            (ColumnData::Float(v), Value::UInt(x)) => v.push(x as f64),
            (ColumnData::Float(v), Value::Int(x)) => v.push(x as f64),
            (ColumnData::Flag(v), Value::Flag(x)) => v.push(x),
            (ColumnData::Text(v), Value::Text(x)) => v.push(x),
            _ => {}
        }
    }

    fn to_column(&self, name: &str) -> Column {
        let name: PlSmallStr = name.into();
        match self {
            ColumnData::UInt(v) => Column::new(name, v.as_slice()),
            ColumnData::Int(v) => Column::new(name, v.as_slice()),
            ColumnData::Float(v) => Column::new(name, v.as_slice()),
            ColumnData::Flag(v) => Column::new(name, v.as_slice()),
            ColumnData::Text(v) => Column::new(name, v.as_slice()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    UInt(u64),
    Int(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

// ============================================================================
// Tables
// ============================================================================

/// All events recorded under one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    columns: BTreeMap<String, ColumnData>,
    rows: usize,
}

impl EventTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Add one row. Fields the row lacks are zero-filled; a field seen for
    /// the first time gets a column zero-filled for all earlier rows.
    fn append(&mut self, fields: Vec<(&'static str, Value)>) {
        let rows = self.rows;
        for (name, value) in fields {
            let column = self
                .columns
                .entry(name.to_string())
                .or_insert_with(|| ColumnData::empty_like(&value, rows));
            column.pad_to(rows);
            column.push(value);
        }
        self.rows += 1;
        for column in self.columns.values_mut() {
            column.pad_to(self.rows);
        }
    }

    /// Columns in name order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|(name, data)| data.to_column(name))
            .collect();
        DataFrame::new(columns)
    }
}

/// Every table recorded so far, keyed by event target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tape {
    tables: BTreeMap<String, EventTable>,
}

impl Tape {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// Rows recorded under `target`, zero if none.
    pub fn rows(&self, target: &str) -> usize {
        self.table(target).map_or(0, EventTable::rows)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn record(&mut self, target: &str, fields: Vec<(&'static str, Value)>) {
        self.tables
            .entry(target.to_string())
            .or_default()
            .append(fields);
    }

    pub fn to_dataframes(&self) -> PolarsResult<BTreeMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(target, table)| Ok((target.clone(), table.to_dataframe()?)))
            .collect()
    }
}

/// Write each table to `{dir}/{target}.parquet`, returning the paths.
pub fn save_parquet(tape: &Tape, dir: &Path) -> PolarsResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    let mut written = Vec::new();
    for (target, mut df) in tape.to_dataframes()? {
        let path = dir.join(format!("{}.parquet", sanitize(&target)));
        let file = std::fs::File::create(&path).map_err(io_error)?;
        ParquetWriter::new(file).finish(&mut df)?;
        written.push(path);
    }
    Ok(written)
}

fn io_error(error: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: error.into(),
        msg: None,
    }
}

/// Targets may contain `::`; keep file names portable.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

// ============================================================================
// Subscriber
// ============================================================================

struct FieldCollector {
    fields: Vec<(&'static str, Value)>,
}

impl Visit for FieldCollector {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push((field.name(), Value::UInt(value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push((field.name(), Value::Int(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push((field.name(), Value::Float(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push((field.name(), Value::Flag(value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.push((field.name(), Value::Text(value.to_string())));
    }

    // `%` fields (ids, display values) land here.
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields
            .push((field.name(), Value::Text(format!("{value:?}"))));
    }
}

/// Shared access to a subscriber's tape from outside the subscriber.
#[derive(Debug, Clone, Default)]
pub struct TapeHandle(Arc<Mutex<Tape>>);

impl TapeHandle {
    /// Take everything recorded so far, leaving the tape empty.
    pub fn drain(&self) -> Tape {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn snapshot(&self) -> Tape {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        *self.0.lock() = Tape::default();
    }
}

/// Records INFO-and-above events, optionally only for chosen targets.
/// Spans are ignored.
pub struct TapeSubscriber {
    tape: TapeHandle,
    targets: Option<HashSet<String>>,
    next_span: AtomicU64,
}

impl Default for TapeSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl TapeSubscriber {
    pub fn new() -> Self {
        Self {
            tape: TapeHandle::default(),
            targets: None,
            next_span: AtomicU64::new(1),
        }
    }

    /// Only record events whose target is one of `targets`.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn handle(&self) -> TapeHandle {
        self.tape.clone()
    }

    fn wants(&self, target: &str) -> bool {
        self.targets
            .as_ref()
            .is_none_or(|targets| targets.contains(target))
    }
}

impl Subscriber for TapeSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= Level::INFO && self.wants(metadata.target())
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(self.next_span.fetch_add(1, Ordering::Relaxed))
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut collector = FieldCollector { fields: Vec::new() };
        event.record(&mut collector);
        self.tape
            .0
            .lock()
            .record(event.metadata().target(), collector.fields);
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

// ============================================================================
// Recording - Scoped capture on the current thread
// ============================================================================

/// Captures events on the current thread until finished or dropped.
///
/// With [`Recording::persist_to`], whatever was not taken by
/// [`Recording::finish`] is written as parquet when the recording drops.
pub struct Recording {
    handle: TapeHandle,
    output_dir: Option<PathBuf>,
    _guard: DefaultGuard,
}

impl Recording {
    /// Record the given targets. An empty list records every target.
    pub fn start<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        let subscriber = if targets.is_empty() {
            TapeSubscriber::new()
        } else {
            TapeSubscriber::new().with_targets(targets)
        };
        let handle = subscriber.handle();
        let guard = tracing::subscriber::set_default(subscriber);
        Self {
            handle,
            output_dir: None,
            _guard: guard,
        }
    }

    pub fn persist_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn snapshot(&self) -> Tape {
        self.handle.snapshot()
    }

    /// Stop recording and return the tape.
    pub fn finish(self) -> Tape {
        self.handle.drain()
    }
}

impl Drop for Recording {
    fn drop(&mut self) {
        let Some(dir) = self.output_dir.take() else {
            return;
        };
        let tape = self.handle.drain();
        if tape.is_empty() {
            return;
        }
        match save_parquet(&tape, &dir) {
            Ok(paths) => eprintln!("Recording: wrote {} tables to {}", paths.len(), dir.display()),
            Err(e) => eprintln!("Recording: failed to write parquet to {}: {e}", dir.display()),
        }
    }
}
