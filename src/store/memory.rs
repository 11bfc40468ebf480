use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{FieldValues, FindQuery, Record, RecordSet, RecordStore, ScriptCall, StoreError};

/// In-process record store with the backend's find semantics, used for tests
/// and local development.
///
/// Criteria support a subset of the backend's find syntax: `=` (empty field),
/// `==value` (exact, with `*` and `@` wildcards and `\` escapes),
/// `=value` (case-insensitive equal), `low...high` (range) and plain text
/// (case-insensitive prefix).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    layouts: Mutex<HashMap<String, Vec<Record>>>,
    serial_fields: Mutex<HashMap<String, String>>,
    scripts: Mutex<Vec<ScriptCall>>,
    next_id: AtomicI64,
    finds: AtomicUsize,
    empty_writes: AtomicBool,
    failing_scripts: AtomicBool,
    failing_finds: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills `field` with the record id on create when the caller left it empty.
    pub fn with_serial_field(self, layout: &str, field: &str) -> Self {
        lock(&self.inner.serial_fields).insert(layout.to_string(), field.to_string());
        self
    }

    /// Stores a record as-is and returns its record id. Non-object values are ignored.
    pub fn insert(&self, layout: &str, fields: Value) -> i64 {
        let record_id = self.next_record_id();
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        lock(&self.inner.layouts)
            .entry(layout.to_string())
            .or_default()
            .push(Record::new(record_id, fields));
        record_id
    }

    /// Overwrites one field of a stored record.
    pub fn set_field(&self, layout: &str, record_id: i64, field: &str, value: Value) -> bool {
        let mut layouts = lock(&self.inner.layouts);
        match layouts
            .get_mut(layout)
            .and_then(|records| records.iter_mut().find(|r| r.record_id == record_id))
        {
            Some(record) => {
                record.fields.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn records(&self, layout: &str) -> Vec<Record> {
        lock(&self.inner.layouts)
            .get(layout)
            .cloned()
            .unwrap_or_default()
    }

    pub fn script_calls(&self) -> Vec<ScriptCall> {
        lock(&self.inner.scripts).clone()
    }

    /// Number of finds served so far.
    pub fn find_count(&self) -> usize {
        self.inner.finds.load(AtomicOrdering::SeqCst)
    }

    /// Acknowledge creates and updates without returning the record.
    pub fn return_empty_on_write(&self, enabled: bool) {
        self.inner.empty_writes.store(enabled, AtomicOrdering::SeqCst);
    }

    pub fn fail_scripts(&self, enabled: bool) {
        self.inner.failing_scripts.store(enabled, AtomicOrdering::SeqCst);
    }

    /// Fail every find with a transport error.
    pub fn fail_finds(&self, enabled: bool) {
        self.inner.failing_finds.store(enabled, AtomicOrdering::SeqCst);
    }

    fn next_record_id(&self) -> i64 {
        self.inner.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, query: &FindQuery) -> Result<RecordSet, StoreError> {
        self.inner.finds.fetch_add(1, AtomicOrdering::SeqCst);
        if self.inner.failing_finds.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Transport("connection refused".into()));
        }
        if query.skip < 0 {
            return Err(StoreError::InvalidQuery("negative skip".into()));
        }

        let mut matching: Vec<Record> = lock(&self.inner.layouts)
            .get(&query.layout)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| {
                        query
                            .criteria
                            .iter()
                            .all(|(field, pattern)| matches(r.fields.get(field), pattern))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if matching.is_empty() {
            return Err(StoreError::NoRecordsMatch);
        }

        matching.sort_by(|a, b| {
            for field in &query.sort {
                let ord = compare(a.fields.get(&field.name), b.fields.get(&field.name));
                let ord = if field.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.record_id.cmp(&b.record_id)
        });

        let found_count = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX))
            .collect();

        Ok(RecordSet {
            records: page,
            found_count,
            script_error: None,
        })
    }

    async fn create(&self, layout: &str, fields: &FieldValues) -> Result<RecordSet, StoreError> {
        let record_id = self.next_record_id();
        let mut map = fields.to_json();

        if let Some(serial) = lock(&self.inner.serial_fields).get(layout) {
            let empty = map
                .get(serial)
                .map(|v| value_text(Some(v)).is_empty())
                .unwrap_or(true);
            if empty {
                map.insert(serial.clone(), Value::String(record_id.to_string()));
            }
        }

        let record = Record::new(record_id, map);
        lock(&self.inner.layouts)
            .entry(layout.to_string())
            .or_default()
            .push(record.clone());

        if self.inner.empty_writes.load(AtomicOrdering::SeqCst) {
            return Ok(RecordSet::default());
        }

        Ok(RecordSet {
            records: vec![record],
            found_count: 1,
            script_error: None,
        })
    }

    async fn update(
        &self,
        layout: &str,
        record_id: i64,
        fields: &FieldValues,
        script: Option<&ScriptCall>,
    ) -> Result<RecordSet, StoreError> {
        let updated = {
            let mut layouts = lock(&self.inner.layouts);
            let record = layouts
                .get_mut(layout)
                .and_then(|records| records.iter_mut().find(|r| r.record_id == record_id))
                .ok_or_else(|| StoreError::Backend {
                    code: "101".into(),
                    message: "Record is missing".into(),
                })?;
            for (name, value) in fields.iter() {
                record
                    .fields
                    .insert(name.to_string(), Value::String(value.to_string()));
            }
            record.clone()
        };

        let script_error = script.map(|call| {
            lock(&self.inner.scripts).push(call.clone());
            if self.inner.failing_scripts.load(AtomicOrdering::SeqCst) {
                "104".to_string()
            } else {
                "0".to_string()
            }
        });

        if self.inner.empty_writes.load(AtomicOrdering::SeqCst) {
            return Ok(RecordSet {
                script_error,
                ..Default::default()
            });
        }

        Ok(RecordSet {
            records: vec![updated],
            found_count: 1,
            script_error,
        })
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => if *b { "1" } else { "0" }.to_string(),
        Some(other) => other.to_string(),
    }
}

fn matches(value: Option<&Value>, pattern: &str) -> bool {
    let text = value_text(value);
    let pattern = pattern.trim();

    if pattern.is_empty() {
        return true;
    }
    if pattern == "=" || pattern == "==" {
        return text.trim().is_empty();
    }
    if let Some(exact) = pattern.strip_prefix("==") {
        let text: Vec<char> = text.chars().collect();
        return glob(&text, &tokens(exact));
    }
    if let Some(equal) = pattern.strip_prefix('=') {
        return text.eq_ignore_ascii_case(equal);
    }
    if let Some((low, high)) = pattern.split_once("...") {
        return match (text.parse::<f64>(), low.parse::<f64>(), high.parse::<f64>()) {
            (Ok(v), Ok(lo), Ok(hi)) => v >= lo && v <= hi,
            _ => text.as_str() >= low && text.as_str() <= high,
        };
    }
    text.to_lowercase().starts_with(&pattern.to_lowercase())
}

enum Token {
    Char(char),
    AnyOne,
    AnyRun,
}

fn tokens(pattern: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(Token::Char(escaped));
                }
            }
            '*' => out.push(Token::AnyRun),
            '@' => out.push(Token::AnyOne),
            other => out.push(Token::Char(other)),
        }
    }
    out
}

fn glob(text: &[char], pattern: &[Token]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((Token::AnyRun, rest)) => (0..=text.len()).any(|i| glob(&text[i..], rest)),
        Some((Token::AnyOne, rest)) => !text.is_empty() && glob(&text[1..], rest),
        Some((Token::Char(c), rest)) => text.first() == Some(c) && glob(&text[1..], rest),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = (value_text(a), value_text(b));
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(&b),
    }
}
