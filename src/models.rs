use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Placeholder for any field that could not be retrieved.
pub const SENTINEL: &str = "ZZZ";

// ============ Field Names ============

pub const FIELD_PHONE: &str = "Phone";
pub const FIELD_NAME: &str = "Name";
pub const FIELD_DOB: &str = "DoB";
pub const FIELD_AGE: &str = "Age";
pub const FIELD_ADDRESS: &str = "Address";
pub const FIELD_CITY: &str = "City";
pub const FIELD_STATE: &str = "State";
pub const FIELD_ZIP: &str = "ZIP";
pub const FIELD_NATIONAL_DNC: &str = "National DNC";
pub const FIELD_STATE_DNC: &str = "State DNC";
pub const FIELD_BLACKLISTED: &str = "Blacklisted";

/// Fields produced by the Person lookup.
pub const PERSON_FIELDS: [&str; 7] = [
    FIELD_NAME,
    FIELD_DOB,
    FIELD_AGE,
    FIELD_ADDRESS,
    FIELD_CITY,
    FIELD_STATE,
    FIELD_ZIP,
];

/// Fields produced by the TCPA lookup.
pub const TCPA_FIELDS: [&str; 4] = [
    FIELD_NATIONAL_DNC,
    FIELD_STATE_DNC,
    FIELD_BLACKLISTED,
    FIELD_STATE,
];

/// A phone number exactly as read from the input list.
pub type PhoneNumber = String;

// ============ Pipeline Modes ============

/// Which lookups a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// TCPA lookup followed by Person lookup.
    Combined,
    /// Person lookup only.
    Person,
    /// TCPA lookup only.
    Tcpa,
}

impl PipelineMode {
    /// Suffix appended to the timestamp in the output file name.
    pub fn output_suffix(&self) -> &'static str {
        match self {
            PipelineMode::Combined => "",
            PipelineMode::Person => "_person",
            PipelineMode::Tcpa => "_tcpa",
        }
    }

    /// Header row of the output report.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            PipelineMode::Combined => &[
                FIELD_PHONE,
                FIELD_NAME,
                FIELD_AGE,
                FIELD_DOB,
                FIELD_ADDRESS,
                FIELD_CITY,
                FIELD_STATE,
                FIELD_ZIP,
                FIELD_NATIONAL_DNC,
                FIELD_STATE_DNC,
                FIELD_BLACKLISTED,
            ],
            PipelineMode::Person => &[
                FIELD_PHONE,
                FIELD_NAME,
                FIELD_DOB,
                FIELD_AGE,
                FIELD_ADDRESS,
                FIELD_CITY,
                FIELD_STATE,
                FIELD_ZIP,
            ],
            PipelineMode::Tcpa => &[
                FIELD_PHONE,
                FIELD_NATIONAL_DNC,
                FIELD_STATE_DNC,
                FIELD_BLACKLISTED,
                FIELD_STATE,
            ],
        }
    }

    /// Default Person attempts for this mode (0 when the mode skips Person).
    pub fn person_attempts(&self) -> u32 {
        match self {
            PipelineMode::Combined => 3,
            PipelineMode::Person => 2,
            PipelineMode::Tcpa => 0,
        }
    }
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineMode::Combined => "combined",
            PipelineMode::Person => "person",
            PipelineMode::Tcpa => "tcpa",
        };
        f.write_str(name)
    }
}

// ============ Lookup Records ============

/// Flat field-name -> value mapping for one phone number.
///
/// Every record carries `Phone` plus every field of the lookups that ran;
/// values that could not be retrieved hold [`SENTINEL`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupRecord {
    fields: BTreeMap<String, String>,
}

impl LookupRecord {
    /// Creates a record holding only the phone number.
    pub fn new(phone: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_PHONE.to_string(), phone.to_string());
        Self { fields }
    }

    /// Creates a record for `phone` with every field in `names` set to the sentinel.
    pub fn sentinel(phone: &str, names: &[&str]) -> Self {
        let mut record = Self::new(phone);
        for name in names {
            record.set(name, SENTINEL);
        }
        record
    }

    pub fn phone(&self) -> &str {
        self.get(FIELD_PHONE).unwrap_or(SENTINEL)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Shallow union: fields of `other` overwrite fields already present.
    pub fn merge(&mut self, other: LookupRecord) {
        self.fields.extend(other.fields);
    }

    /// True when every field in `names` holds the sentinel.
    pub fn is_sentinel_for(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.get(name) == Some(SENTINEL))
    }

    /// Projects the record onto `columns`; absent fields become the sentinel.
    pub fn to_row(&self, columns: &[&str]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.get(c).unwrap_or(SENTINEL).to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::fmt::Display for LookupRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{}}}", body)
    }
}

/// Append-only table of records, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    rows: Vec<LookupRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LookupRecord) {
        self.rows.push(record);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[LookupRecord] {
        &self.rows
    }

    /// Drops exact duplicate rows, keeping the first occurrence.
    pub fn dedup(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }
}

impl FromIterator<LookupRecord> for ResultTable {
    fn from_iter<I: IntoIterator<Item = LookupRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// FIFO of phone numbers not yet processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkQueue {
    numbers: VecDeque<PhoneNumber>,
}

impl WorkQueue {
    pub fn pop_front(&mut self) -> Option<PhoneNumber> {
        self.numbers.pop_front()
    }

    /// Puts a number back at the head of the queue.
    pub fn push_front(&mut self, phone: PhoneNumber) {
        self.numbers.push_front(phone);
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhoneNumber> {
        self.numbers.iter()
    }
}

impl FromIterator<PhoneNumber> for WorkQueue {
    fn from_iter<I: IntoIterator<Item = PhoneNumber>>(iter: I) -> Self {
        Self {
            numbers: iter.into_iter().collect(),
        }
    }
}

// ============ API Payloads ============

/// Person API response: `{"person": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonApiResponse {
    #[serde(default)]
    pub person: Option<Vec<PersonEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonEntry {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub dob: Option<Value>,
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub addresses: Option<Vec<PersonAddress>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonAddress {
    #[serde(default)]
    pub home: Option<Value>,
    #[serde(default)]
    pub city: Option<Value>,
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default)]
    pub zip: Option<Value>,
}

/// TCPA API response: `{"phone", "ndnc", "sdnc", "listed", "state"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TcpaApiResponse {
    #[serde(default)]
    pub phone: Option<Value>,
    #[serde(default)]
    pub ndnc: Option<Value>,
    #[serde(default)]
    pub sdnc: Option<Value>,
    #[serde(default)]
    pub listed: Option<Value>,
    #[serde(default)]
    pub state: Option<Value>,
}

/// Renders a payload value as a report cell.
///
/// Strings are copied verbatim, `null` and absent values become the sentinel,
/// everything else uses its compact JSON text.
pub fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => SENTINEL.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
