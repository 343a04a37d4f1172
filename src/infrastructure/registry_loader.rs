//! Loading the instrument table from JSON or TOML sources.
//!
//! The canonical source is a JSON sequence holding exactly one object keyed
//! by ticker symbol:
//!
//! ```text
//! [{
//!     "NDX": {
//!         "Uic": 4912, // US Tech 100 NAS
//!         "AssetType": "CfdOnIndex",
//!         "stoploss_points": 25,
//!         "200ma": 11946
//!     }
//! }]
//! ```
//!
//! `//` and `/* */` comments are stripped before parsing. A bare object
//! (without the wrapping sequence) is accepted as well. TOML sources hold
//! one table per symbol with the same field names.
//!
//! Loading is all-or-nothing: any error discards everything parsed so far.

use crate::domain::errors::{ParseError, RegistryError, SchemaError};
use crate::domain::instrument::{
    AssetType, FIELD_ASSET_TYPE, FIELD_REFERENCE_MA, FIELD_STOPLOSS_POINTS, FIELD_UIC,
    InstrumentRecord,
};
use crate::domain::registry::InstrumentRegistry;
use rust_decimal::Decimal;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

const KNOWN_FIELDS: [&str; 4] = [
    FIELD_UIC,
    FIELD_ASSET_TYPE,
    FIELD_STOPLOSS_POINTS,
    FIELD_REFERENCE_MA,
];

const JSON_NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// Serialization format of an instrument source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// JSON with optional `//` and `/* */` comments
    #[default]
    Json,
    Toml,
}

impl SourceFormat {
    /// Detect the format from a file extension. Anything that is not
    /// `.toml` is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => SourceFormat::Toml,
            _ => SourceFormat::Json,
        }
    }
}

impl FromStr for SourceFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "jsonc" | "js" => Ok(SourceFormat::Json),
            "toml" => Ok(SourceFormat::Toml),
            _ => anyhow::bail!("Invalid source format: {}. Must be 'json' or 'toml'", s),
        }
    }
}

/// Loads an [`InstrumentRegistry`] from a file on disk
#[derive(Debug, Clone)]
pub struct RegistryLoader {
    file_path: PathBuf,
    format: SourceFormat,
}

impl RegistryLoader {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let format = SourceFormat::from_path(&file_path);
        Self { file_path, format }
    }

    /// Override extension-based format detection
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn load(&self) -> Result<InstrumentRegistry, RegistryError> {
        let content = fs::read_to_string(&self.file_path).map_err(|source| ParseError::Read {
            path: self.file_path.clone(),
            source,
        })?;

        let registry = parse_registry(&content, self.format)?;

        info!(
            "Loaded {} instruments from {:?}",
            registry.len(),
            self.file_path
        );
        Ok(registry)
    }
}

/// Parse an instrument table held in memory
pub fn parse_registry(
    content: &str,
    format: SourceFormat,
) -> Result<InstrumentRegistry, RegistryError> {
    let source = match format {
        SourceFormat::Json => {
            let stripped = strip_comments(content);
            serde_json::from_str::<RawSource>(&stripped).map_err(json_error)?
        }
        SourceFormat::Toml => toml::from_str::<RawSource>(content).map_err(ParseError::Toml)?,
    };

    build_registry(source).map_err(RegistryError::from)
}

/// Parse an instrument table from any byte stream
pub fn read_registry<R: Read>(
    mut reader: R,
    format: SourceFormat,
) -> Result<InstrumentRegistry, RegistryError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(ParseError::Stream)?;
    parse_registry(&content, format)
}

/// Render a registry in the canonical single-element-array JSON form
pub fn render_json(registry: &InstrumentRegistry) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&[CanonicalTable(registry)])
}

/// Syntax errors are parse failures; a well-formed document of the wrong
/// shape is a schema failure.
fn json_error(err: serde_json::Error) -> RegistryError {
    match err.classify() {
        Category::Data => SchemaError::Shape {
            reason: err.to_string(),
        }
        .into(),
        Category::Syntax | Category::Eof | Category::Io => ParseError::Json(err).into(),
    }
}

/// Remove `//` line comments and `/* */` block comments outside string
/// literals. Newlines are kept so parser positions still match the file.
fn strip_comments(source: &str) -> Cow<'_, str> {
    if !source.contains('/') {
        return Cow::Borrowed(source);
    }

    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Entries of one instrument table, duplicates and order preserved
struct RawTable(Vec<(String, Value)>);

/// Outer shape of a source document
enum RawSource {
    Wrapped(Vec<RawTable>),
    Bare(RawTable),
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = RawTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of instruments keyed by symbol")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawTable, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((symbol, value)) = map.next_entry::<String, Value>()? {
            // serde_json hands non-integer numbers to `visit_map` under a private key
            if entries.is_empty() && symbol.starts_with(JSON_NUMBER_TOKEN) {
                return Err(de::Error::invalid_type(Unexpected::Other("number"), &self));
            }
            entries.push((symbol, value));
        }
        Ok(RawTable(entries))
    }
}

impl<'de> Deserialize<'de> for RawTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }
}

struct SourceVisitor;

impl<'de> Visitor<'de> for SourceVisitor {
    type Value = RawSource;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence holding one instrument table, or the table itself")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawSource, A::Error> {
        let mut tables = Vec::new();
        while let Some(table) = seq.next_element::<RawTable>()? {
            tables.push(table);
        }
        Ok(RawSource::Wrapped(tables))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RawSource, A::Error> {
        TableVisitor.visit_map(map).map(RawSource::Bare)
    }
}

impl<'de> Deserialize<'de> for RawSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SourceVisitor)
    }
}

fn build_registry(source: RawSource) -> Result<InstrumentRegistry, SchemaError> {
    let table = match source {
        RawSource::Bare(table) => table,
        RawSource::Wrapped(mut tables) => {
            if tables.len() != 1 {
                return Err(SchemaError::TableCount {
                    count: tables.len(),
                });
            }
            tables.remove(0)
        }
    };

    let records = table
        .0
        .into_iter()
        .map(|(symbol, value)| parse_entry(symbol, value))
        .collect::<Result<Vec<_>, _>>()?;

    InstrumentRegistry::from_records(records)
}

fn parse_entry(symbol: String, value: Value) -> Result<InstrumentRecord, SchemaError> {
    if symbol.is_empty() {
        return Err(SchemaError::EmptySymbol);
    }

    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(SchemaError::EntryNotObject {
                symbol,
                found: value_kind(&other),
            });
        }
    };

    for key in fields.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            debug!("{}: ignoring unknown field '{}'", symbol, key);
        }
    }

    let uic = uic_field(&symbol, &fields)?;
    let asset_type = string_field(&symbol, &fields, FIELD_ASSET_TYPE)?;
    let stop_loss_points = decimal_field(&symbol, &fields, FIELD_STOPLOSS_POINTS)?;
    let reference_moving_average = decimal_field(&symbol, &fields, FIELD_REFERENCE_MA)?;

    let record = InstrumentRecord::new(
        symbol,
        uic,
        AssetType::from(asset_type),
        stop_loss_points,
        reference_moving_average,
    )?;

    debug!(
        "Parsed {}: Uic={} AssetType={} SL={} 200MA={}",
        record.symbol,
        record.uic,
        record.asset_type,
        record.stop_loss_points,
        record.reference_moving_average
    );
    Ok(record)
}

fn required<'a>(
    symbol: &str,
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, SchemaError> {
    fields.get(field).ok_or_else(|| SchemaError::MissingField {
        symbol: symbol.to_string(),
        field,
    })
}

fn uic_field(symbol: &str, fields: &Map<String, Value>) -> Result<u64, SchemaError> {
    let value = required(symbol, fields, FIELD_UIC)?;

    if let Value::Number(number) = value {
        if let Some(uic) = number.as_u64() {
            return Ok(uic);
        }
        if number.is_i64() {
            return Err(SchemaError::NonPositive {
                symbol: symbol.to_string(),
                field: FIELD_UIC,
                value: number.to_string(),
            });
        }
    }

    Err(wrong_type(symbol, FIELD_UIC, "an integer", value))
}

fn string_field<'a>(
    symbol: &str,
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, SchemaError> {
    match required(symbol, fields, field)? {
        Value::String(text) => Ok(text),
        other => Err(wrong_type(symbol, field, "a string", other)),
    }
}

fn decimal_field(
    symbol: &str,
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Decimal, SchemaError> {
    let value = required(symbol, fields, field)?;

    let Value::Number(number) = value else {
        return Err(wrong_type(symbol, field, "a number", value));
    };

    // Numbers keep their source digits, so the decimal is exact.
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| wrong_type(symbol, field, "a number within decimal range", value))
}

fn wrong_type(symbol: &str, field: &'static str, expected: &'static str, found: &Value) -> SchemaError {
    let found = match found {
        Value::Number(number) => number.to_string(),
        other => value_kind(other).to_string(),
    };
    SchemaError::WrongType {
        symbol: symbol.to_string(),
        field,
        expected,
        found,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

struct CanonicalTable<'a>(&'a InstrumentRegistry);

impl Serialize for CanonicalTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            map.serialize_entry(&record.symbol, &CanonicalEntry(record))?;
        }
        map.end()
    }
}

struct CanonicalEntry<'a>(&'a InstrumentRecord);

impl Serialize for CanonicalEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.0;
        let mut map = serializer.serialize_map(Some(KNOWN_FIELDS.len()))?;
        map.serialize_entry(FIELD_UIC, &record.uic)?;
        map.serialize_entry(FIELD_ASSET_TYPE, record.asset_type.as_str())?;
        map.serialize_entry(FIELD_STOPLOSS_POINTS, &DecimalNumber(record.stop_loss_points))?;
        map.serialize_entry(
            FIELD_REFERENCE_MA,
            &DecimalNumber(record.reference_moving_average),
        )?;
        map.end()
    }
}

/// Writes a decimal as a JSON number with its exact digits
struct DecimalNumber(Decimal);

impl Serialize for DecimalNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.0.normalize().to_string();
        let number = serde_json::Number::from_str(&text).map_err(|_| {
            serde::ser::Error::custom(format!("decimal {} has no JSON number form", text))
        })?;
        number.serialize(serializer)
    }
}
