use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MIME type of the binary spreadsheet download.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Default spreadsheet column width, in character units.
pub const DEFAULT_COLUMN_WIDTH: f64 = 20.0;

/// One record as returned by the data store: scalar fields plus, per relation
/// name, either `Null`, a single nested object, or an array of nested
/// objects. Key order is preserved (`serde_json` with `preserve_order`).
pub type RawRow = serde_json::Map<String, Value>;

/// One flattened record ready for the table UI or a spreadsheet row.
///
/// Values are always `Value::String` display strings; relation fields use
/// namespaced `<relation>_<column>` keys. A scalar column that is absent from
/// the raw row is omitted here too, while relation keys are always present.
pub type FlatRow = serde_json::Map<String, Value>;

/// Field selection of a store query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSelection {
    /// Select every stored field ("*").
    All,
    /// Select exactly these fields, in order.
    Fields(Vec<String>),
}

/// Sub-field selection for one populated relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulateSpec {
    /// Non-empty, ordered list of columns to extract from each related
    /// entity. A bare single-column config shorthand is normalized to a
    /// one-element list before it ever reaches this type.
    pub select: Vec<String>,
}

/// Filter predicate of a store query. Locale equality is the only filter the
/// export feature applies; `count` must receive the exact same clause as the
/// row query so the two stay consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhereClause {
    pub locale: Option<String>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.locale.is_none()
    }
}

/// Deterministic sort key. Fixed to the primary identifier ascending so that
/// pagination is stable across pages; not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub ascending: bool,
}

impl Default for OrderBy {
    fn default() -> Self {
        Self {
            field: "id".to_string(),
            ascending: true,
        }
    }
}

/// Store-agnostic query descriptor produced by the query builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub select: FieldSelection,
    /// Relation name → sub-field selection, in config declaration order.
    pub populate: Vec<(String, PopulateSpec)>,
    pub where_clause: WhereClause,
    pub order_by: OrderBy,
    /// `None` for both limit and offset means "no pagination" (full export).
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One dropdown entry: a collection the operator may export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOption {
    pub label: String,
    pub value: String,
}

/// Kind of a schema catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaKind {
    /// A set of structurally similar entities ("articles").
    Collection,
    /// A one-off singleton ("homepage"); never exportable.
    Single,
}

/// One entry of the external schema catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub uid: String,
    pub display_name: String,
    pub kind: SchemaKind,
}

/// Column spec handed to the table UI and the spreadsheet sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Flat-row key this column reads from.
    pub key: String,
    /// Human label derived from the key ("author_name" → "Author Name").
    pub label: String,
    pub width: f64,
}

/// Structured record of a recovered relation-extraction failure.
///
/// Flattening never aborts the batch on a malformed nested shape; the
/// affected cells degrade to empty strings and one of these is emitted
/// instead of a console message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenDiagnostic {
    pub row_index: usize,
    pub relation: String,
    pub reason: String,
}

/// One page of flattened table data.
#[derive(Debug, Clone, Serialize)]
pub struct TablePage {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<FlatRow>,
    /// Total matching rows under the same filter, ignoring pagination.
    pub count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<FlattenDiagnostic>,
}

/// A finished binary spreadsheet plus the metadata a download response needs.
#[derive(Debug, Clone)]
pub struct SpreadsheetDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}
