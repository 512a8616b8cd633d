use crate::domains::export::config::CollectionConfig;
use crate::domains::export::types::{
    ColumnSpec, FlatRow, FlattenDiagnostic, RawRow, DEFAULT_COLUMN_WIDTH,
};
use serde_json::Value;

/// Separator for values joined out of a to-many relation.
const MULTI_VALUE_SEPARATOR: &str = ", ";

/// Derives the ordered column list for a collection: scalar columns first in
/// declared order, then one `<relation>_<column>` entry per relation column.
///
/// The key sequence is exactly the set of keys [`flatten_rows`] can emit, in
/// the same order; both sides read [`CollectionConfig::flattened_keys`], which
/// is what keeps headers and rows aligned.
pub fn derive_columns(config: &CollectionConfig) -> Vec<ColumnSpec> {
    config
        .flattened_keys()
        .into_iter()
        .map(|key| {
            let label = display_label(&key);
            ColumnSpec {
                key,
                label,
                width: DEFAULT_COLUMN_WIDTH,
            }
        })
        .collect()
}

/// Turns a flat-row key into a human label: word separators become spaces and
/// each word is capitalized ("author_name" → "Author Name"). Pure function of
/// the key; no config lookup.
pub fn display_label(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flattens raw store rows into display-string records, driven by the same
/// config the query was built from.
///
/// Output length and order match the input exactly; pagination correctness
/// depends on that. Malformed relation shapes never abort the batch: the
/// affected cells degrade to empty strings and a [`FlattenDiagnostic`] is
/// recorded for each recovery.
pub fn flatten_rows(
    rows: &[RawRow],
    config: &CollectionConfig,
) -> (Vec<FlatRow>, Vec<FlattenDiagnostic>) {
    let mut diagnostics = Vec::new();
    let flat = rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| flatten_row(row_index, row, config, &mut diagnostics))
        .collect();
    (flat, diagnostics)
}

fn flatten_row(
    row_index: usize,
    row: &RawRow,
    config: &CollectionConfig,
    diagnostics: &mut Vec<FlattenDiagnostic>,
) -> FlatRow {
    let mut flat = FlatRow::new();

    // Scalars keep their own keys. A missing scalar is omitted entirely,
    // unlike relation columns which always emit a key.
    for name in &config.scalar_columns {
        if let Some(value) = row.get(name) {
            flat.insert(name.clone(), Value::String(display_value(value)));
        }
    }

    for (relation, relation_config) in &config.relations {
        let cells = match extract_relation(row.get(relation), &relation_config.columns) {
            Ok(cells) => cells,
            Err(reason) => {
                log::warn!(
                    "relation '{}' on row {} degraded to empty cells: {}",
                    relation,
                    row_index,
                    reason
                );
                diagnostics.push(FlattenDiagnostic {
                    row_index,
                    relation: relation.clone(),
                    reason,
                });
                vec![String::new(); relation_config.columns.len()]
            }
        };
        for (column, cell) in relation_config.columns.iter().zip(cells) {
            flat.insert(format!("{}_{}", relation, column), Value::String(cell));
        }
    }

    flat
}

/// One display string per relation column, or the reason the relation shape
/// could not be read at all.
fn extract_relation(value: Option<&Value>, columns: &[String]) -> Result<Vec<String>, String> {
    match value {
        // Unset relation: stable empty cells, keys still emitted.
        None | Some(Value::Null) => Ok(vec![String::new(); columns.len()]),
        Some(Value::Object(nested)) => Ok(columns
            .iter()
            .map(|column| nested.get(column).map(display_value).unwrap_or_default())
            .collect()),
        Some(Value::Array(entries)) => Ok(columns
            .iter()
            .map(|column| {
                entries
                    .iter()
                    .filter_map(|entry| match entry {
                        Value::Null => None,
                        Value::Object(nested) => match nested.get(column) {
                            None | Some(Value::Null) => None,
                            Some(value) => Some(display_value(value)),
                        },
                        // A scalar where a related record belongs; skip it
                        // rather than poisoning the joined cell.
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(MULTI_VALUE_SEPARATOR)
            })
            .collect()),
        Some(other) => Err(format!(
            "expected null, object or array of objects, got {}",
            json_type_name(other)
        )),
    }
}

/// Coerces a stored value to its spreadsheet display string. Nested
/// structures fall back to compact JSON; that only happens when a config
/// points a scalar column at a non-scalar field.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
