//! Parsing of spreadsheet gviz export payloads.
//!
//! The export endpoint answers with a JSONP wrapper around a JSON document
//! shaped like `{"table": {"rows": [{"c": [{"v": ...}, null, ...]}]}}`.
//! Each row becomes a [`Record`]; numeric cells are coerced leniently and
//! anything unparseable becomes 0.

use crate::config::ColumnLayout;
use crate::models::{Month, Record};
use crate::source::SourceError;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Top-level gviz response.
#[derive(Debug, Deserialize)]
pub struct GvizResponse {
    pub table: GvizTable,
}

#[derive(Debug, Default, Deserialize)]
pub struct GvizTable {
    #[serde(default)]
    pub rows: Vec<GvizRow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GvizRow {
    #[serde(default)]
    pub c: Option<Vec<Option<GvizCell>>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GvizCell {
    #[serde(default)]
    pub v: Option<Value>,
}

impl GvizRow {
    fn value(&self, index: usize) -> Option<&Value> {
        self.c
            .as_ref()?
            .get(index)?
            .as_ref()?
            .v
            .as_ref()
    }
}

/// Strip the JSONP wrapper, returning the JSON document inside.
///
/// A payload that already is a bare JSON object is returned unchanged.
pub fn strip_jsonp(text: &str) -> Result<&str, SourceError> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    let start = trimmed
        .find("setResponse(")
        .map(|i| i + "setResponse(".len())
        .or_else(|| trimmed.find('{'))
        .ok_or_else(|| SourceError::MalformedPayload("no JSON object found".to_string()))?;
    let end = trimmed
        .rfind(')')
        .filter(|&e| e > start)
        .or_else(|| trimmed.rfind('}').map(|e| e + 1))
        .ok_or_else(|| SourceError::MalformedPayload("unterminated JSON object".to_string()))?;

    if end <= start {
        return Err(SourceError::MalformedPayload(
            "unterminated JSON object".to_string(),
        ));
    }

    Ok(trimmed[start..end].trim())
}

/// Parse a raw (possibly wrapped) payload into records.
pub fn parse_records(
    payload: &str,
    layout: &ColumnLayout,
    default_year: i32,
) -> Result<Vec<Record>, SourceError> {
    let body = strip_jsonp(payload)?;
    let response: GvizResponse = serde_json::from_str(body)?;
    Ok(records_from_table(&response.table, layout, default_year))
}

/// Convert table rows to records, skipping rows whose first cell is falsy.
pub fn records_from_table(
    table: &GvizTable,
    layout: &ColumnLayout,
    default_year: i32,
) -> Vec<Record> {
    let mut records = Vec::with_capacity(table.rows.len());

    for (index, row) in table.rows.iter().enumerate() {
        if !row.value(0).is_some_and(is_truthy) {
            debug!("Skipping row {}: empty first cell", index);
            continue;
        }

        let year = row
            .value(layout.year)
            .filter(|v| is_truthy(v))
            .map(cell_number)
            .filter(|y| *y != 0.0)
            .map(|y| y as i32)
            .unwrap_or(default_year);

        let coordinator = layout
            .coordinator
            .map(|c| cell_string(row.value(c)))
            .filter(|c| !c.is_empty());

        records.push(Record {
            clinic: cell_string(row.value(layout.clinic)),
            executive: cell_string(row.value(layout.executive)),
            coordinator,
            team: cell_string(row.value(layout.team)),
            retention: Record::retention_from_raw(
                row.value(layout.retention).map_or(0.0, cell_number),
            ),
            nap: row.value(layout.nap).map_or(0.0, cell_number),
            deals: row.value(layout.deals).map_or(0.0, cell_number),
            month: Month::parse(&cell_string(row.value(layout.month))),
            year,
        });
    }

    records
}

/// Spreadsheet truthiness: null, false, 0 and "" are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text of a cell; falsy cells become the empty string.
fn cell_string(value: Option<&Value>) -> String {
    match value {
        Some(v) if is_truthy(v) => match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.to_string(),
                None => n.as_f64().map(|f| f.to_string()).unwrap_or_default(),
            },
            other => other.to_string(),
        },
        _ => String::new(),
    }
}

/// Numeric value of a cell, 0 when it cannot be read as a number.
fn cell_number(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_leading_float(s),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// Parse the longest numeric prefix of `text` (`"85%"` reads as 85).
fn parse_leading_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return 0.0;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WRAPPED: &str = r#"/*O_o*/
google.visualization.Query.setResponse({"version":"0.6","status":"ok","table":{"cols":[],"rows":[
{"c":[{"v":"Clinica Norte"},{"v":"Ana"},{"v":"Equipo A"},{"v":85.5},{"v":1200},{"v":3},{"v":"JUNIO"},{"v":2025}]},
{"c":[{"v":"Clinica Norte"},{"v":"Beto"},{"v":"Equipo A"},{"v":0},{"v":"300"},null,{"v":"JULIO"},null]},
{"c":[null,{"v":"Ghost"},{"v":"Equipo B"},{"v":90},{"v":10},{"v":1},{"v":"JUNIO"},{"v":2025}]},
{"c":[{"v":""},{"v":"Blank"},{"v":"Equipo B"},{"v":90},{"v":10},{"v":1},{"v":"JUNIO"},{"v":2025}]},
{"c":[{"v":"Clinica Sur"},{"v":"Caro"},{"v":"Equipo B"},{"v":"72%"},{"v":"n/a"},{"v":2},{"v":"AGOSTO"},{"v":2024}]}
]}});"#;

    #[test]
    fn test_strip_jsonp() {
        let body = strip_jsonp(WRAPPED).unwrap();
        assert!(body.starts_with('{'));
        assert!(body.ends_with('}'));

        assert_eq!(strip_jsonp(r#" {"table":{}} "#).unwrap(), r#"{"table":{}}"#);
        assert!(strip_jsonp("not a payload").is_err());
    }

    #[test]
    fn test_parse_records_skips_falsy_first_cell() {
        let records = parse_records(WRAPPED, &ColumnLayout::default(), 2025).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.executive.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Beto", "Caro"]);
    }

    #[test]
    fn test_parse_records_field_coercion() {
        let records = parse_records(WRAPPED, &ColumnLayout::default(), 2025).unwrap();

        let ana = &records[0];
        assert_eq!(ana.clinic, "Clinica Norte");
        assert_eq!(ana.team, "Equipo A");
        assert_eq!(ana.retention, Some(85.5));
        assert_eq!(ana.nap, 1200.0);
        assert_eq!(ana.deals, 3.0);
        assert_eq!(ana.month, Some(Month::June));
        assert_eq!(ana.year, 2025);

        let beto = &records[1];
        assert_eq!(beto.retention, None);
        assert_eq!(beto.nap, 300.0);
        assert_eq!(beto.deals, 0.0);
        assert_eq!(beto.year, 2025);

        let caro = &records[2];
        assert_eq!(caro.retention, Some(72.0));
        assert_eq!(caro.nap, 0.0);
        assert_eq!(caro.month, Some(Month::August));
        assert_eq!(caro.year, 2024);
        assert_eq!(caro.coordinator, None);
    }

    #[test]
    fn test_coordinator_column() {
        let payload = r#"{"table":{"rows":[
            {"c":[{"v":"Norte"},{"v":"Ana"},{"v":"T1"},{"v":80},{"v":10},{"v":1},{"v":"JUNIO"},{"v":2025},{"v":"Luis"}]},
            {"c":[{"v":"Norte"},{"v":"Beto"},{"v":"T1"},{"v":80},{"v":10},{"v":1},{"v":"JUNIO"},{"v":2025}]}
        ]}}"#;
        let layout = ColumnLayout {
            coordinator: Some(8),
            ..ColumnLayout::default()
        };
        let records = parse_records(payload, &layout, 2025).unwrap();

        assert_eq!(records[0].coordinator.as_deref(), Some("Luis"));
        assert_eq!(records[1].coordinator, None);
    }

    #[test]
    fn test_numeric_identifier_cells_become_strings() {
        let payload = r#"{"table":{"rows":[{"c":[{"v":101},{"v":7},{"v":2.5}]}]}}"#;
        let records = parse_records(payload, &ColumnLayout::default(), 2025).unwrap();

        assert_eq!(records[0].clinic, "101");
        assert_eq!(records[0].executive, "7");
        assert_eq!(records[0].team, "2.5");
        assert_eq!(records[0].month, None);
    }

    #[test]
    fn test_rows_without_cells_are_skipped() {
        let payload = r#"{"table":{"rows":[{"c":null},{}]}}"#;
        let records = parse_records(payload, &ColumnLayout::default(), 2025).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let result = parse_records("setResponse({\"table\": [});", &ColumnLayout::default(), 2025);
        assert!(matches!(result, Err(SourceError::Json(_))));
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("85%"), 85.0);
        assert_eq!(parse_leading_float("  -3.5kg"), -3.5);
        assert_eq!(parse_leading_float(".5"), 0.5);
        assert_eq!(parse_leading_float("1e3x"), 1000.0);
        assert_eq!(parse_leading_float("1e"), 1.0);
        assert_eq!(parse_leading_float("abc"), 0.0);
        assert_eq!(parse_leading_float(""), 0.0);
        assert_eq!(parse_leading_float("-"), 0.0);
    }
}
