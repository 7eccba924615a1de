use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use serde_json::{Map, Value};

use crate::error::ParseError;

/// Reads the first sheet of an XLSX/XLS workbook into row maps keyed by the
/// first row. Date-formatted cells are rendered as "YYYY-MM-DD HH:MM:SS"
/// strings so the temporal normalizer sees them the way CSV exports spell
/// them. A corrupt workbook is a structural error.
pub fn read_rows(bytes: &[u8]) -> Result<(Vec<String>, Vec<Map<String, Value>>), ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Ok((Vec::new(), Vec::new()));
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_str(cell).unwrap_or_default().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for row in rows_iter {
        let mut map = Map::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let Some(cell) = row.get(i) else { continue };
            let Some(value) = cell_value(cell) else {
                continue;
            };
            map.insert(header.clone(), value);
        }
        // sheets often trail off into blank rows after the data
        if !map.is_empty() {
            rows.push(map);
        }
    }

    Ok((headers, rows))
}

fn cell_str(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::Empty => None,
        _ => Some(cell.to_string()),
    }
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
        Data::Int(i) => Some(Value::Number((*i).into())),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => Some(Value::String(excel_serial_to_string(dt.as_f64()))),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
        Data::Error(_) => None,
    }
}

/// Excel serial datetime conversion using the 1899-12-30 base (common
/// convention); the fractional part carries the time of day.
fn excel_serial_to_string(serial: f64) -> String {
    if !serial.is_finite() {
        return String::new();
    }
    let days = serial.floor() as i64;
    let seconds = ((serial - serial.floor()) * 86_400.0).round() as i64;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let resolved = base + Duration::days(days) + Duration::seconds(seconds);
    resolved.format("%Y-%m-%d %H:%M:%S").to_string()
}
