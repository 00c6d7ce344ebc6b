use serde_json::{Map, Value};
use tickertape_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", render_table(envelope)?),
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<String, CliError> {
    let mut out = String::new();
    push_line(&mut out, format!("request_id  : {}", envelope.meta.request_id));
    push_line(&mut out, format!("schema      : {}", envelope.meta.schema_version));
    push_line(&mut out, format!("generated_at: {}", envelope.meta.generated_at));
    push_line(&mut out, format!("latency_ms  : {}", envelope.meta.latency_ms));

    if !envelope.meta.warnings.is_empty() {
        push_line(&mut out, "warnings:");
        for warning in &envelope.meta.warnings {
            push_line(&mut out, format!("  - {warning}"));
        }
    }

    push_line(&mut out, "data:");
    match rows(&envelope.data) {
        Some(rows) if !rows.is_empty() => {
            for line in table_lines(rows) {
                push_line(&mut out, format!("  {line}"));
            }
        }
        _ => {
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                push_line(&mut out, format!("  {line}"));
            }
        }
    }

    if !envelope.errors.is_empty() {
        push_line(&mut out, "errors:");
        for error in &envelope.errors {
            push_line(&mut out, format!("  - {}: {}", error.code, error.message));
        }
    }

    Ok(out)
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

/// Objects to lay out as rows: the data itself when it is an array, or the
/// first array-of-objects field of an object (`quotes`, `stocks`, ...).
fn rows(data: &Value) -> Option<Vec<&Map<String, Value>>> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(fields) => fields.values().find_map(|value| match value {
            Value::Array(items) if items.first().is_some_and(Value::is_object) => Some(items),
            _ => None,
        })?,
        _ => return None,
    };
    items.iter().map(Value::as_object).collect()
}

fn table_lines(rows: Vec<&Map<String, Value>>) -> Vec<String> {
    let mut columns: Vec<&str> = Vec::new();
    for row in &rows {
        for (key, value) in row.iter() {
            if is_scalar(value) && !columns.contains(&key.as_str()) {
                columns.push(key.as_str());
            }
        }
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(*column).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            cells
                .iter()
                .map(|row| row[index].len())
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let format_row = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    let mut lines = vec![format_row(columns.clone())];
    lines.extend(
        cells
            .iter()
            .map(|row| format_row(row.iter().map(String::as_str).collect())),
    );
    lines
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => format!("{float:.2}"),
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tickertape_core::{EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};

    fn envelope(data: Value) -> Envelope<Value> {
        let meta = EnvelopeMeta::new("req-12345678", SCHEMA_VERSION, 12).expect("meta");
        Envelope::success(meta, data)
    }

    #[test]
    fn arrays_of_objects_render_as_columns() {
        let rendered = render_table(&envelope(json!({
            "quotes": [
                {"symbol": "AAPL", "price": 187.5, "session": {"volume": 1}},
                {"symbol": "MSFT", "price": 402.25}
            ]
        })))
        .expect("renders");

        assert!(rendered.contains("price   symbol"));
        assert!(rendered.contains("187.50  AAPL"));
        assert!(rendered.contains("402.25  MSFT"));
        assert!(!rendered.contains("session"));
    }

    #[test]
    fn errors_are_listed_after_data() {
        let mut envelope = envelope(Value::Null);
        envelope
            .push_error(EnvelopeError::new("not_found", "no quote for ZZZZ").expect("error"))
            .expect("valid");

        let rendered = render_table(&envelope).expect("renders");
        assert!(rendered.contains("errors:\n  - not_found: no quote for ZZZZ"));
    }
}
