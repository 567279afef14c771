use nu_protocol::{PipelineData, Record, Span, Value};
use serde_json::{Map, Number, Value as JsonValue};

use crate::algo::compose::Document;
use crate::pipeline::ClusteringResponse;

/// Flatten pipeline input into rows.
///
/// Tables and lists pass through row by row, a single value becomes one row,
/// and `nothing` becomes no rows.
pub fn input_rows(input: PipelineData) -> Vec<Value> {
    match input {
        PipelineData::Value(Value::List { vals, .. }, _) => vals,
        PipelineData::Value(Value::Nothing { .. }, _) => vec![],
        PipelineData::Value(value, _) => vec![value],
        other => other.into_iter().collect(),
    }
}

/// Read the selected fields of a row into a document.
///
/// Field values go through the same JSON rendering the CLI input uses, so
/// lists and records compose as compact JSON text. Missing fields compose to
/// the empty string. A bare string row fills the first field.
pub fn row_to_document(row: &Value, fields: &[String]) -> Document {
    if let Value::String { val, .. } = row {
        return Document::from_pairs(fields.first().map(|f| (f.as_str(), val.as_str())));
    }
    let map: Map<String, JsonValue> = fields
        .iter()
        .filter_map(|field| {
            row.get_data_by_key(field)
                .map(|v| (field.clone(), to_json(&v)))
        })
        .collect();
    Document::new(map)
}

/// Nushell value as JSON. Scalars without a JSON form use their string coercion.
fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Nothing { .. } => JsonValue::Null,
        Value::Bool { val, .. } => JsonValue::Bool(*val),
        Value::Int { val, .. } => JsonValue::from(*val),
        Value::Float { val, .. } => Number::from_f64(*val)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::String { val, .. } => JsonValue::String(val.clone()),
        Value::List { vals, .. } => JsonValue::Array(vals.iter().map(to_json).collect()),
        Value::Record { val, .. } => JsonValue::Object(
            val.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        other => other
            .coerce_string()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
    }
}

/// Convert a pipeline response into a Nushell record.
pub fn response_to_value(response: &ClusteringResponse, span: Span) -> Value {
    let points: Vec<Value> = response
        .scatter_plot_data
        .iter()
        .map(|p| {
            let mut r = Record::new();
            r.push("x", Value::float(p.x, span));
            r.push("y", Value::float(p.y, span));
            r.push("topic_id", Value::string(&p.topic_id, span));
            r.push("text_snippet", Value::string(&p.text_snippet, span));
            Value::record(r, span)
        })
        .collect();

    let topics: Vec<Value> = response
        .topics
        .iter()
        .map(|t| {
            let mut r = Record::new();
            r.push("id", Value::string(&t.id, span));
            r.push("name", Value::string(&t.name, span));
            r.push("count", Value::int(t.count as i64, span));
            r.push("percentage", Value::string(&t.percentage, span));
            Value::record(r, span)
        })
        .collect();

    let mut output = Record::new();
    output.push("message", Value::string(&response.message, span));
    output.push("scatter_plot_data", Value::list(points, span));
    output.push("topics", Value::list(topics, span));
    Value::record(output, span)
}
