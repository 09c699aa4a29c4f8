//! Type coercion core.
//!
//! [`coerce`] turns a raw parameter value (string, number, boolean, list or an
//! already-typed object) into the JSON shape a [`TypeTag`] describes. The
//! input is never modified; a new value is always produced.

use super::content::CoercionContext;
use super::error::{MappingError, MappingResult};
use super::shape::json_kind;
use super::tag::TypeTag;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value, json};

const PAIR_GRAMMAR: &str = "'key:value'";
const PORT_GRAMMAR: &str = "'[hostPort:]containerPort[/tcp|udp]'";
const STEP_GRAMMAR: &str = "'lowerBound:upperBound:adjustment' (bounds may be empty)";
const SUBNET_GRAMMAR: &str = "'subnetId[:allocationId]'";
const SIX_DIGIT_MAX: i64 = 999_999;

/// Coerce `raw` into the shape required by `tag`.
///
/// `null` coerces to `null` for every tag, which makes the matching
/// assignment a no-op.
pub fn coerce(raw: &Value, tag: TypeTag, ctx: &mut CoercionContext) -> MappingResult<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    match tag {
        TypeTag::Str => Ok(Value::String(scalar_text(raw, "a string")?)),
        TypeTag::Int => {
            let n = to_i64(raw)?;
            if i32::try_from(n).is_err() {
                return Err(MappingError::coercion(n, "a 32-bit integer"));
            }
            Ok(json!(n))
        }
        TypeTag::Int64 => Ok(json!(to_i64(raw)?)),
        TypeTag::Float => {
            let f = to_f64(raw)?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| MappingError::coercion(f, "a finite number"))
        }
        TypeTag::Bool => Ok(Value::Bool(to_bool(raw)?)),
        TypeTag::BoolAttribute => Ok(json!({ "Value": to_bool(raw)? })),
        TypeTag::StringAttribute => Ok(json!({ "Value": scalar_text(raw, "a string")? })),
        TypeTag::StringSlice => {
            let items = items(raw)
                .into_iter()
                .map(|v| scalar_text(v, "a list of strings").map(Value::String))
                .collect::<MappingResult<Vec<_>>>()?;
            Ok(Value::Array(items))
        }
        TypeTag::Int64Slice => {
            let items = items(raw)
                .into_iter()
                .map(|v| to_i64(v).map(|n| json!(n)))
                .collect::<MappingResult<Vec<_>>>()?;
            Ok(Value::Array(items))
        }
        TypeTag::StringPointerMap => string_map(raw),
        TypeTag::CsvString => {
            let parts = items(raw)
                .into_iter()
                .map(|v| scalar_text(v, "a list of strings"))
                .collect::<MappingResult<Vec<_>>>()?;
            Ok(Value::String(parts.join(",")))
        }
        TypeTag::SixDigitString => {
            let n = to_i64(raw)?;
            if !(0..=SIX_DIGIT_MAX).contains(&n) {
                return Err(MappingError::coercion(n, "an integer between 0 and 999999"));
            }
            Ok(Value::String(format!("{:06}", n)))
        }
        TypeTag::ByteSlice => Ok(bytes_value(scalar_text(raw, "a string")?.as_bytes())),
        TypeTag::Base64String => Ok(Value::String(
            BASE64.encode(scalar_text(raw, "a string")?.as_bytes()),
        )),
        TypeTag::Timestamp => timestamp(raw),
        TypeTag::Json => Ok(raw.clone()),
        TypeTag::FileToBase64 => {
            let bytes = ctx.load(&content_ref(raw)?)?;
            Ok(Value::String(BASE64.encode(bytes)))
        }
        TypeTag::FileToBytes => {
            let bytes = ctx.load(&content_ref(raw)?)?;
            Ok(bytes_value(&bytes))
        }
        TypeTag::FileToString => {
            let source = content_ref(raw)?;
            let bytes = ctx.load(&source)?;
            utf8(&source, bytes).map(Value::String)
        }
        TypeTag::UserDataToBase64 => {
            let source = content_ref(raw)?;
            let bytes = ctx.load(&source)?;
            let rendered = ctx.render(&source, bytes);
            Ok(Value::String(BASE64.encode(rendered)))
        }
        TypeTag::TemplateToString => {
            let source = content_ref(raw)?;
            let bytes = ctx.load(&source)?;
            let rendered = ctx.render(&source, bytes);
            utf8(&source, rendered).map(Value::String)
        }
        TypeTag::Dimensions => pair_list(raw, "Name", "Value"),
        TypeTag::Tags => pair_list(raw, "Key", "Value"),
        TypeTag::StackParameters => pair_list(raw, "ParameterKey", "ParameterValue"),
        TypeTag::PortMappings => element_list(raw, PORT_GRAMMAR, port_mapping),
        TypeTag::StepAdjustments => element_list(raw, STEP_GRAMMAR, step_adjustment),
        TypeTag::SubnetMappings => element_list(raw, SUBNET_GRAMMAR, subnet_mapping),
    }
}

/// A single value or every element of a list
fn items(raw: &Value) -> Vec<&Value> {
    match raw {
        Value::Array(values) => values.iter().filter(|v| !v.is_null()).collect(),
        other => vec![other],
    }
}

fn scalar_text(raw: &Value, expected: &str) -> MappingResult<String> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(MappingError::coercion(other, format!("{}, got {}", expected, json_kind(other)))),
    }
}

/// Text of a value as the user typed it, without JSON quoting
fn literal(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Integers may arrive as numbers or strings; `3.0` and `"3.0"` both give 3
fn to_i64(raw: &Value) -> MappingResult<i64> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral))
            .ok_or_else(|| MappingError::coercion(n, "an integer")),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .ok_or_else(|| MappingError::coercion(s, "an integer"))
        }
        other => Err(MappingError::coercion(other, "an integer")),
    }
}

fn to_f64(raw: &Value) -> MappingResult<f64> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| MappingError::coercion(n, "a number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| MappingError::coercion(s, "a number")),
        other => Err(MappingError::coercion(other, "a number")),
    }
}

fn to_bool(raw: &Value) -> MappingResult<bool> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(MappingError::coercion(s, "a boolean (true/false)")),
        },
        other => Err(MappingError::coercion(other, "a boolean (true/false)")),
    }
}

fn content_ref(raw: &Value) -> MappingResult<String> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        other => Err(MappingError::coercion(
            literal(other),
            "a file path, an http(s) URL or inline text starting with '#'",
        )),
    }
}

fn utf8(source: &str, bytes: Vec<u8>) -> MappingResult<String> {
    String::from_utf8(bytes).map_err(|_| MappingError::Content {
        source_ref: source.to_string(),
        message: "content is not valid UTF-8 text".to_string(),
    })
}

fn bytes_value(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|b| json!(b)).collect())
}

fn timestamp(raw: &Value) -> MappingResult<Value> {
    const EXPECTED: &str = "an RFC 3339 timestamp, a YYYY-MM-DD date or unix seconds";

    let parsed: Option<DateTime<Utc>> = match raw {
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc())
                })
        }
        _ => None,
    };

    parsed
        .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .ok_or_else(|| MappingError::coercion(literal(raw), EXPECTED))
}

fn string_map(raw: &Value) -> MappingResult<Value> {
    let mut out = Map::new();

    if let Value::Object(entries) = raw {
        for (key, value) in entries {
            if value.is_null() {
                continue;
            }
            out.insert(key.clone(), Value::String(scalar_text(value, "a map of strings")?));
        }
        return Ok(Value::Object(out));
    }

    for item in items(raw) {
        let text = element_text(item, PAIR_GRAMMAR)?;
        let (key, value) = split_pair(&text)?;
        out.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(Value::Object(out))
}

fn pair_list(raw: &Value, key_field: &str, value_field: &str) -> MappingResult<Value> {
    element_list(raw, PAIR_GRAMMAR, |text| {
        let (key, value) = split_pair(text)?;
        let mut obj = Map::new();
        obj.insert(key_field.to_string(), Value::String(key.to_string()));
        obj.insert(value_field.to_string(), Value::String(value.to_string()));
        Ok(Value::Object(obj))
    })
}

/// Apply `parse` to every element; the first malformed element aborts
fn element_list<F>(raw: &Value, grammar: &str, mut parse: F) -> MappingResult<Value>
where
    F: FnMut(&str) -> MappingResult<Value>,
{
    let parsed = items(raw)
        .into_iter()
        .map(|item| {
            let text = element_text(item, grammar)?;
            parse(&text)
        })
        .collect::<MappingResult<Vec<_>>>()?;
    Ok(Value::Array(parsed))
}

fn element_text(item: &Value, grammar: &str) -> MappingResult<String> {
    match item {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(MappingError::coercion(other, grammar)),
    }
}

fn split_pair(text: &str) -> MappingResult<(&str, &str)> {
    match text.split_once(':') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(MappingError::coercion(text, PAIR_GRAMMAR)),
    }
}

fn port_number(text: &str, element: &str) -> MappingResult<u16> {
    text.trim()
        .parse::<u16>()
        .map_err(|_| MappingError::coercion(element, PORT_GRAMMAR))
}

fn port_mapping(element: &str) -> MappingResult<Value> {
    let bad = || MappingError::coercion(element, PORT_GRAMMAR);

    let (ports, protocol) = match element.split('/').collect::<Vec<_>>().as_slice() {
        [ports] => (*ports, None),
        [ports, protocol] => {
            let protocol = protocol.trim().to_ascii_lowercase();
            if protocol != "tcp" && protocol != "udp" {
                return Err(bad());
            }
            (*ports, Some(protocol))
        }
        _ => return Err(bad()),
    };

    let mut obj = Map::new();
    match ports.split(':').collect::<Vec<_>>().as_slice() {
        [container] => {
            obj.insert("ContainerPort".into(), json!(port_number(container, element)?));
        }
        [host, container] => {
            obj.insert("HostPort".into(), json!(port_number(host, element)?));
            obj.insert("ContainerPort".into(), json!(port_number(container, element)?));
        }
        _ => return Err(bad()),
    }
    if let Some(protocol) = protocol {
        obj.insert("Protocol".into(), Value::String(protocol));
    }

    Ok(Value::Object(obj))
}

fn step_adjustment(element: &str) -> MappingResult<Value> {
    let bad = || MappingError::coercion(element, STEP_GRAMMAR);

    let parts: Vec<&str> = element.split(':').collect();
    let [lower, upper, adjustment] = parts.as_slice() else {
        return Err(bad());
    };

    let bound = |text: &str| -> MappingResult<Option<f64>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<f64>().map(Some).map_err(|_| bad())
    };

    let mut obj = Map::new();
    if let Some(lower) = bound(lower)? {
        obj.insert("MetricIntervalLowerBound".into(), json!(lower));
    }
    if let Some(upper) = bound(upper)? {
        obj.insert("MetricIntervalUpperBound".into(), json!(upper));
    }
    let adjustment = adjustment.trim().parse::<i64>().map_err(|_| bad())?;
    obj.insert("ScalingAdjustment".into(), json!(adjustment));

    Ok(Value::Object(obj))
}

fn subnet_mapping(element: &str) -> MappingResult<Value> {
    let mut obj = Map::new();
    match element.split(':').collect::<Vec<_>>().as_slice() {
        [subnet] if !subnet.is_empty() => {
            obj.insert("SubnetId".into(), json!(subnet));
        }
        [subnet, allocation] if !subnet.is_empty() && !allocation.is_empty() => {
            obj.insert("SubnetId".into(), json!(subnet));
            obj.insert("AllocationId".into(), json!(allocation));
        }
        _ => return Err(MappingError::coercion(element, SUBNET_GRAMMAR)),
    }
    Ok(Value::Object(obj))
}
