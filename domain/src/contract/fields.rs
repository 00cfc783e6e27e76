//! Field accessors shared by the contracts.
//!
//! Each accessor takes the field path so errors name exactly what was wrong.

use super::error::ContractError;
use crate::analysis::location::Location;
use crate::core::string::truncate;
use serde_json::{Map, Value};

pub(crate) fn path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

pub(crate) fn item_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Short description of a JSON value for mismatch messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", truncate(s, 40)),
        Value::Array(a) => format!("array of {}", a.len()),
        Value::Object(_) => "object".to_string(),
    }
}

pub(crate) fn object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, ContractError> {
    value.as_object().ok_or_else(|| {
        let field = if field.is_empty() { "$" } else { field };
        ContractError::mismatch(field, "object", describe(value))
    })
}

/// A required key. Missing keys fail with `MissingField`; an explicit
/// `null` is a present value of the wrong type.
pub(crate) fn required<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<&'a Value, ContractError> {
    obj.get(key).ok_or_else(|| ContractError::missing(path(parent, key)))
}

/// An optional key. Both a missing key and `null` mean absent.
pub(crate) fn optional<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

pub(crate) fn string<'a>(value: &'a Value, field: &str) -> Result<&'a str, ContractError> {
    value
        .as_str()
        .ok_or_else(|| ContractError::mismatch(field, "string", describe(value)))
}

pub(crate) fn optional_string(
    obj: &Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<Option<String>, ContractError> {
    optional(obj, key)
        .map(|v| string(v, &path(parent, key)).map(str::to_string))
        .transpose()
}

pub(crate) fn array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, ContractError> {
    value
        .as_array()
        .ok_or_else(|| ContractError::mismatch(field, "array", describe(value)))
}

pub(crate) fn number(value: &Value, field: &str) -> Result<f64, ContractError> {
    value
        .as_f64()
        .ok_or_else(|| ContractError::mismatch(field, "number", describe(value)))
}

/// A non-negative integer. Integral floats (`3.0`) are accepted since some
/// providers emit every number as a float.
pub(crate) fn index(value: &Value, field: &str) -> Result<usize, ContractError> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n)
            .map_err(|_| ContractError::mismatch(field, "non-negative integer", describe(value)));
    }
    if let Some(f) = value.as_f64()
        && f >= 0.0
        && f.fract() == 0.0
        && f <= u32::MAX as f64
    {
        return Ok(f as usize);
    }
    Err(ContractError::mismatch(
        field,
        "non-negative integer",
        describe(value),
    ))
}

/// A `{lat, lng}` object with both coordinates in range.
pub(crate) fn location(value: &Value, field: &str) -> Result<Location, ContractError> {
    let obj = object(value, field)?;
    let lat_field = path(field, "lat");
    let lng_field = path(field, "lng");
    let lat = number(required(obj, field, "lat")?, &lat_field)?;
    let lng = number(required(obj, field, "lng")?, &lng_field)?;

    if !Location::valid_lat(lat) {
        return Err(ContractError::mismatch(
            lat_field,
            "latitude in [-90, 90]",
            format!("{}", lat),
        ));
    }
    if !Location::valid_lng(lng) {
        return Err(ContractError::mismatch(
            lng_field,
            "longitude in [-180, 180]",
            format!("{}", lng),
        ));
    }
    Ok(Location { lat, lng })
}
