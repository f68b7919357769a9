//! EIP-712 v4 typed-data hashing.
//!
//! Supports the structured subset `eth_signTypedData_v4` callers use:
//! atomic types (`uintN`/`intN`/`bool`/`address`/`bytesN`), dynamic
//! `bytes`/`string`, arrays (fixed and dynamic), and nested structs.

use serde::Deserialize;
use serde_json::Value;
use shared_crypto::keccak256;
use shared_types::{WalletError, WalletResult};
use std::collections::{BTreeMap, BTreeSet};

/// One field of a struct type.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// The wire shape of `eth_signTypedData_v4`'s second parameter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: BTreeMap<String, Vec<FieldDef>>,
    pub primary_type: String,
    pub domain: Value,
    pub message: Value,
}

/// The digest `eth_signTypedData_v4` signs:
/// `keccak(0x1901 || hashStruct(domain) || hashStruct(message))`.
///
/// # Errors
///
/// `invalid-params` for unknown types, missing fields, or values that do
/// not fit their declared type.
pub fn typed_data_digest(data: &TypedData) -> WalletResult<[u8; 32]> {
    let domain_hash = hash_struct(data, "EIP712Domain", &data.domain)?;
    let message_hash = hash_struct(data, &data.primary_type, &data.message)?;

    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(&domain_hash);
    preimage.extend_from_slice(&message_hash);
    Ok(keccak256(&preimage))
}

/// `keccak(typeHash || enc(values))` for one struct instance.
fn hash_struct(data: &TypedData, type_name: &str, value: &Value) -> WalletResult<[u8; 32]> {
    let fields = struct_fields(data, type_name)?;
    let object = value
        .as_object()
        .ok_or_else(|| invalid(format!("value of {type_name} must be an object")))?;

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(&type_hash(data, type_name)?);
    for field in fields {
        let field_value = object.get(&field.name).ok_or_else(|| {
            invalid(format!("{type_name}.{} is missing", field.name))
        })?;
        encoded.extend_from_slice(&encode_value(data, &field.field_type, field_value)?);
    }
    Ok(keccak256(&encoded))
}

fn type_hash(data: &TypedData, type_name: &str) -> WalletResult<[u8; 32]> {
    Ok(keccak256(encode_type(data, type_name)?.as_bytes()))
}

/// `Primary(...)` followed by every referenced struct type in
/// alphabetical order.
fn encode_type(data: &TypedData, type_name: &str) -> WalletResult<String> {
    let mut referenced = BTreeSet::new();
    collect_dependencies(data, type_name, &mut referenced)?;
    referenced.remove(type_name);

    let mut out = single_type_encoding(data, type_name)?;
    for dependency in referenced {
        out.push_str(&single_type_encoding(data, dependency)?);
    }
    Ok(out)
}

fn single_type_encoding(data: &TypedData, type_name: &str) -> WalletResult<String> {
    let fields = struct_fields(data, type_name)?;
    let body: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.field_type, f.name))
        .collect();
    Ok(format!("{type_name}({})", body.join(",")))
}

fn collect_dependencies<'a>(
    data: &'a TypedData,
    type_name: &'a str,
    seen: &mut BTreeSet<&'a str>,
) -> WalletResult<()> {
    if !seen.insert(type_name) {
        return Ok(());
    }
    for field in struct_fields(data, type_name)? {
        let base = base_type(&field.field_type);
        if data.types.contains_key(base) {
            collect_dependencies(data, base, seen)?;
        }
    }
    Ok(())
}

fn struct_fields<'a>(data: &'a TypedData, type_name: &str) -> WalletResult<&'a [FieldDef]> {
    data.types
        .get(type_name)
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(format!("unknown type {type_name}")))
}

/// Strip array suffixes: `Person[3][]` -> `Person`.
fn base_type(field_type: &str) -> &str {
    match field_type.find('[') {
        Some(index) => &field_type[..index],
        None => field_type,
    }
}

fn encode_value(data: &TypedData, field_type: &str, value: &Value) -> WalletResult<[u8; 32]> {
    // Arrays: hash the concatenation of the element encodings.
    if let Some(element_type) = array_element_type(field_type) {
        let items = value
            .as_array()
            .ok_or_else(|| invalid(format!("value of {field_type} must be an array")))?;
        let mut encoded = Vec::with_capacity(items.len() * 32);
        for item in items {
            encoded.extend_from_slice(&encode_value(data, element_type, item)?);
        }
        return Ok(keccak256(&encoded));
    }

    if data.types.contains_key(field_type) {
        return hash_struct(data, field_type, value);
    }

    match field_type {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| invalid("string value expected"))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(&decode_hex_value(value)?)),
        "bool" => {
            let b = value.as_bool().ok_or_else(|| invalid("bool value expected"))?;
            let mut out = [0u8; 32];
            out[31] = u8::from(b);
            Ok(out)
        }
        "address" => {
            let bytes = decode_hex_value(value)?;
            if bytes.len() != 20 {
                return Err(invalid("address must be 20 bytes"));
            }
            let mut out = [0u8; 32];
            out[12..].copy_from_slice(&bytes);
            Ok(out)
        }
        _ if field_type.starts_with("bytes") => encode_fixed_bytes(field_type, value),
        _ if field_type.starts_with("uint") => encode_uint(value),
        _ if field_type.starts_with("int") => encode_int(value),
        other => Err(invalid(format!("unsupported type {other}"))),
    }
}

/// `T[]` / `T[n]` -> `T[...]`'s element type, dropping only the LAST
/// suffix so nested arrays recurse.
fn array_element_type(field_type: &str) -> Option<&str> {
    if !field_type.ends_with(']') {
        return None;
    }
    field_type.rfind('[').map(|index| &field_type[..index])
}

fn encode_fixed_bytes(field_type: &str, value: &Value) -> WalletResult<[u8; 32]> {
    let width: usize = field_type["bytes".len()..]
        .parse()
        .map_err(|_| invalid(format!("unsupported type {field_type}")))?;
    if width == 0 || width > 32 {
        return Err(invalid(format!("unsupported type {field_type}")));
    }
    let bytes = decode_hex_value(value)?;
    if bytes.len() != width {
        return Err(invalid(format!(
            "{field_type} value has {} bytes",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out[..width].copy_from_slice(&bytes);
    Ok(out)
}

fn encode_uint(value: &Value) -> WalletResult<[u8; 32]> {
    let mut out = [0u8; 32];
    match value {
        Value::Number(n) => {
            let v = n
                .as_u64()
                .ok_or_else(|| invalid("uint value must be non-negative"))?;
            out[24..].copy_from_slice(&v.to_be_bytes());
        }
        Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => {
            let bytes = decode_hex_string(s)?;
            if bytes.len() > 32 {
                return Err(invalid("uint value exceeds 256 bits"));
            }
            out[32 - bytes.len()..].copy_from_slice(&bytes);
        }
        Value::String(s) => {
            let v: u128 = s
                .parse()
                .map_err(|_| invalid(format!("uint value {s:?} is not a number")))?;
            out[16..].copy_from_slice(&v.to_be_bytes());
        }
        _ => return Err(invalid("uint value must be a number or string")),
    }
    Ok(out)
}

fn encode_int(value: &Value) -> WalletResult<[u8; 32]> {
    let v: i128 = match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .ok_or_else(|| invalid("int value out of range"))?,
        Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => {
            return encode_uint(value)
        }
        Value::String(s) => s
            .parse()
            .map_err(|_| invalid(format!("int value {s:?} is not a number")))?,
        _ => return Err(invalid("int value must be a number or string")),
    };
    // Two's complement, sign-extended to 256 bits.
    let mut out = if v < 0 { [0xffu8; 32] } else { [0u8; 32] };
    out[16..].copy_from_slice(&v.to_be_bytes());
    Ok(out)
}

fn decode_hex_value(value: &Value) -> WalletResult<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| invalid("hex string expected"))?;
    decode_hex_string(s)
}

fn decode_hex_string(s: &str) -> WalletResult<Vec<u8>> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let padded;
    let body = if body.len() % 2 == 1 {
        padded = format!("0{body}");
        &padded
    } else {
        body
    };
    hex::decode(body).map_err(|_| invalid(format!("invalid hex {s:?}")))
}

fn invalid(message: impl Into<String>) -> WalletError {
    WalletError::invalid_params(message)
}
