use bytes::Bytes;
use ethereum_types::{Address, H32, U256};
use hebao_common::utils::{address_to_word, keccak};

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Address(Address),
    Uint(U256),
    Int(U256),
    Bool(bool),
    Bytes(Bytes),
    String(String),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    FixedArray(Vec<Value>),
    FixedBytes(Bytes),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalldataEncodeError {
    #[error("Failed to parse function signature: {0}")]
    ParseError(String),
    #[error("Wrong number of arguments provided for calldata: {0}")]
    WrongArgumentLength(String),
    #[error("Fixed bytes value of {0} bytes does not fit in a word")]
    FixedBytesTooLong(usize),
}

/// Splits `name(type1,type2)` into the function name and its canonical
/// parameter types. Parameter names, if present, are dropped.
pub fn parse_signature(signature: &str) -> Result<(String, Vec<String>), CalldataEncodeError> {
    let sig = signature.trim().trim_start_matches("function ");
    let (name, params) = sig
        .split_once('(')
        .ok_or_else(|| CalldataEncodeError::ParseError(signature.to_string()))?;
    let params = params
        .strip_suffix(')')
        .ok_or_else(|| CalldataEncodeError::ParseError(signature.to_string()))?;

    if params.trim().is_empty() {
        return Ok((name.trim().to_string(), Vec::new()));
    }

    let mut types = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in params.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CalldataEncodeError::ParseError(signature.to_string()))?;
                current.push(c);
            }
            ',' if depth == 0 => {
                types.push(strip_param_name(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err(CalldataEncodeError::ParseError(signature.to_string()));
    }
    types.push(strip_param_name(&current));

    Ok((name.trim().to_string(), types))
}

fn strip_param_name(param: &str) -> String {
    let param = param.trim();
    let mut depth = 0usize;
    for (i, c) in param.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ' ' if depth == 0 => return param[..i].to_string(),
            _ => {}
        }
    }
    param.to_string()
}

pub fn compute_function_selector(name: &str, params: &[String]) -> H32 {
    let normalized_signature = format!("{name}({})", params.join(","));
    let hash = keccak(normalized_signature.as_bytes());
    H32::from_slice(&hash[..4])
}

pub fn encode_calldata(signature: &str, values: &[Value]) -> Result<Vec<u8>, CalldataEncodeError> {
    let (name, params) = parse_signature(signature)?;

    if params.len() != values.len() {
        return Err(CalldataEncodeError::WrongArgumentLength(format!(
            "{signature}: expected {} arguments, got {}",
            params.len(),
            values.len()
        )));
    }

    let function_selector = compute_function_selector(&name, &params);
    let calldata = encode_tuple(values)?;
    let mut with_selector = function_selector.as_bytes().to_vec();
    with_selector.extend_from_slice(&calldata);

    Ok(with_selector)
}

/// ABI encodes `values` as a tuple, i.e. `abi.encode(values...)`. Constructor
/// arguments are appended to creation code in exactly this form.
///
/// Static values are laid out in the head in order. Every dynamic value
/// leaves a 32-byte offset in the head, measured from the start of the
/// tuple, and its encoding is appended to the tail.
pub fn encode_tuple(values: &[Value]) -> Result<Vec<u8>, CalldataEncodeError> {
    let head_len: usize = values.iter().map(head_size).sum();
    let mut head = vec![0u8; head_len];
    let mut tail = Vec::new();
    let mut offset = 0;

    for value in values {
        if is_dynamic(value) {
            write_u256(&mut head, U256::from(head_len + tail.len()), offset);
            tail.extend_from_slice(&encode_value(value)?);
        } else {
            let encoding = encode_value(value)?;
            head[offset..offset + encoding.len()].copy_from_slice(&encoding);
        }
        offset += head_size(value);
    }

    head.extend_from_slice(&tail);
    Ok(head)
}

fn encode_value(value: &Value) -> Result<Vec<u8>, CalldataEncodeError> {
    let encoding = match value {
        Value::Address(address) => address_to_word(*address).to_vec(),
        Value::Uint(number) | Value::Int(number) => number.to_big_endian().to_vec(),
        Value::Bool(boolean) => U256::from(u8::from(*boolean)).to_big_endian().to_vec(),
        Value::FixedBytes(bytes) => {
            if bytes.len() > 32 {
                return Err(CalldataEncodeError::FixedBytesTooLong(bytes.len()));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(bytes);
            word.to_vec()
        }
        Value::Bytes(bytes) => encode_bytes(bytes),
        Value::String(string_value) => encode_bytes(string_value.as_bytes()),
        Value::Array(array_values) => {
            let mut encoding = U256::from(array_values.len()).to_big_endian().to_vec();
            encoding.extend_from_slice(&encode_tuple(array_values)?);
            encoding
        }
        Value::Tuple(inner) | Value::FixedArray(inner) => encode_tuple(inner)?,
    };
    Ok(encoding)
}

fn write_u256(values: &mut [u8], number: U256, offset: usize) {
    values[offset..offset + 32].copy_from_slice(&number.to_big_endian());
}

fn head_size(value: &Value) -> usize {
    match value {
        Value::Tuple(inner) | Value::FixedArray(inner) if !is_dynamic(value) => {
            inner.iter().map(head_size).sum()
        }
        _ => 32,
    }
}

fn is_dynamic(value: &Value) -> bool {
    match value {
        Value::Bytes(_) | Value::String(_) | Value::Array(_) => true,
        Value::Tuple(inner) | Value::FixedArray(inner) => inner.iter().any(is_dynamic),
        _ => false,
    }
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut ret = U256::from(data.len()).to_big_endian().to_vec();
    ret.extend_from_slice(data);
    let padding = (32 - data.len() % 32) % 32;
    ret.resize(ret.len() + padding, 0);
    ret
}
