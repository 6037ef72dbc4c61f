//! Minimal ABI encoding for contract function calls.
//!
//! Just enough to turn a single-function ABI fragment plus a list of JSON
//! call parameters into calldata. Only static parameter types are
//! supported (`address`, `bool`, `uintN`, `intN`, `bytesN`); dynamic types
//! such as `string`, `bytes` or arrays are rejected.

use alloy_primitives::{keccak256, Address, I256, U256};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("invalid function abi: {0}")]
    InvalidAbi(String),

    #[error("unsupported parameter type: {0}")]
    UnsupportedType(String),

    #[error("expected {expected} parameters, got {got}")]
    ParameterCount { expected: usize, got: usize },

    #[error("invalid value for parameter {index} ({kind}): {reason}")]
    InvalidValue {
        index: usize,
        kind: String,
        reason: String,
    },
}

/// ABI fragment describing one function.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionAbi {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiInput>,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbiInput {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl FunctionAbi {
    pub fn from_json(abi: &Value) -> Result<Self, AbiError> {
        let abi = Self::deserialize(abi).map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
        if abi.kind != "function" {
            return Err(AbiError::InvalidAbi(format!(
                "expected a function fragment, got {:?}",
                abi.kind
            )));
        }
        Ok(abi)
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|i| canonical_type(&i.kind)).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of the keccak-256 hash of the signature.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Encode a call of this function with the given parameters.
    pub fn encode_call(&self, params: &[Value]) -> Result<Vec<u8>, AbiError> {
        if params.len() != self.inputs.len() {
            return Err(AbiError::ParameterCount {
                expected: self.inputs.len(),
                got: params.len(),
            });
        }

        let mut data = Vec::with_capacity(4 + 32 * params.len());
        data.extend_from_slice(&self.selector());
        for (index, (input, value)) in self.inputs.iter().zip(params).enumerate() {
            let kind = canonical_type(&input.kind);
            let word = encode_word(&kind, value).map_err(|e| match e {
                WordError::Unsupported => AbiError::UnsupportedType(kind.clone()),
                WordError::Invalid(reason) => AbiError::InvalidValue {
                    index,
                    kind: kind.clone(),
                    reason,
                },
            })?;
            data.extend_from_slice(&word);
        }
        Ok(data)
    }
}

/// `uint` and `int` are aliases of their 256-bit forms.
fn canonical_type(kind: &str) -> String {
    match kind {
        "uint" => "uint256".to_string(),
        "int" => "int256".to_string(),
        other => other.to_string(),
    }
}

enum WordError {
    Unsupported,
    Invalid(String),
}

fn encode_word(kind: &str, value: &Value) -> Result<[u8; 32], WordError> {
    if kind == "address" {
        let text = value
            .as_str()
            .ok_or_else(|| WordError::Invalid("expected a hex string".into()))?;
        let address: Address = text
            .parse()
            .map_err(|e| WordError::Invalid(format!("{e}")))?;
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_slice());
        return Ok(word);
    }

    if kind == "bool" {
        let flag = match value {
            Value::Bool(b) => *b,
            Value::String(s) if s == "true" => true,
            Value::String(s) if s == "false" => false,
            _ => return Err(WordError::Invalid("expected true or false".into())),
        };
        let mut word = [0u8; 32];
        word[31] = flag as u8;
        return Ok(word);
    }

    if let Some(bits) = kind.strip_prefix("uint") {
        let bits = integer_bits(bits)?;
        let number = parse_unsigned(value)?;
        if bits < 256 && number.bit_len() > bits {
            return Err(WordError::Invalid(format!("does not fit in {bits} bits")));
        }
        return Ok(number.to_be_bytes::<32>());
    }

    if let Some(bits) = kind.strip_prefix("int") {
        let bits = integer_bits(bits)?;
        let number = parse_signed(value)?;
        let word = number.to_be_bytes::<32>();
        if !fits_signed(&word, bits) {
            return Err(WordError::Invalid(format!("does not fit in {bits} bits")));
        }
        return Ok(word);
    }

    if let Some(size) = kind.strip_prefix("bytes") {
        // Plain `bytes` is dynamic.
        let size: usize = size.parse().map_err(|_| WordError::Unsupported)?;
        if !(1..=32).contains(&size) {
            return Err(WordError::Unsupported);
        }
        let text = value
            .as_str()
            .ok_or_else(|| WordError::Invalid("expected a hex string".into()))?;
        let raw = hex::decode(text.strip_prefix("0x").unwrap_or(text))
            .map_err(|e| WordError::Invalid(e.to_string()))?;
        if raw.len() != size {
            return Err(WordError::Invalid(format!(
                "expected {size} bytes, got {}",
                raw.len()
            )));
        }
        let mut word = [0u8; 32];
        word[..size].copy_from_slice(&raw);
        return Ok(word);
    }

    Err(WordError::Unsupported)
}

fn integer_bits(suffix: &str) -> Result<usize, WordError> {
    let bits: usize = suffix.parse().map_err(|_| WordError::Unsupported)?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(WordError::Unsupported);
    }
    Ok(bits)
}

fn parse_unsigned(value: &Value) -> Result<U256, WordError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| WordError::Invalid(format!("{n} is not an unsigned integer"))),
        Value::String(s) => s
            .parse::<U256>()
            .map_err(|e| WordError::Invalid(format!("{s:?}: {e}"))),
        _ => Err(WordError::Invalid("expected a number or numeric string".into())),
    }
}

fn parse_signed(value: &Value) -> Result<I256, WordError> {
    let text = match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err(WordError::Invalid("expected an integer or numeric string".into())),
    };
    I256::from_dec_str(&text).map_err(|e| WordError::Invalid(format!("{text:?}: {e}")))
}

/// A two's complement word fits in `bits` when everything above the low
/// `bits - 1` bits is a copy of the sign.
fn fits_signed(word: &[u8; 32], bits: usize) -> bool {
    let value_bytes = bits / 8;
    let sign_fill = if word[32 - value_bytes] & 0x80 != 0 {
        0xff
    } else {
        0x00
    };
    word[..32 - value_bytes].iter().all(|b| *b == sign_fill)
}
