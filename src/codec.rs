//! Key, field and value conversion
//!
//! Keys, hash fields and hash values travel as byte strings. [`ToArg`] turns a
//! Rust value into a command argument, [`FromValue`] turns a reply element
//! back into a Rust value. [`Json`] stores any serde type as JSON text.

use crate::protocol::Value;
use crate::{Error, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Conversion into a command argument
pub trait ToArg {
    /// Encode `self` as argument bytes.
    ///
    /// Fails with [`Error::InvalidArgument`] when the value has no byte
    /// representation; nothing is sent in that case.
    fn to_arg(&self) -> Result<Bytes>;
}

/// Conversion from a reply element
pub trait FromValue: Sized {
    /// Decode a reply element
    fn from_value(value: Value) -> Result<Self>;
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Result<Bytes> {
        (**self).to_arg()
    }
}

impl ToArg for str {
    fn to_arg(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self.as_bytes()))
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self.as_bytes()))
    }
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self))
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self))
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Result<Bytes> {
        Ok(self.clone())
    }
}

macro_rules! numeric_arg {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Result<Bytes> {
                    Ok(Bytes::from(self.to_string()))
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Integer(n) => <$t>::try_from(n)
                            .map_err(|_| Error::Codec(format!("integer {} out of range", n))),
                        other => {
                            let text = String::from_value(other)?;
                            text.parse::<$t>().map_err(|_| {
                                Error::Codec(format!("{:?} is not a valid {}", text, stringify!($t)))
                            })
                        }
                    }
                }
            }
        )*
    };
}

numeric_arg!(i32, i64, u32, u64, usize);

impl ToArg for f64 {
    fn to_arg(&self) -> Result<Bytes> {
        Ok(Bytes::from(format_float(*self)))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(n as f64),
            other => {
                let text = String::from_value(other)?;
                text.parse::<f64>()
                    .map_err(|_| Error::Codec(format!("{:?} is not a valid float", text)))
            }
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        let bytes = Bytes::from_value(value)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Codec(format!("invalid UTF-8 in value: {}", e)))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        Ok(Bytes::from_value(value)?.to_vec())
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bulk(data) => Ok(data),
            Value::Status(s) => Ok(Bytes::from(s)),
            Value::Integer(n) => Ok(Bytes::from(n.to_string())),
            other => Err(Error::UnexpectedResponse {
                expected: "bulk string",
                actual: other.type_name().to_string(),
            }),
        }
    }
}

/// Format a float the way the server parses it back.
///
/// Integral values are written without a fractional part so that
/// `HINCRBYFLOAT` deltas like `5.0` read as `5`.
pub(crate) fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Value stored as JSON text.
///
/// # Examples
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Profile { name: String, age: u32 }
///
/// let profiles = ops.bound_hash_ops::<String, Json<Profile>>("profiles");
/// profiles.put(&"alice".to_string(), &Json(Profile { name: "Alice".into(), age: 30 })).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwrap the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> ToArg for Json<T> {
    fn to_arg(&self) -> Result<Bytes> {
        serde_json::to_vec(&self.0)
            .map(Bytes::from)
            .map_err(|e| Error::InvalidArgument(format!("value cannot be encoded as JSON: {}", e)))
    }
}

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self> {
        let bytes = Bytes::from_value(value)?;
        serde_json::from_slice(&bytes)
            .map(Json)
            .map_err(|e| Error::Codec(format!("invalid JSON value: {}", e)))
    }
}

/// Decode an optional reply element; `Nil` maps to `None`
pub(crate) fn decode_optional<T: FromValue>(value: Value) -> Result<Option<T>> {
    match value {
        Value::Nil => Ok(None),
        other => T::from_value(other).map(Some),
    }
}
