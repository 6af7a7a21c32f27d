//! Key commands (DEL, EXISTS, PEXPIRE, PTTL, PERSIST, RENAME, TYPE)

use super::{CommandExecutor, Operations};
use crate::codec::ToArg;
use crate::protocol::{Command, Value};
use crate::{Error, Result};
use std::time::Duration;

/// Type of the value stored at a key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Key does not exist
    None,
    /// String value
    String,
    /// List
    List,
    /// Set
    Set,
    /// Sorted set
    ZSet,
    /// Hash
    Hash,
    /// Stream
    Stream,
    /// Type this client does not know
    Other(String),
}

impl DataType {
    fn from_code(code: &str) -> Self {
        match code {
            "none" => DataType::None,
            "string" => DataType::String,
            "list" => DataType::List,
            "set" => DataType::Set,
            "zset" => DataType::ZSet,
            "hash" => DataType::Hash,
            "stream" => DataType::Stream,
            other => DataType::Other(other.to_string()),
        }
    }

    /// Type name as reported by `TYPE`
    pub fn code(&self) -> &str {
        match self {
            DataType::None => "none",
            DataType::String => "string",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::ZSet => "zset",
            DataType::Hash => "hash",
            DataType::Stream => "stream",
            DataType::Other(code) => code,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Remaining time to live of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Key does not exist
    Missing,
    /// Key exists without an expiry
    Persistent,
    /// Key expires after this long
    ExpiresIn(Duration),
}

impl Expiry {
    fn from_pttl(millis: i64) -> Result<Self> {
        match millis {
            -2 => Ok(Expiry::Missing),
            -1 => Ok(Expiry::Persistent),
            n if n >= 0 => Ok(Expiry::ExpiresIn(Duration::from_millis(n as u64))),
            n => Err(Error::UnexpectedResponse {
                expected: "TTL of -2, -1 or >= 0",
                actual: n.to_string(),
            }),
        }
    }

    /// Remaining time, if the key expires
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Expiry::ExpiresIn(d) => Some(*d),
            _ => None,
        }
    }
}

impl<E: CommandExecutor> Operations<E> {
    /// DEL key: whether the key existed
    pub async fn delete_key<K: ToArg + ?Sized>(&self, key: &K) -> Result<bool> {
        let cmd = Command::new("DEL").arg(key.to_arg()?);
        Ok(self.execute(cmd).await?.into_integer()? > 0)
    }

    /// EXISTS key
    pub async fn has_key<K: ToArg + ?Sized>(&self, key: &K) -> Result<bool> {
        let cmd = Command::new("EXISTS").arg(key.to_arg()?);
        Ok(self.execute(cmd).await?.into_integer()? > 0)
    }

    /// PEXPIRE key millis: whether a timeout was set
    pub async fn expire<K: ToArg + ?Sized>(&self, key: &K, ttl: Duration) -> Result<bool> {
        let millis = u64::try_from(ttl.as_millis())
            .map_err(|_| Error::InvalidArgument(format!("expiry {:?} is too large", ttl)))?;
        if millis == 0 {
            return Err(Error::InvalidArgument(
                "expiry must be at least one millisecond".into(),
            ));
        }
        let cmd = Command::new("PEXPIRE").arg(key.to_arg()?).arg(millis.to_arg()?);
        self.execute(cmd).await?.into_bool()
    }

    /// PTTL key
    pub async fn get_expire<K: ToArg + ?Sized>(&self, key: &K) -> Result<Expiry> {
        let cmd = Command::new("PTTL").arg(key.to_arg()?);
        Expiry::from_pttl(self.execute(cmd).await?.into_integer()?)
    }

    /// PERSIST key: whether an expiry was removed
    pub async fn persist<K: ToArg + ?Sized>(&self, key: &K) -> Result<bool> {
        let cmd = Command::new("PERSIST").arg(key.to_arg()?);
        self.execute(cmd).await?.into_bool()
    }

    /// RENAME key new_key
    pub async fn rename<K, N>(&self, key: &K, new_key: &N) -> Result<()>
    where
        K: ToArg + ?Sized,
        N: ToArg + ?Sized,
    {
        let cmd = Command::new("RENAME").arg(key.to_arg()?).arg(new_key.to_arg()?);
        self.execute(cmd).await?.expect_ok()
    }

    /// TYPE key
    pub async fn key_type<K: ToArg + ?Sized>(&self, key: &K) -> Result<DataType> {
        let cmd = Command::new("TYPE").arg(key.to_arg()?);
        match self.execute(cmd).await? {
            Value::Status(code) => Ok(DataType::from_code(&code)),
            other => Err(Error::UnexpectedResponse {
                expected: "type status",
                actual: other.type_name().to_string(),
            }),
        }
    }
}
