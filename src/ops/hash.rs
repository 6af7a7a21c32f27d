//! Hash commands (HSET, HGET, HDEL, HSCAN, ...)

use super::{CommandExecutor, Operations};
use crate::codec::{decode_optional, FromValue, ToArg};
use crate::protocol::{Command, Value};
use crate::stream::ScanOptions;
use crate::{Error, Result};

fn keyed(name: &'static str, key: &(impl ToArg + ?Sized)) -> Result<Command> {
    Ok(Command::new(name).arg(key.to_arg()?))
}

fn non_negative(n: i64, what: &'static str) -> Result<u64> {
    u64::try_from(n).map_err(|_| Error::UnexpectedResponse {
        expected: what,
        actual: n.to_string(),
    })
}

/// Split a flat `field value field value ...` reply into pairs
fn into_pairs<F: FromValue, V: FromValue>(items: Vec<Value>) -> Result<Vec<(F, V)>> {
    if items.len() % 2 != 0 {
        return Err(Error::UnexpectedResponse {
            expected: "even number of field/value elements",
            actual: items.len().to_string(),
        });
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((F::from_value(field)?, V::from_value(value)?));
    }
    Ok(pairs)
}

impl<E: CommandExecutor> Operations<E> {
    /// HDEL key field [field ...]: number of fields removed
    pub async fn hdel<K, F>(&self, key: &K, fields: &[F]) -> Result<u64>
    where
        K: ToArg + ?Sized,
        F: ToArg,
    {
        let mut cmd = keyed("HDEL", key)?;
        for field in fields {
            cmd.push_arg(field.to_arg()?);
        }
        non_negative(self.execute(cmd).await?.into_integer()?, "field count")
    }

    /// HEXISTS key field
    pub async fn hexists<K, F>(&self, key: &K, field: &F) -> Result<bool>
    where
        K: ToArg + ?Sized,
        F: ToArg + ?Sized,
    {
        let cmd = keyed("HEXISTS", key)?.arg(field.to_arg()?);
        self.execute(cmd).await?.into_bool()
    }

    /// HGET key field: `None` when the field (or the key) does not exist
    pub async fn hget<K, F, V>(&self, key: &K, field: &F) -> Result<Option<V>>
    where
        K: ToArg + ?Sized,
        F: ToArg + ?Sized,
        V: FromValue,
    {
        let cmd = keyed("HGET", key)?.arg(field.to_arg()?);
        decode_optional(self.execute(cmd).await?)
    }

    /// HMGET key field [field ...]: one slot per requested field, in order
    pub async fn hmget<K, F, V>(&self, key: &K, fields: &[F]) -> Result<Vec<Option<V>>>
    where
        K: ToArg + ?Sized,
        F: ToArg,
        V: FromValue,
    {
        let mut cmd = keyed("HMGET", key)?;
        for field in fields {
            cmd.push_arg(field.to_arg()?);
        }
        let items = self.execute(cmd).await?.into_array()?;
        if items.len() != fields.len() {
            return Err(Error::UnexpectedResponse {
                expected: "one element per requested field",
                actual: format!("{} elements for {} fields", items.len(), fields.len()),
            });
        }
        items.into_iter().map(decode_optional).collect()
    }

    /// HINCRBY key field delta: the new value
    pub async fn hincrby<K, F>(&self, key: &K, field: &F, delta: i64) -> Result<i64>
    where
        K: ToArg + ?Sized,
        F: ToArg + ?Sized,
    {
        let cmd = keyed("HINCRBY", key)?.arg(field.to_arg()?).arg(delta.to_arg()?);
        self.execute(cmd).await?.into_integer()
    }

    /// HINCRBYFLOAT key field delta: the new value
    pub async fn hincrbyfloat<K, F>(&self, key: &K, field: &F, delta: f64) -> Result<f64>
    where
        K: ToArg + ?Sized,
        F: ToArg + ?Sized,
    {
        if !delta.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "increment must be finite, got {}",
                delta
            )));
        }
        let cmd = keyed("HINCRBYFLOAT", key)?
            .arg(field.to_arg()?)
            .arg(delta.to_arg()?);
        f64::from_value(self.execute(cmd).await?)
    }

    /// HKEYS key
    pub async fn hkeys<K, F>(&self, key: &K) -> Result<Vec<F>>
    where
        K: ToArg + ?Sized,
        F: FromValue,
    {
        let items = self.execute(keyed("HKEYS", key)?).await?.into_array()?;
        items.into_iter().map(F::from_value).collect()
    }

    /// HLEN key
    pub async fn hlen<K>(&self, key: &K) -> Result<u64>
    where
        K: ToArg + ?Sized,
    {
        non_negative(self.execute(keyed("HLEN", key)?).await?.into_integer()?, "hash size")
    }

    /// HSET key field value: whether the field was newly created
    pub async fn hset<K, F, V>(&self, key: &K, field: &F, value: &V) -> Result<bool>
    where
        K: ToArg + ?Sized,
        F: ToArg + ?Sized,
        V: ToArg + ?Sized,
    {
        let cmd = keyed("HSET", key)?.arg(field.to_arg()?).arg(value.to_arg()?);
        Ok(self.execute(cmd).await?.into_integer()? > 0)
    }

    /// HSET key field value [field value ...] in one command.
    ///
    /// Returns the number of fields that were newly created. An empty input
    /// sends nothing and returns 0.
    pub async fn hset_multiple<'a, K, F, V, I>(&self, key: &K, entries: I) -> Result<u64>
    where
        K: ToArg + ?Sized,
        F: ToArg + 'a,
        V: ToArg + 'a,
        I: IntoIterator<Item = (&'a F, &'a V)>,
    {
        let mut cmd = keyed("HSET", key)?;
        for (field, value) in entries {
            cmd.push_arg(field.to_arg()?);
            cmd.push_arg(value.to_arg()?);
        }
        if cmd.args().len() == 1 {
            return Ok(0);
        }
        non_negative(self.execute(cmd).await?.into_integer()?, "field count")
    }

    /// HSETNX key field value: whether the value was stored
    pub async fn hsetnx<K, F, V>(&self, key: &K, field: &F, value: &V) -> Result<bool>
    where
        K: ToArg + ?Sized,
        F: ToArg + ?Sized,
        V: ToArg + ?Sized,
    {
        let cmd = keyed("HSETNX", key)?.arg(field.to_arg()?).arg(value.to_arg()?);
        self.execute(cmd).await?.into_bool()
    }

    /// HVALS key
    pub async fn hvals<K, V>(&self, key: &K) -> Result<Vec<V>>
    where
        K: ToArg + ?Sized,
        V: FromValue,
    {
        let items = self.execute(keyed("HVALS", key)?).await?.into_array()?;
        items.into_iter().map(V::from_value).collect()
    }

    /// HGETALL key
    pub async fn hgetall<K, F, V>(&self, key: &K) -> Result<Vec<(F, V)>>
    where
        K: ToArg + ?Sized,
        F: FromValue,
        V: FromValue,
    {
        into_pairs(self.execute(keyed("HGETALL", key)?).await?.into_array()?)
    }

    /// HSCAN key cursor [MATCH pattern] [COUNT count].
    ///
    /// Returns the next cursor (0 when the iteration is complete) and the
    /// entries of this batch.
    pub async fn hscan<K, F, V>(
        &self,
        key: &K,
        cursor: u64,
        options: &ScanOptions,
    ) -> Result<(u64, Vec<(F, V)>)>
    where
        K: ToArg + ?Sized,
        F: FromValue,
        V: FromValue,
    {
        let mut cmd = keyed("HSCAN", key)?.arg(cursor.to_arg()?);
        if let Some(pattern) = options.pattern() {
            cmd.push_arg("MATCH");
            cmd.push_arg(pattern.to_arg()?);
        }
        if let Some(count) = options.count() {
            cmd.push_arg("COUNT");
            cmd.push_arg(count.to_arg()?);
        }

        let mut reply = self.execute(cmd).await?.into_array()?;
        if reply.len() != 2 {
            return Err(Error::UnexpectedResponse {
                expected: "[cursor, entries]",
                actual: format!("array of {}", reply.len()),
            });
        }
        let entries = reply.pop().map(Value::into_array).transpose()?.unwrap_or_default();
        let next = match reply.pop() {
            Some(value) => u64::from_value(value)?,
            None => 0,
        };
        Ok((next, into_pairs(entries)?))
    }
}
