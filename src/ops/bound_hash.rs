//! Hash operations bound to one key

use super::{CommandExecutor, DataType, Expiry, Operations};
use crate::client::ClientExecutor;
use crate::codec::{FromValue, ToArg};
use crate::stream::{ScanCursor, ScanOptions};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

/// Hash operations bound to a single key.
///
/// `K` is the key type, `F` the field type and `V` the value type; fields
/// and values are converted with [`ToArg`] / [`FromValue`]. The view holds
/// nothing but the key and an [`Operations`] handle, so it is cheap to clone
/// and can be shared between tasks.
///
/// Absent fields read as `None`. There is no way to store "nothing": to
/// remove a field use [`delete`](Self::delete).
///
/// # Examples
///
/// ```ignore
/// let profile = ops.bound_hash_ops::<_, String, String>("user:42");
/// profile.put(&"name".into(), &"Ada".into()).await?;
/// assert_eq!(profile.get(&"name".into()).await?, Some("Ada".to_string()));
/// ```
pub struct BoundHashOperations<K, F, V, E = ClientExecutor> {
    key: K,
    ops: Operations<E>,
    _types: PhantomData<fn() -> (F, V)>,
}

impl<K: Clone, F, V, E> Clone for BoundHashOperations<K, F, V, E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            ops: self.ops.clone(),
            _types: PhantomData,
        }
    }
}

impl<K: std::fmt::Debug, F, V, E> std::fmt::Debug for BoundHashOperations<K, F, V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundHashOperations")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<K, F, V, E> BoundHashOperations<K, F, V, E> {
    pub(crate) fn new(key: K, ops: Operations<E>) -> Self {
        Self {
            key,
            ops,
            _types: PhantomData,
        }
    }

    /// The bound key
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The unbound handle this view runs on
    pub fn operations(&self) -> &Operations<E> {
        &self.ops
    }
}

impl<K, F, V, E> BoundHashOperations<K, F, V, E>
where
    K: ToArg,
    E: CommandExecutor,
{
    /// Remove fields; returns how many existed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for an empty field list (nothing is sent).
    pub async fn delete(&self, fields: &[F]) -> Result<u64>
    where
        F: ToArg,
    {
        if fields.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one field is required".into(),
            ));
        }
        self.ops.hdel(&self.key, fields).await
    }

    /// Whether `field` exists
    pub async fn has_key(&self, field: &F) -> Result<bool>
    where
        F: ToArg,
    {
        self.ops.hexists(&self.key, field).await
    }

    /// Value of `field`, `None` when absent
    pub async fn get(&self, field: &F) -> Result<Option<V>>
    where
        F: ToArg,
        V: FromValue,
    {
        self.ops.hget(&self.key, field).await
    }

    /// Values of `fields`, positionally; absent fields read as `None`.
    ///
    /// Duplicated fields produce duplicated slots. An empty list returns an
    /// empty vector without a round-trip.
    pub async fn multi_get(&self, fields: &[F]) -> Result<Vec<Option<V>>>
    where
        F: ToArg,
        V: FromValue,
    {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        self.ops.hmget(&self.key, fields).await
    }

    /// Add `delta` to the integer stored at `field` (a missing field counts
    /// as 0) and return the new value.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] when the stored value is not an integer.
    pub async fn increment(&self, field: &F, delta: i64) -> Result<i64>
    where
        F: ToArg,
    {
        self.ops.hincrby(&self.key, field, delta).await
    }

    /// Add `delta` to the number stored at `field` and return the new value.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a NaN or infinite delta (nothing is
    /// sent), [`Error::TypeMismatch`] when the stored value is not numeric.
    pub async fn increment_by_float(&self, field: &F, delta: f64) -> Result<f64>
    where
        F: ToArg,
    {
        self.ops.hincrbyfloat(&self.key, field, delta).await
    }

    /// All field names
    pub async fn keys(&self) -> Result<HashSet<F>>
    where
        F: FromValue + Eq + Hash,
    {
        let fields: Vec<F> = self.ops.hkeys(&self.key).await?;
        Ok(fields.into_iter().collect())
    }

    /// Number of fields
    pub async fn size(&self) -> Result<u64> {
        self.ops.hlen(&self.key).await
    }

    /// Store every entry with a single command.
    ///
    /// When a field repeats, the last value wins. An empty input sends
    /// nothing.
    pub async fn put_all<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a F, &'a V)>,
        F: ToArg + 'a,
        V: ToArg + 'a,
    {
        self.ops.hset_multiple(&self.key, entries).await?;
        Ok(())
    }

    /// Store `value` at `field`, overwriting any previous value
    pub async fn put(&self, field: &F, value: &V) -> Result<()>
    where
        F: ToArg,
        V: ToArg,
    {
        self.ops.hset(&self.key, field, value).await?;
        Ok(())
    }

    /// Store `value` only if `field` is absent; returns whether it was stored.
    ///
    /// The check and the write are a single atomic command.
    pub async fn put_if_absent(&self, field: &F, value: &V) -> Result<bool>
    where
        F: ToArg,
        V: ToArg,
    {
        self.ops.hsetnx(&self.key, field, value).await
    }

    /// All values
    pub async fn values(&self) -> Result<Vec<V>>
    where
        V: FromValue,
    {
        self.ops.hvals(&self.key).await
    }

    /// All entries
    pub async fn entries(&self) -> Result<HashMap<F, V>>
    where
        F: FromValue + Eq + Hash,
        V: FromValue,
    {
        let pairs: Vec<(F, V)> = self.ops.hgetall(&self.key).await?;
        Ok(pairs.into_iter().collect())
    }

    /// Iterate over the entries incrementally.
    ///
    /// Nothing is sent until the cursor is first advanced.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a zero count or an empty pattern.
    pub fn scan(&self, options: ScanOptions) -> Result<ScanCursor<F, V, E>>
    where
        F: FromValue,
        V: FromValue,
    {
        options.validate()?;
        Ok(ScanCursor::new(
            self.ops.clone(),
            self.key.to_arg()?,
            options,
        ))
    }

    /// Type of the value stored at the key
    pub async fn key_type(&self) -> Result<DataType> {
        self.ops.key_type(&self.key).await
    }

    /// Remaining time to live of the key
    pub async fn get_expire(&self) -> Result<Expiry> {
        self.ops.get_expire(&self.key).await
    }

    /// Expire the key after `ttl`; returns whether the key exists
    pub async fn expire(&self, ttl: Duration) -> Result<bool> {
        self.ops.expire(&self.key, ttl).await
    }

    /// Remove the expiry; returns whether one was set
    pub async fn persist(&self) -> Result<bool> {
        self.ops.persist(&self.key).await
    }

    /// Rename the key and re-bind this view to `new_key`
    pub async fn rename(&mut self, new_key: K) -> Result<()> {
        self.ops.rename(&self.key, &new_key).await?;
        self.key = new_key;
        Ok(())
    }
}
