//! In-memory executor for unit tests

use super::CommandExecutor;
use crate::codec::format_float;
use crate::protocol::{Command, Value};
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// Executes hash commands against an in-memory map and records every
/// command it receives.
///
/// `HSCAN` treats the cursor as an offset into the sorted field list and
/// applies `MATCH` after slicing, so filtered batches can come back empty
/// with a non-zero cursor, the same way the server behaves.
#[derive(Default)]
pub(crate) struct MemoryExecutor {
    hashes: Mutex<HashMap<Bytes, BTreeMap<Bytes, Bytes>>>,
    log: Mutex<Vec<Command>>,
    injected: Mutex<Option<Error>>,
}

impl MemoryExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Commands received so far
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.log.lock().clone()
    }

    /// Fail the next command with `error`
    pub(crate) fn fail_next(&self, error: Error) {
        *self.injected.lock() = Some(error);
    }

    fn run(&self, cmd: &Command) -> Result<Value> {
        let args = cmd.args();
        let mut hashes = self.hashes.lock();
        let key = arg(args, 0)?;

        match cmd.name() {
            "HSET" => {
                let hash = hashes.entry(key).or_default();
                let mut added = 0;
                for pair in args[1..].chunks(2) {
                    let [field, value] = pair else {
                        return Err(Error::from_server_reply("ERR wrong number of arguments"));
                    };
                    if hash.insert(field.clone(), value.clone()).is_none() {
                        added += 1;
                    }
                }
                Ok(Value::Integer(added))
            }
            "HSETNX" => {
                let hash = hashes.entry(key).or_default();
                let field = arg(args, 1)?;
                if hash.contains_key(&field) {
                    Ok(Value::Integer(0))
                } else {
                    hash.insert(field, arg(args, 2)?);
                    Ok(Value::Integer(1))
                }
            }
            "HGET" => {
                let field = arg(args, 1)?;
                Ok(hashes
                    .get(&key)
                    .and_then(|h| h.get(&field))
                    .map_or(Value::Nil, |v| Value::Bulk(v.clone())))
            }
            "HMGET" => {
                let hash = hashes.get(&key);
                Ok(Value::Array(
                    args[1..]
                        .iter()
                        .map(|f| {
                            hash.and_then(|h| h.get(f))
                                .map_or(Value::Nil, |v| Value::Bulk(v.clone()))
                        })
                        .collect(),
                ))
            }
            "HDEL" => {
                let mut removed = 0;
                if let Some(hash) = hashes.get_mut(&key) {
                    for field in &args[1..] {
                        if hash.remove(field).is_some() {
                            removed += 1;
                        }
                    }
                    if hash.is_empty() {
                        hashes.remove(&key);
                    }
                }
                Ok(Value::Integer(removed))
            }
            "HEXISTS" => {
                let field = arg(args, 1)?;
                let exists = hashes.get(&key).map_or(false, |h| h.contains_key(&field));
                Ok(Value::Integer(exists as i64))
            }
            "HLEN" => Ok(Value::Integer(
                hashes.get(&key).map_or(0, |h| h.len() as i64),
            )),
            "HKEYS" | "HVALS" | "HGETALL" => {
                let mut items = Vec::new();
                for (field, value) in hashes.get(&key).into_iter().flatten() {
                    if cmd.name() != "HVALS" {
                        items.push(Value::Bulk(field.clone()));
                    }
                    if cmd.name() != "HKEYS" {
                        items.push(Value::Bulk(value.clone()));
                    }
                }
                Ok(Value::Array(items))
            }
            "HINCRBY" => {
                let field = arg(args, 1)?;
                let delta: i64 = parse(&arg(args, 2)?)
                    .ok_or_else(|| Error::from_server_reply("ERR value is not an integer"))?;
                let hash = hashes.entry(key).or_default();
                let current: i64 = match hash.get(&field) {
                    Some(v) => parse(v)
                        .ok_or_else(|| Error::from_server_reply("ERR hash value is not an integer"))?,
                    None => 0,
                };
                let next = current
                    .checked_add(delta)
                    .ok_or_else(|| Error::from_server_reply("ERR increment or decrement would overflow"))?;
                hash.insert(field, Bytes::from(next.to_string()));
                Ok(Value::Integer(next))
            }
            "HINCRBYFLOAT" => {
                let field = arg(args, 1)?;
                let delta: f64 = parse(&arg(args, 2)?)
                    .ok_or_else(|| Error::from_server_reply("ERR value is not a valid float"))?;
                let hash = hashes.entry(key).or_default();
                let current: f64 = match hash.get(&field) {
                    Some(v) => parse(v)
                        .ok_or_else(|| Error::from_server_reply("ERR hash value is not a float"))?,
                    None => 0.0,
                };
                let next = Bytes::from(format_float(current + delta));
                hash.insert(field, next.clone());
                Ok(Value::Bulk(next))
            }
            "HSCAN" => {
                let cursor: usize = parse(&arg(args, 1)?)
                    .ok_or_else(|| Error::from_server_reply("ERR invalid cursor"))?;
                let mut pattern = None;
                let mut count = 10;
                for option in args[2..].chunks(2) {
                    match option {
                        [name, value] if &name[..] == b"MATCH" => pattern = Some(value.clone()),
                        [name, value] if &name[..] == b"COUNT" => {
                            count = parse(value)
                                .ok_or_else(|| Error::from_server_reply("ERR syntax error"))?
                        }
                        _ => return Err(Error::from_server_reply("ERR syntax error")),
                    }
                }

                let fields: Vec<(Bytes, Bytes)> = hashes
                    .get(&key)
                    .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
                    .unwrap_or_default();
                let end = (cursor + count).min(fields.len());
                let next = if end >= fields.len() { 0 } else { end };

                let mut items = Vec::new();
                for (field, value) in fields.get(cursor..end).unwrap_or_default() {
                    if pattern.as_ref().map_or(true, |p| glob_match(p, field)) {
                        items.push(Value::Bulk(field.clone()));
                        items.push(Value::Bulk(value.clone()));
                    }
                }
                Ok(Value::Array(vec![
                    Value::Bulk(Bytes::from(next.to_string())),
                    Value::Array(items),
                ]))
            }
            other => Err(Error::from_server_reply(format!(
                "ERR unknown command '{}'",
                other
            ))),
        }
    }
}

impl CommandExecutor for MemoryExecutor {
    async fn execute(&self, cmd: Command) -> Result<Value> {
        self.log.lock().push(cmd.clone());
        if let Some(error) = self.injected.lock().take() {
            return Err(error);
        }
        self.run(&cmd)
    }
}

fn arg(args: &[Bytes], index: usize) -> Result<Bytes> {
    args.get(index)
        .cloned()
        .ok_or_else(|| Error::from_server_reply("ERR wrong number of arguments"))
}

fn parse<T: std::str::FromStr>(raw: &[u8]) -> Option<T> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// Glob matching with `*` and `?`
pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

#[test]
fn test_glob_match() {
    assert!(glob_match(b"a*", b"abc"));
    assert!(glob_match(b"*c", b"abc"));
    assert!(glob_match(b"a?c", b"abc"));
    assert!(glob_match(b"*", b""));
    assert!(!glob_match(b"a*", b"bac"));
    assert!(!glob_match(b"a?", b"a"));
}
