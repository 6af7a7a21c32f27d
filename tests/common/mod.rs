//! In-process RESP server for integration tests
//!
//! Speaks enough of the protocol for the hash and key commands kvwire uses,
//! keeps data in memory and records every command it receives.

#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use kvwire::protocol::{decode_value, Value};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

enum Stored {
    Hash(BTreeMap<Bytes, Bytes>),
    Str(Bytes),
}

struct Entry {
    value: Stored,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    keys: HashMap<Bytes, Entry>,
    log: Vec<Vec<Bytes>>,
    password: Option<String>,
    stalled: HashSet<String>,
    connections: usize,
}

impl State {
    fn live(&mut self, key: &[u8]) -> Option<&mut Entry> {
        let expired = matches!(
            self.keys.get(key),
            Some(Entry { expires_at: Some(at), .. }) if *at <= Instant::now()
        );
        if expired {
            self.keys.remove(key);
        }
        self.keys.get_mut(key)
    }

    fn hash(&mut self, key: &[u8]) -> Result<Option<&mut BTreeMap<Bytes, Bytes>>, Reply> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry { value: Stored::Hash(h), .. }) => Ok(Some(h)),
            Some(_) => Err(wrong_type()),
        }
    }

    fn hash_or_create(&mut self, key: &Bytes) -> Result<&mut BTreeMap<Bytes, Bytes>, Reply> {
        if self.hash(key)?.is_none() {
            self.keys.insert(
                key.clone(),
                Entry {
                    value: Stored::Hash(BTreeMap::new()),
                    expires_at: None,
                },
            );
        }
        match self.keys.get_mut(&key[..]) {
            Some(Entry { value: Stored::Hash(h), .. }) => Ok(h),
            _ => Err(wrong_type()),
        }
    }

    fn drop_if_empty(&mut self, key: &[u8]) {
        if matches!(self.keys.get(key), Some(Entry { value: Stored::Hash(h), .. }) if h.is_empty()) {
            self.keys.remove(key);
        }
    }
}

/// Reply written back to the client
#[derive(Debug, Clone)]
enum Reply {
    Status(&'static str),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Nil,
    Array(Vec<Reply>),
}

impl Reply {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Status(s) => out.extend_from_slice(format!("+{}\r\n", s).as_bytes()),
            Reply::Error(e) => out.extend_from_slice(format!("-{}\r\n", e).as_bytes()),
            Reply::Integer(n) => out.extend_from_slice(format!(":{}\r\n", n).as_bytes()),
            Reply::Bulk(b) => {
                out.extend_from_slice(format!("${}\r\n", b.len()).as_bytes());
                out.extend_from_slice(b);
                out.extend_from_slice(b"\r\n");
            }
            Reply::Nil => out.extend_from_slice(b"$-1\r\n"),
            Reply::Array(items) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode(out);
                }
            }
        }
    }
}

fn err(message: &str) -> Reply {
    Reply::Error(message.to_string())
}

fn wrong_type() -> Reply {
    err("WRONGTYPE Operation against a key holding the wrong kind of value")
}

fn bulk(b: &Bytes) -> Reply {
    Reply::Bulk(b.clone())
}

fn parse<T: std::str::FromStr>(raw: &[u8]) -> Option<T> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
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

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Handle to a running mock server
#[derive(Clone)]
pub struct MockServer {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl MockServer {
    /// Start a server on an ephemeral localhost port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));
        let shared = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                shared.lock().connections += 1;
                tokio::spawn(serve(socket, shared.clone()));
            }
        });
        Self { port, state }
    }

    /// Require `AUTH` with this password before any other command
    pub fn require_password(&self, password: &str) {
        self.state.lock().password = Some(password.to_string());
    }

    /// Never answer commands with this name
    pub fn stall(&self, command: &str) {
        self.state.lock().stalled.insert(command.to_ascii_uppercase());
    }

    /// Store a plain string value (for type mismatch tests)
    pub fn set_string(&self, key: &str, value: &str) {
        self.state.lock().keys.insert(
            Bytes::copy_from_slice(key.as_bytes()),
            Entry {
                value: Stored::Str(Bytes::copy_from_slice(value.as_bytes())),
                expires_at: None,
            },
        );
    }

    /// Port the server listens on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `redis://` URL for this server
    pub fn url(&self) -> String {
        format!("redis://127.0.0.1:{}", self.port)
    }

    /// Names of all commands received, in order
    pub fn command_names(&self) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|c| c.first())
            .map(|n| String::from_utf8_lossy(n).to_ascii_uppercase())
            .collect()
    }

    /// Full argument vectors of commands with this name
    pub fn commands_named(&self, name: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|c| c.first().map_or(false, |n| n.eq_ignore_ascii_case(name.as_bytes())))
            .map(|c| c.iter().map(|a| String::from_utf8_lossy(a).into_owned()).collect())
            .collect()
    }

    /// How many times a command was received
    pub fn count(&self, name: &str) -> usize {
        self.commands_named(name).len()
    }

    /// Connections accepted so far
    pub fn connections(&self) -> usize {
        self.state.lock().connections
    }
}

async fn serve(mut socket: TcpStream, state: Arc<Mutex<State>>) {
    let mut buf = BytesMut::with_capacity(4096);
    let mut authenticated = false;
    loop {
        loop {
            // Clients only send arrays; anything else (a TLS ClientHello) ends the session
            if buf.first().map_or(false, |&b| b != b'*') {
                return;
            }
            let parts = match decode_value(&mut buf) {
                Ok(Some(Value::Array(items))) => items,
                Ok(Some(_)) | Err(_) => return,
                Ok(None) => break,
            };
            let args: Vec<Bytes> = parts
                .into_iter()
                .filter_map(|v| match v {
                    Value::Bulk(b) => Some(b),
                    _ => None,
                })
                .collect();
            let Some(name) = args.first().map(|n| String::from_utf8_lossy(n).to_ascii_uppercase())
            else {
                return;
            };

            let reply = {
                let mut state = state.lock();
                state.log.push(args.clone());
                if state.stalled.contains(&name) {
                    None
                } else if name == "AUTH" {
                    let given = args.last().map(|p| String::from_utf8_lossy(p).into_owned());
                    match &state.password {
                        Some(expected) if Some(expected) != given.as_ref() => {
                            Some(err("WRONGPASS invalid username-password pair"))
                        }
                        _ => {
                            authenticated = true;
                            Some(Reply::Status("OK"))
                        }
                    }
                } else if state.password.is_some() && !authenticated {
                    Some(err("NOAUTH Authentication required."))
                } else {
                    Some(execute(&mut state, &name, &args[1..]))
                }
            };

            let Some(reply) = reply else { continue };
            let mut out = Vec::new();
            reply.encode(&mut out);
            if socket.write_all(&out).await.is_err() {
                return;
            }
            if name == "QUIT" {
                return;
            }
        }

        match socket.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

fn execute(state: &mut State, name: &str, args: &[Bytes]) -> Reply {
    let result = run(state, name, args);
    result.unwrap_or_else(|reply| reply)
}

fn arg<'a>(args: &'a [Bytes], index: usize) -> Result<&'a Bytes, Reply> {
    args.get(index)
        .ok_or_else(|| err("ERR wrong number of arguments"))
}

fn run(state: &mut State, name: &str, args: &[Bytes]) -> Result<Reply, Reply> {
    let reply = match name {
        "PING" => Reply::Status("PONG"),
        "QUIT" | "SELECT" => Reply::Status("OK"),
        "CLIENT" => Reply::Status("OK"),
        "HSET" => {
            let key = arg(args, 0)?;
            if args.len() < 3 || args.len() % 2 == 0 {
                return Err(err("ERR wrong number of arguments for 'hset' command"));
            }
            let hash = state.hash_or_create(key)?;
            let mut added = 0;
            for pair in args[1..].chunks(2) {
                if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
                    added += 1;
                }
            }
            Reply::Integer(added)
        }
        "HSETNX" => {
            let (key, field, value) = (arg(args, 0)?, arg(args, 1)?, arg(args, 2)?);
            let hash = state.hash_or_create(key)?;
            if hash.contains_key(field) {
                Reply::Integer(0)
            } else {
                hash.insert(field.clone(), value.clone());
                Reply::Integer(1)
            }
        }
        "HGET" => {
            let field = arg(args, 1)?;
            match state.hash(arg(args, 0)?)?.and_then(|h| h.get(field)) {
                Some(v) => bulk(v),
                None => Reply::Nil,
            }
        }
        "HMGET" => {
            let hash = state.hash(arg(args, 0)?)?;
            let hash = hash.map(|h| &*h);
            Reply::Array(
                args[1..]
                    .iter()
                    .map(|f| hash.and_then(|h| h.get(f)).map_or(Reply::Nil, bulk))
                    .collect(),
            )
        }
        "HDEL" => {
            let key = arg(args, 0)?;
            let mut removed = 0;
            if let Some(hash) = state.hash(key)? {
                for field in &args[1..] {
                    if hash.remove(field).is_some() {
                        removed += 1;
                    }
                }
            }
            state.drop_if_empty(key);
            Reply::Integer(removed)
        }
        "HEXISTS" => {
            let field = arg(args, 1)?;
            let exists = state.hash(arg(args, 0)?)?.map_or(false, |h| h.contains_key(field));
            Reply::Integer(exists as i64)
        }
        "HLEN" => Reply::Integer(state.hash(arg(args, 0)?)?.map_or(0, |h| h.len() as i64)),
        "HKEYS" | "HVALS" | "HGETALL" => {
            let mut items = Vec::new();
            if let Some(hash) = state.hash(arg(args, 0)?)? {
                for (field, value) in hash.iter() {
                    if name != "HVALS" {
                        items.push(bulk(field));
                    }
                    if name != "HKEYS" {
                        items.push(bulk(value));
                    }
                }
            }
            Reply::Array(items)
        }
        "HINCRBY" => {
            let (key, field) = (arg(args, 0)?, arg(args, 1)?);
            let delta: i64 = parse(arg(args, 2)?).ok_or_else(|| err("ERR value is not an integer or out of range"))?;
            let hash = state.hash_or_create(key)?;
            let current: i64 = match hash.get(field) {
                Some(v) => parse(v).ok_or_else(|| err("ERR hash value is not an integer"))?,
                None => 0,
            };
            let next = current
                .checked_add(delta)
                .ok_or_else(|| err("ERR increment or decrement would overflow"))?;
            hash.insert(field.clone(), Bytes::from(next.to_string()));
            Reply::Integer(next)
        }
        "HINCRBYFLOAT" => {
            let (key, field) = (arg(args, 0)?, arg(args, 1)?);
            let delta: f64 = parse(arg(args, 2)?).ok_or_else(|| err("ERR value is not a valid float"))?;
            let hash = state.hash_or_create(key)?;
            let current: f64 = match hash.get(field) {
                Some(v) => parse(v).ok_or_else(|| err("ERR hash value is not a float"))?,
                None => 0.0,
            };
            let next = Bytes::from(format_float(current + delta));
            hash.insert(field.clone(), next.clone());
            Reply::Bulk(next)
        }
        "HSCAN" => {
            let cursor: usize = parse(arg(args, 1)?).ok_or_else(|| err("ERR invalid cursor"))?;
            let mut pattern = None;
            let mut count = 10usize;
            for option in args[2..].chunks(2) {
                match option {
                    [n, v] if n.eq_ignore_ascii_case(b"MATCH") => pattern = Some(v.clone()),
                    [n, v] if n.eq_ignore_ascii_case(b"COUNT") => {
                        count = parse(v).ok_or_else(|| err("ERR syntax error"))?
                    }
                    _ => return Err(err("ERR syntax error")),
                }
            }
            let fields: Vec<(Bytes, Bytes)> = state
                .hash(arg(args, 0)?)?
                .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
                .unwrap_or_default();
            let end = (cursor + count).min(fields.len());
            let next = if end >= fields.len() { 0 } else { end };
            let mut items = Vec::new();
            for (field, value) in fields.get(cursor..end).unwrap_or_default() {
                if pattern.as_ref().map_or(true, |p| glob_match(p, field)) {
                    items.push(bulk(field));
                    items.push(bulk(value));
                }
            }
            Reply::Array(vec![
                Reply::Bulk(Bytes::from(next.to_string())),
                Reply::Array(items),
            ])
        }
        "DEL" => {
            let mut removed = 0;
            for key in args {
                if state.live(key).is_some() {
                    state.keys.remove(&key[..]);
                    removed += 1;
                }
            }
            Reply::Integer(removed)
        }
        "EXISTS" => Reply::Integer(args.iter().filter(|k| state.live(k).is_some()).count() as i64),
        "PEXPIRE" => {
            let millis: u64 = parse(arg(args, 1)?).ok_or_else(|| err("ERR value is not an integer or out of range"))?;
            match state.live(arg(args, 0)?) {
                Some(entry) => {
                    entry.expires_at = Some(Instant::now() + Duration::from_millis(millis));
                    Reply::Integer(1)
                }
                None => Reply::Integer(0),
            }
        }
        "PTTL" => match state.live(arg(args, 0)?) {
            None => Reply::Integer(-2),
            Some(Entry { expires_at: None, .. }) => Reply::Integer(-1),
            Some(Entry { expires_at: Some(at), .. }) => {
                Reply::Integer(at.saturating_duration_since(Instant::now()).as_millis() as i64)
            }
        },
        "PERSIST" => match state.live(arg(args, 0)?) {
            Some(entry) if entry.expires_at.is_some() => {
                entry.expires_at = None;
                Reply::Integer(1)
            }
            _ => Reply::Integer(0),
        },
        "RENAME" => {
            let (from, to) = (arg(args, 0)?, arg(args, 1)?);
            if state.live(from).is_none() {
                return Err(err("ERR no such key"));
            }
            if let Some(entry) = state.keys.remove(&from[..]) {
                state.keys.insert(to.clone(), entry);
            }
            Reply::Status("OK")
        }
        "TYPE" => match state.live(arg(args, 0)?) {
            None => Reply::Status("none"),
            Some(Entry { value: Stored::Hash(_), .. }) => Reply::Status("hash"),
            Some(Entry { value: Stored::Str(_), .. }) => Reply::Status("string"),
        },
        other => Reply::Error(format!("ERR unknown command '{}'", other)),
    };
    Ok(reply)
}
