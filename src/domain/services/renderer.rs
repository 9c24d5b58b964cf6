//! Renders store replies the way the store's own command-line client prints
//! them, so playground users see familiar output.

use thiserror::Error;

use crate::domain::models::RawReply;

pub const NIL: &str = "(nil)";
pub const EMPTY_LIST: &str = "(empty list or set)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("expected an integer reply for {command}, got {found}")]
    NotAnInteger { command: String, found: String },

    #[error("expected a list reply for {command}")]
    NotAList { command: String },

    #[error("expected a single value reply for {command}")]
    NotAScalar { command: String },

    #[error("invalid hash pair format: {len} elements")]
    OddPairCount { len: usize },

    #[error("invalid scan reply format for {command}")]
    InvalidScan { command: String },
}

/// Layout used for a command's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Bulk,
    Integer,
    List,
    HashPairs,
    Scan,
    Members,
    ListOrScalar,
}

impl RenderKind {
    pub fn for_command(command: &str) -> Self {
        let command = command.trim().to_ascii_uppercase();
        match command.as_str() {
            "GET" | "SET" | "GETSET" | "GETDEL" | "GETEX" | "ECHO" | "PING" | "TYPE"
            | "RENAME" | "HGET" | "LPOP" | "RPOP" | "LINDEX" | "SRANDMEMBER" | "SPOP"
            | "JSON.GET" | "JSON.SET" | "JSON.TYPE" | "JSON.DEBUG" | "BITFIELD_RO"
            | "PFMERGE" | "SELECT" | "ZSCORE" | "INCRBYFLOAT" | "HINCRBYFLOAT" | "OBJECT" => {
                Self::Bulk
            },

            "INCR" | "DECR" | "INCRBY" | "DECRBY" | "DEL" | "UNLINK" | "EXISTS" | "EXPIRE"
            | "EXPIREAT" | "EXPIRETIME" | "PEXPIRE" | "PEXPIREAT" | "TTL" | "PTTL" | "HSET"
            | "HSETNX" | "HDEL" | "HLEN" | "HEXISTS" | "HSTRLEN" | "HINCRBY" | "SADD"
            | "SREM" | "SCARD" | "SISMEMBER" | "LPUSH" | "RPUSH" | "LLEN" | "LREM" | "PFADD"
            | "PFCOUNT" | "DBSIZE" | "APPEND" | "STRLEN" | "SETBIT" | "GETBIT" | "BITCOUNT"
            | "BITPOS" | "ZADD" | "ZCARD" | "ZREM" | "ZRANK" | "ZCOUNT" | "TOUCH"
            | "JSON.DEL" | "JSON.FORGET" | "JSON.CLEAR" | "JSON.ARRLEN" | "JSON.OBJLEN"
            | "JSON.STRLEN" => Self::Integer,

            "KEYS" | "LRANGE" | "MGET" | "HKEYS" | "HVALS" | "HMGET" | "JSON.MGET"
            | "JSON.OBJKEYS" | "COMMAND" => Self::List,

            "HGETALL" | "HRANDFIELD" => Self::HashPairs,

            "HSCAN" | "SCAN" | "SSCAN" | "ZSCAN" => Self::Scan,

            "SMEMBERS" | "SINTER" | "SUNION" | "SDIFF" | "ZRANGE" | "ZREVRANGE"
            | "ZRANGEBYSCORE" | "ZPOPMIN" | "ZPOPMAX" => Self::Members,

            _ => Self::ListOrScalar,
        }
    }
}

/// Renders `reply` for `command`.
///
/// A nil reply is `(nil)` for every command, before any per-command layout
/// is consulted.
pub fn render(command: &str, reply: &RawReply) -> Result<String, RenderError> {
    if reply.is_nil() {
        return Ok(NIL.to_string());
    }

    match RenderKind::for_command(command) {
        RenderKind::Bulk => render_bulk(command, reply),
        RenderKind::Integer => render_integer(command, reply),
        RenderKind::List => render_list(command, reply),
        RenderKind::HashPairs => match reply.as_sequence() {
            Some(items) => render_hash_pairs(items),
            None => Err(RenderError::NotAList {
                command: command.to_string(),
            }),
        },
        RenderKind::Scan => render_scan(command, reply),
        RenderKind::Members => render_members(command, reply),
        RenderKind::ListOrScalar => match reply {
            RawReply::Sequence(_) => render_list(command, reply),
            _ => render_bulk(command, reply),
        },
    }
}

fn render_bulk(command: &str, reply: &RawReply) -> Result<String, RenderError> {
    match reply {
        RawReply::Nil => Ok(NIL.to_string()),
        RawReply::Integer(n) => Ok(format!("(integer) {}", n)),
        RawReply::Sequence(_) => Err(RenderError::NotAScalar {
            command: command.to_string(),
        }),
        other => Ok(other.to_string()),
    }
}

fn render_integer(command: &str, reply: &RawReply) -> Result<String, RenderError> {
    match reply {
        RawReply::Nil => Ok(NIL.to_string()),
        RawReply::Integer(n) => Ok(format!("(integer) {}", n)),
        other => Err(RenderError::NotAnInteger {
            command: command.to_string(),
            found: other.to_string(),
        }),
    }
}

fn render_list(command: &str, reply: &RawReply) -> Result<String, RenderError> {
    let items = reply.as_sequence().ok_or_else(|| RenderError::NotAList {
        command: command.to_string(),
    })?;

    if items.is_empty() {
        return Ok(EMPTY_LIST.to_string());
    }

    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}) {}\n", i + 1, quoted(&item.to_string())));
    }
    Ok(out)
}

/// Flat `field, value, field, value, ...` sequence: each pair becomes a
/// right-aligned index line with the field, then the value indented below it.
fn render_hash_pairs(items: &[RawReply]) -> Result<String, RenderError> {
    if items.len() % 2 != 0 {
        return Err(RenderError::OddPairCount { len: items.len() });
    }
    if items.is_empty() {
        return Ok(EMPTY_LIST.to_string());
    }

    let pairs = items.len() / 2;
    let width = pairs.to_string().len();

    let mut out = String::new();
    for (i, pair) in items.chunks_exact(2).enumerate() {
        let index = format!("{:>width$}) ", i + 1, width = width);
        let field = pair[0].to_string();
        let mut value = pair[1].to_string();
        if value.contains('"') {
            value = format!("{:?}", value);
        }

        out.push_str(&format!("{}{}\n", index, field));
        out.push_str(&format!("{}{}\n", " ".repeat(index.len()), value));
    }
    Ok(out)
}

fn render_scan(command: &str, reply: &RawReply) -> Result<String, RenderError> {
    let invalid = || RenderError::InvalidScan {
        command: command.to_string(),
    };

    let parts = reply.as_sequence().ok_or_else(invalid)?;
    let [cursor, items] = parts else {
        return Err(invalid());
    };
    let items = items.as_sequence().ok_or_else(invalid)?;

    let mut out = format!("(cursor) {}\n", cursor);
    out.push_str(&render_hash_pairs(items)?);
    Ok(out)
}

fn render_members(command: &str, reply: &RawReply) -> Result<String, RenderError> {
    let items = reply.as_sequence().ok_or_else(|| RenderError::NotAList {
        command: command.to_string(),
    })?;

    if items.is_empty() {
        return Ok(EMPTY_LIST.to_string());
    }

    let width = items.len().to_string().len();
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{:>width$}) {}\n", i + 1, item, width = width));
    }
    Ok(out)
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[&str]) -> RawReply {
        RawReply::from(items.to_vec())
    }

    #[test]
    fn nil_renders_the_same_for_every_command() {
        for command in ["GET", "INCR", "HGETALL", "HSCAN", "SMEMBERS", "KEYS", "UNKNOWN.CMD"] {
            assert_eq!(render(command, &RawReply::Nil).unwrap(), "(nil)");
        }
    }

    #[test]
    fn bulk_values() {
        assert_eq!(render("GET", &RawReply::text("hello")).unwrap(), "hello");
        assert_eq!(render("SET", &RawReply::text("OK")).unwrap(), "OK");
        assert_eq!(
            render("GET", &RawReply::Bytes(b"raw".to_vec())).unwrap(),
            "raw"
        );
        assert_eq!(render("get", &RawReply::Integer(3)).unwrap(), "(integer) 3");
    }

    #[test]
    fn integer_replies() {
        assert_eq!(render("INCR", &RawReply::Integer(42)).unwrap(), "(integer) 42");
        assert_eq!(render("ttl", &RawReply::Integer(-2)).unwrap(), "(integer) -2");
        assert!(matches!(
            render("INCR", &RawReply::text("nope")),
            Err(RenderError::NotAnInteger { .. })
        ));
    }

    #[test]
    fn ordered_list() {
        let out = render("KEYS", &seq(&["a", "say \"hi\""])).unwrap();
        assert_eq!(out, "1) \"a\"\n2) \"say \\\"hi\\\"\"\n");
        assert_eq!(render("LRANGE", &seq(&[])).unwrap(), EMPTY_LIST);
    }

    #[test]
    fn hash_pairs_are_aligned() {
        let out = render("HGETALL", &seq(&["name", "John Doe", "age", "30"])).unwrap();
        assert_eq!(out, "1) name\n   John Doe\n2) age\n   30\n");
    }

    #[test]
    fn hash_pair_index_is_right_aligned_past_nine() {
        let items: Vec<String> = (1..=10)
            .flat_map(|i| [format!("f{}", i), format!("v{}", i)])
            .collect();
        let out = render("HGETALL", &RawReply::from(items)).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], " 1) f1");
        assert_eq!(lines[1], "    v1");
        assert_eq!(lines[18], "10) f10");
        assert_eq!(lines[19], "    v10");
    }

    #[test]
    fn hash_pair_values_with_quotes_are_quoted() {
        let out = render("HGETALL", &seq(&["json", r#"{"a":1}"#])).unwrap();
        assert_eq!(out, "1) json\n   \"{\\\"a\\\":1}\"\n");
    }

    #[test]
    fn odd_hash_pairs_are_an_error() {
        for len in [1usize, 3, 5, 7] {
            let items: Vec<String> = (0..len).map(|i| i.to_string()).collect();
            assert_eq!(
                render("HGETALL", &RawReply::from(items)),
                Err(RenderError::OddPairCount { len })
            );
        }
    }

    #[test]
    fn scan_renders_cursor_then_pairs() {
        let reply = RawReply::Sequence(vec![RawReply::text("0"), seq(&["f", "v"])]);
        assert_eq!(render("HSCAN", &reply).unwrap(), "(cursor) 0\n1) f\n   v\n");

        let odd = RawReply::Sequence(vec![RawReply::text("0"), seq(&["f"])]);
        assert!(matches!(
            render("HSCAN", &odd),
            Err(RenderError::OddPairCount { len: 1 })
        ));

        let short = RawReply::Sequence(vec![RawReply::text("0")]);
        assert!(matches!(
            render("HSCAN", &short),
            Err(RenderError::InvalidScan { .. })
        ));
    }

    #[test]
    fn members_are_unquoted() {
        assert_eq!(
            render("SMEMBERS", &seq(&["one", "two"])).unwrap(),
            "1) one\n2) two\n"
        );
    }

    #[test]
    fn unknown_commands_fall_back_to_list_or_scalar() {
        assert_eq!(RenderKind::for_command("whatever"), RenderKind::ListOrScalar);
        assert_eq!(render("WHATEVER", &seq(&["x"])).unwrap(), "1) \"x\"\n");
        assert_eq!(render("WHATEVER", &RawReply::Integer(1)).unwrap(), "(integer) 1");
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        assert_eq!(RenderKind::for_command("hgetall"), RenderKind::HashPairs);
        assert_eq!(RenderKind::for_command(" Smembers "), RenderKind::Members);
    }
}
