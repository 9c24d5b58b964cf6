use crate::domain::models::{CommandDoc, SearchResponse};

struct CatalogEntry {
    name: &'static str,
    group: &'static str,
    summary: &'static str,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry { name: "GET", group: "string", summary: "Returns the string value of a key" },
    CatalogEntry { name: "SET", group: "string", summary: "Sets the string value of a key, optionally with NX, XX, EX or GET" },
    CatalogEntry { name: "GETDEL", group: "string", summary: "Returns the string value of a key after deleting the key" },
    CatalogEntry { name: "GETEX", group: "string", summary: "Returns the string value of a key after setting its expiration time" },
    CatalogEntry { name: "MGET", group: "string", summary: "Atomically returns the string values of one or more keys" },
    CatalogEntry { name: "MSET", group: "string", summary: "Atomically creates or modifies the string values of one or more keys" },
    CatalogEntry { name: "APPEND", group: "string", summary: "Appends a string to the value of a key" },
    CatalogEntry { name: "INCR", group: "string", summary: "Increments the integer value of a key by one" },
    CatalogEntry { name: "DECR", group: "string", summary: "Decrements the integer value of a key by one" },
    CatalogEntry { name: "INCRBY", group: "string", summary: "Increments the integer value of a key by a number" },
    CatalogEntry { name: "DEL", group: "generic", summary: "Deletes one or more keys" },
    CatalogEntry { name: "EXISTS", group: "generic", summary: "Determines whether one or more keys exist" },
    CatalogEntry { name: "EXPIRE", group: "generic", summary: "Sets the expiration time of a key in seconds" },
    CatalogEntry { name: "EXPIREAT", group: "generic", summary: "Sets the expiration time of a key to a Unix timestamp" },
    CatalogEntry { name: "EXPIRETIME", group: "generic", summary: "Returns the expiration time of a key as a Unix timestamp" },
    CatalogEntry { name: "TTL", group: "generic", summary: "Returns the expiration time in seconds of a key" },
    CatalogEntry { name: "KEYS", group: "generic", summary: "Returns all key names that match a pattern" },
    CatalogEntry { name: "TYPE", group: "generic", summary: "Determines the type of value stored at a key" },
    CatalogEntry { name: "HSET", group: "hash", summary: "Creates or modifies the value of a field in a hash" },
    CatalogEntry { name: "HGET", group: "hash", summary: "Returns the value of a field in a hash" },
    CatalogEntry { name: "HGETALL", group: "hash", summary: "Returns all fields and values in a hash" },
    CatalogEntry { name: "HDEL", group: "hash", summary: "Deletes one or more fields and their values from a hash" },
    CatalogEntry { name: "HKEYS", group: "hash", summary: "Returns all fields in a hash" },
    CatalogEntry { name: "HVALS", group: "hash", summary: "Returns all values in a hash" },
    CatalogEntry { name: "HSCAN", group: "hash", summary: "Iterates over fields and values of a hash" },
    CatalogEntry { name: "LPUSH", group: "list", summary: "Prepends one or more elements to a list" },
    CatalogEntry { name: "RPUSH", group: "list", summary: "Appends one or more elements to a list" },
    CatalogEntry { name: "LRANGE", group: "list", summary: "Returns a range of elements from a list" },
    CatalogEntry { name: "SADD", group: "set", summary: "Adds one or more members to a set" },
    CatalogEntry { name: "SMEMBERS", group: "set", summary: "Returns all members of a set" },
    CatalogEntry { name: "SREM", group: "set", summary: "Removes one or more members from a set" },
    CatalogEntry { name: "ZADD", group: "sorted-set", summary: "Adds one or more members to a sorted set" },
    CatalogEntry { name: "ZRANGE", group: "sorted-set", summary: "Returns members of a sorted set within a range of indexes" },
    CatalogEntry { name: "PFADD", group: "hyperloglog", summary: "Adds elements to a HyperLogLog key" },
    CatalogEntry { name: "PFCOUNT", group: "hyperloglog", summary: "Returns the approximated cardinality of the sets observed by HyperLogLog keys" },
    CatalogEntry { name: "PFMERGE", group: "hyperloglog", summary: "Merges one or more HyperLogLog values into a single key" },
    CatalogEntry { name: "JSON.SET", group: "json", summary: "Sets or updates the JSON value at a path" },
    CatalogEntry { name: "JSON.GET", group: "json", summary: "Returns the JSON value at a path" },
    CatalogEntry { name: "JSON.DEL", group: "json", summary: "Deletes the JSON value at a path" },
    CatalogEntry { name: "JSON.INGEST", group: "json", summary: "Stores a JSON document under a generated key with an optional key prefix" },
    CatalogEntry { name: "PING", group: "connection", summary: "Returns the server's liveliness response" },
    CatalogEntry { name: "ECHO", group: "connection", summary: "Returns the given string" },
];

/// Case-insensitive substring search over command names and summaries.
/// An empty query lists the whole catalog.
pub fn search_commands(query: &str) -> SearchResponse {
    let needle = query.trim().to_ascii_lowercase();

    let results: Vec<CommandDoc> = CATALOG
        .iter()
        .filter(|entry| {
            needle.is_empty()
                || entry.name.to_ascii_lowercase().contains(&needle)
                || entry.summary.to_ascii_lowercase().contains(&needle)
        })
        .map(|entry| CommandDoc {
            name: entry.name.to_string(),
            group: entry.group.to_string(),
            summary: entry.summary.to_string(),
        })
        .collect();

    SearchResponse {
        query: query.trim().to_string(),
        total: results.len(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_names_case_insensitively() {
        let response = search_commands("hget");
        let names: Vec<&str> = response.results.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["HGET", "HGETALL"]);
        assert_eq!(response.total, 2);
    }

    #[test]
    fn matches_summaries() {
        let response = search_commands("HyperLogLog");
        assert!(response.results.iter().all(|d| d.group == "hyperloglog"));
        assert_eq!(response.total, 3);
    }

    #[test]
    fn empty_query_lists_everything() {
        assert_eq!(search_commands("  ").total, CATALOG.len());
        assert_eq!(search_commands("no-such-command").total, 0);
    }
}
