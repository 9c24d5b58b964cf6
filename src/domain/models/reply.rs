use std::fmt;

/// Untyped reply handed back by the store for an executed command.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReply {
    Nil,
    Integer(i64),
    Text(String),
    Bytes(Vec<u8>),
    Sequence(Vec<RawReply>),
}

impl RawReply {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_sequence(&self) -> Option<&[RawReply]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for RawReply {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for RawReply {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawReply {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<RawReply>> From<Vec<T>> for RawReply {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Plain string form of a reply value, used inside the list layouts.
impl fmt::Display for RawReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("(nil)"),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            },
        }
    }
}
