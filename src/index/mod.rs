//! Index descriptors and the per-mode registry.
//!
//! HandlerSocket addresses a table projection by a small integer chosen by the
//! client. Before a number can be used in a data command it has to be bound on
//! the server with an open-index (`P`) command naming the database, table,
//! index and column list. The [`IndexRegistry`] keeps those bindings for both
//! the read and the write socket.
//!
//! # Example
//! ```rust
//! use hsclient::index::{IndexDescriptor, IndexRegistry, Mode};
//!
//! let mut registry = IndexRegistry::default();
//! registry.register(
//!     Mode::Read,
//!     98,
//!     "test.kv.PRIMARY:key,value".parse().unwrap(),
//! );
//!
//! let descriptor = registry.lookup(Mode::Read, 98).unwrap();
//! assert_eq!(descriptor.fields, vec!["key", "value"]);
//! assert!(registry.lookup(Mode::Write, 98).is_err());
//! ```
use std::{collections::HashMap, fmt, str::FromStr};

use thiserror::Error;

use crate::error::{ClientError, ClientResult};

pub mod resolver;

pub use resolver::{Direct, IndexResolver, ResolvedIndex};

/// Which of the two server sockets a request travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Read,
    Write,
}

impl Mode {
    pub(crate) fn slot(self) -> usize {
        match self {
            Mode::Read => 0,
            Mode::Write => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Read => write!(f, "r"),
            Mode::Write => write!(f, "w"),
        }
    }
}

impl FromStr for Mode {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "r" | "read" => Ok(Mode::Read),
            "w" | "write" => Ok(Mode::Write),
            other => Err(DescriptorError::Mode(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("unknown mode '{0}', expected 'r' or 'w'")]
    Mode(String),

    #[error("invalid index '{input}', {reason}")]
    Malformed { input: String, reason: &'static str },
}

/// A table/index/column projection bound to an index number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub db_name: String,
    pub table_name: String,
    pub index_name: String,
    /// Column order of every returned tuple.
    pub fields: Vec<String>,
    pub filter_fields: Option<Vec<String>>,
}

impl IndexDescriptor {
    pub fn new<S: Into<String>>(
        db_name: impl Into<String>,
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
            index_name: index_name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            filter_fields: None,
        }
    }

    pub fn with_filter_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.filter_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Parses `db.table.index:field1,field2[:filter1,filter2]`.
impl FromStr for IndexDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| DescriptorError::Malformed {
            input: s.to_string(),
            reason,
        };

        let mut sections = s.trim().split(':');
        let location = sections.next().unwrap_or_default();
        let fields = sections
            .next()
            .ok_or_else(|| malformed("missing ':' before the field list"))?;
        let filters = sections.next();
        if sections.next().is_some() {
            return Err(malformed("too many ':' sections"));
        }

        let parts = location.split('.').collect::<Vec<&str>>();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(malformed("location must be db.table.index"));
        }

        let fields = split_fields(fields);
        if fields.is_empty() {
            return Err(malformed("at least one field is required"));
        }

        let mut descriptor = IndexDescriptor::new(parts[0], parts[1], parts[2], fields);
        if let Some(filters) = filters {
            descriptor.filter_fields = Some(split_fields(filters));
        }
        Ok(descriptor)
    }
}

fn split_fields(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// Index bindings for the read and write sockets.
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    indexes: [HashMap<u32, IndexDescriptor>; 2],
    templates: [Option<IndexDescriptor>; 2],
}

impl IndexRegistry {
    /// Stores a descriptor, replacing any previous binding of the number.
    pub fn register(&mut self, mode: Mode, index_num: u32, descriptor: IndexDescriptor) {
        self.indexes[mode.slot()].insert(index_num, descriptor);
    }

    pub fn lookup(&self, mode: Mode, index_num: u32) -> ClientResult<&IndexDescriptor> {
        self.indexes[mode.slot()]
            .get(&index_num)
            .ok_or(ClientError::IndexNotFound(index_num))
    }

    /// Sets the placeholder descriptor shard numbers are instantiated from.
    pub fn set_session_template(&mut self, mode: Mode, descriptor: IndexDescriptor) {
        self.templates[mode.slot()] = Some(descriptor);
    }

    pub fn session_template(&self, mode: Mode) -> Option<&IndexDescriptor> {
        self.templates[mode.slot()].as_ref()
    }

    pub fn len(&self, mode: Mode) -> usize {
        self.indexes[mode.slot()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.iter().all(HashMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_keep_separate_bindings() {
        let mut registry = IndexRegistry::default();
        registry.register(Mode::Read, 1, IndexDescriptor::new("db", "r", "PRIMARY", ["k"]));
        registry.register(Mode::Write, 1, IndexDescriptor::new("db", "w", "PRIMARY", ["k"]));

        assert_eq!(registry.lookup(Mode::Read, 1).unwrap().table_name, "r");
        assert_eq!(registry.lookup(Mode::Write, 1).unwrap().table_name, "w");
    }

    #[test]
    #[should_panic(expected = "IndexNotFound(7)")]
    fn lookup_missing_index() {
        let registry = IndexRegistry::default();
        registry.lookup(Mode::Read, 7).unwrap();
    }

    #[test]
    fn register_overwrites() {
        let mut registry = IndexRegistry::default();
        registry.register(Mode::Write, 99, IndexDescriptor::new("a", "t", "PRIMARY", ["k"]));
        registry.register(Mode::Write, 99, IndexDescriptor::new("b", "t", "PRIMARY", ["k"]));

        assert_eq!(registry.len(Mode::Write), 1);
        assert_eq!(registry.lookup(Mode::Write, 99).unwrap().db_name, "b");
    }

    #[test]
    fn descriptor_from_string() {
        let descriptor: IndexDescriptor = "test.sess.PRIMARY:bucket, hash,data:ts".parse().unwrap();

        assert_eq!(
            descriptor,
            IndexDescriptor::new("test", "sess", "PRIMARY", ["bucket", "hash", "data"])
                .with_filter_fields(["ts"])
        );
    }

    #[test]
    fn descriptor_rejects_bad_location() {
        let inputs = vec!["test.sess:key", "test..PRIMARY:key", "test.sess.PRIMARY", "a.b.c:"];

        for input in inputs {
            assert!(input.parse::<IndexDescriptor>().is_err(), "{input} should fail");
        }
    }

    #[test]
    fn mode_from_string() {
        assert_eq!("R".parse::<Mode>().unwrap(), Mode::Read);
        assert_eq!("write".parse::<Mode>().unwrap(), Mode::Write);
        assert!("x".parse::<Mode>().is_err());
    }
}
