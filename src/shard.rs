//! Shard addressing on top of the registry.
//!
//! Session data is spread over up to 100 databases of 100 tables each, all
//! sharing one layout. Instead of registering ten thousand descriptors the
//! registry carries a single *session template* per mode whose `db_name` and
//! `table_name` contain printf-style placeholders, and callers address shards
//! through reserved ranges of index numbers:
//!
//! | range           | mode  | shard                         |
//! |-----------------|-------|-------------------------------|
//! | `0..10000`      | both  | plain registry lookup         |
//! | `10000..20000`  | read  | `n - 10000 = db * 100 + table` |
//! | `20000..30000`  | write | `n - 20000 = db * 100 + table` |
//!
//! Every shard request is sent under one fixed wire number per mode
//! ([`READ_SLOT`], [`WRITE_SLOT`]). Because that number is rebound to a
//! different table on each request, the client re-sends the open-index command
//! before every request, and [`Sharded`] refuses persistent connections.
//!
//! # Example
//! ```rust
//! use hsclient::index::{IndexDescriptor, IndexRegistry, IndexResolver, Mode};
//! use hsclient::shard::{Sharded, READ_SLOT};
//!
//! let mut registry = IndexRegistry::default();
//! registry.set_session_template(
//!     Mode::Read,
//!     IndexDescriptor::new("toolbar%d", "sess%02d", "PRIMARY", ["bucket", "hash", "data"]),
//! );
//!
//! let mut sharded = Sharded::default();
//! let resolved = sharded.resolve(&registry, Mode::Read, 10_307).unwrap();
//! assert_eq!(resolved.number, READ_SLOT);
//! assert_eq!(resolved.descriptor.db_name, "toolbar3");
//! assert_eq!(resolved.descriptor.table_name, "sess07");
//! ```
use log::debug;

use crate::{
    error::{ClientError, ClientResult},
    index::{IndexDescriptor, IndexRegistry, IndexResolver, Mode, ResolvedIndex},
};

pub const SHARD_MIN: u32 = 10_000;
pub const READ_SHARD_BASE: u32 = 10_000;
pub const WRITE_SHARD_BASE: u32 = 20_000;
pub const SHARDS_PER_MODE: u32 = 10_000;
pub const TABLES_PER_DB: u32 = 100;

/// Wire number reused for every read shard.
pub const READ_SLOT: u32 = 90;
/// Wire number reused for every write shard.
pub const WRITE_SLOT: u32 = 91;

/// Physical location of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardLocation {
    pub db_num: u32,
    pub table_num: u32,
}

impl ShardLocation {
    /// Splits a logical number of `mode` into its database and table numbers.
    pub fn from_index_num(mode: Mode, index_num: u32) -> Option<Self> {
        let base = match mode {
            Mode::Read => READ_SHARD_BASE,
            Mode::Write => WRITE_SHARD_BASE,
        };
        let num = index_num.checked_sub(base).filter(|n| *n < SHARDS_PER_MODE)?;
        Some(Self {
            db_num: num / TABLES_PER_DB,
            table_num: num % TABLES_PER_DB,
        })
    }

    /// Instantiates the template for this shard. `None` when a name carries
    /// more placeholders than it has values.
    pub fn apply(&self, template: &IndexDescriptor) -> Option<IndexDescriptor> {
        Some(IndexDescriptor {
            db_name: fill_placeholder(&template.db_name, self.db_num)?,
            table_name: fill_placeholder(&template.table_name, self.table_num)?,
            ..template.clone()
        })
    }
}

pub fn slot_for(mode: Mode) -> u32 {
    match mode {
        Mode::Read => READ_SLOT,
        Mode::Write => WRITE_SLOT,
    }
}

/// Resolver for sharded session storage.
///
/// Holds the descriptor currently bound to each mode's slot number.
#[derive(Debug, Clone, Default)]
pub struct Sharded {
    slots: [Option<IndexDescriptor>; 2],
}

impl Sharded {
    /// Descriptor currently bound to the slot number of `mode`.
    pub fn current(&self, mode: Mode) -> Option<&IndexDescriptor> {
        self.slots[mode.slot()].as_ref()
    }

    fn shard(registry: &IndexRegistry, mode: Mode, index_num: u32) -> ClientResult<IndexDescriptor> {
        let template = registry
            .session_template(mode)
            .ok_or(ClientError::IndexNotFound(index_num))?;
        let location = ShardLocation::from_index_num(mode, index_num)
            .ok_or(ClientError::IndexNotFound(index_num))?;
        location
            .apply(template)
            .ok_or(ClientError::IndexNotFound(index_num))
    }
}

impl IndexResolver for Sharded {
    fn resolve(
        &mut self,
        registry: &IndexRegistry,
        mode: Mode,
        index_num: u32,
    ) -> ClientResult<ResolvedIndex> {
        let slot = slot_for(mode);

        if index_num < SHARD_MIN {
            let descriptor = match &self.slots[mode.slot()] {
                Some(current) if index_num == slot => current.clone(),
                _ => registry.lookup(mode, index_num)?.clone(),
            };
            return Ok(ResolvedIndex {
                number: index_num,
                descriptor,
                rebound: false,
            });
        }

        let descriptor = Self::shard(registry, mode, index_num)?;
        debug!(
            "shard {index_num} ({mode}) bound to slot {slot}: {}.{}",
            descriptor.db_name, descriptor.table_name
        );
        self.slots[mode.slot()] = Some(descriptor.clone());

        Ok(ResolvedIndex {
            number: slot,
            descriptor,
            rebound: true,
        })
    }

    fn allows_persistent(&self) -> bool {
        false
    }
}

/// Substitutes `value` into the numeric placeholder of `template`.
///
/// Understands `%d`, `%u`, `%s` with optional `0` flag and width, and `%%`.
/// Templates without a placeholder are returned unchanged. `None` when the
/// template holds more than one placeholder, since only one value is given.
pub fn fill_placeholder(template: &str, value: u32) -> Option<String> {
    let mut out = String::with_capacity(template.len() + 4);
    let mut chars = template.chars().peekable();
    let mut filled = false;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut flags = String::new();
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() {
                flags.push(d);
                chars.next();
            } else {
                break;
            }
        }

        match chars.peek() {
            Some('d' | 'u' | 's') => {
                if filled {
                    return None;
                }
                chars.next();
                let zero_pad = flags.starts_with('0');
                let width = flags.parse::<usize>().unwrap_or(0);
                if zero_pad {
                    out.push_str(&format!("{value:0width$}"));
                } else {
                    out.push_str(&format!("{value:>width$}"));
                }
                filled = true;
            }
            _ => {
                out.push('%');
                out.push_str(&flags);
            }
        }
    }

    Some(out)
}
