//! Mapping caller-facing index numbers onto wire index numbers.
use crate::error::ClientResult;

use super::{IndexDescriptor, IndexRegistry, Mode};

/// The outcome of resolving a logical index number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIndex {
    /// Number sent on the wire.
    pub number: u32,
    pub descriptor: IndexDescriptor,
    /// The number now names a different table than it may have before, so any
    /// open record for it on the current connection is stale.
    pub rebound: bool,
}

/// Decides how logical index numbers reach the server.
pub trait IndexResolver {
    fn resolve(
        &mut self,
        registry: &IndexRegistry,
        mode: Mode,
        index_num: u32,
    ) -> ClientResult<ResolvedIndex>;

    /// Whether connections may rely on indexes staying open between requests.
    fn allows_persistent(&self) -> bool {
        true
    }
}

/// Resolves every number straight through the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl IndexResolver for Direct {
    fn resolve(
        &mut self,
        registry: &IndexRegistry,
        mode: Mode,
        index_num: u32,
    ) -> ClientResult<ResolvedIndex> {
        let descriptor = registry.lookup(mode, index_num)?.clone();
        Ok(ResolvedIndex {
            number: index_num,
            descriptor,
            rebound: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn direct_passes_numbers_through() {
        let mut registry = IndexRegistry::default();
        let descriptor = IndexDescriptor::new("test", "kv", "PRIMARY", ["key", "value"]);
        registry.register(Mode::Read, 98, descriptor.clone());

        let resolved = Direct.resolve(&registry, Mode::Read, 98).unwrap();
        assert_eq!(
            resolved,
            ResolvedIndex {
                number: 98,
                descriptor,
                rebound: false
            }
        );
    }

    #[test]
    fn direct_reports_missing_numbers() {
        let registry = IndexRegistry::default();
        let err = Direct.resolve(&registry, Mode::Write, 99).unwrap_err();
        assert!(matches!(err, ClientError::IndexNotFound(99)));
    }
}
