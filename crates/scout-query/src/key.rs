//! Canonical cache keys derived from resource names and filter params.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::error::{QueryError, QueryResult};

/// Identity of one cached query: a resource family plus the canonical JSON
/// encoding of its filter params.
///
/// Canonicalization leans on `serde_json`'s sorted map representation (and on
/// the DTOs using `BTreeMap` throughout), so two filters that are deep-equal
/// as values always produce the same key regardless of how their maps were
/// built. Optional fields are skipped rather than serialized as `null`, which
/// keeps `{}` and "explicitly null member" from colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: &'static str,
    params: String,
}

impl QueryKey {
    /// Derive the key for `params` under the given resource family.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Key`] when the params cannot be encoded as JSON.
    pub fn new<P: Serialize>(resource: &'static str, params: &P) -> QueryResult<Self> {
        let value = serde_json::to_value(params)
            .map_err(|source| QueryError::Key { resource, source })?;
        let params = value.to_string();
        Ok(Self { resource, params })
    }

    /// Resource family this key belongs to.
    #[must_use]
    pub const fn resource(&self) -> &'static str {
        self.resource
    }

    /// Canonical JSON of the filter params.
    #[must_use]
    pub fn params_json(&self) -> &str {
        &self.params
    }
}

impl Display for QueryKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.resource, self.params)
    }
}
