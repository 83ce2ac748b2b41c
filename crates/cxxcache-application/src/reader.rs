//! Query Reader: overlay-first, chain-walking reads. Thin composition over
//! [`StorageEngine`]'s chain-walking queries, which already perform the
//! per-entity dedup described in the data model.

use std::collections::HashSet;
use std::sync::Arc;

use cxxcache_domain::model::{CallDirection, CallEdge, FileKey, Symbol, SymbolReference};
use cxxcache_domain::ports::StorageEngine;
use cxxcache_domain::Result;

/// Overlay-first, chain-walking reads over the fact store.
pub struct QueryReader {
    storage: Arc<dyn StorageEngine>,
}

impl QueryReader {
    /// Builds a reader over the given storage port.
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self { storage }
    }

    /// Symbols matching `name` across the chain, narrowed to
    /// `candidate_files` when given and masking `excluded`.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn load_symbols_by_name(
        &self,
        chain: &[String],
        name: &str,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<Symbol>> {
        self.storage
            .search_symbols_by_name(chain, name, candidate_files, excluded)
            .await
    }

    /// The subset of [`Self::load_symbols_by_name`] results whose
    /// qualified or unqualified name exactly matches `name`, i.e. the
    /// symbol's own definition rather than same-named siblings.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn load_definition(
        &self,
        chain: &[String],
        name: &str,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<Symbol>> {
        let symbols = self.load_symbols_by_name(chain, name, candidate_files, excluded).await?;
        Ok(symbols
            .into_iter()
            .filter(|s| s.name == name || s.qualified_name == name)
            .collect())
    }

    /// References of `symbol` across the chain.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn load_references(
        &self,
        chain: &[String],
        symbol: &str,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<SymbolReference>> {
        self.storage
            .search_references_by_symbol(chain, symbol, candidate_files, excluded)
            .await
    }

    /// Call edges touching `symbol` in `direction` across the chain.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn load_call_graph(
        &self,
        chain: &[String],
        symbol: &str,
        direction: CallDirection,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<CallEdge>> {
        self.storage
            .call_edges_for(chain, symbol, direction, candidate_files, excluded)
            .await
    }

    /// All symbols defined in `file_key` across the chain.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn load_file_symbols(
        &self,
        chain: &[String],
        file_key: &FileKey,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<Symbol>> {
        self.storage.symbols_in_file(chain, file_key, excluded).await
    }
}
