//! Revisioning strategies.
//!
//! A strategy answers two questions for a node page:
//!
//! 1. Which stored versions must be combined to see the page as of the
//!    newest revision ([`RevisioningStrategy::collect_versions`])?
//! 2. What must the version written by the next revision contain
//!    ([`RevisioningStrategy::prepare_modification`])?
//!
//! Reads always combine the collected versions newest-first, so two
//! strategies that answer both questions consistently read back identical
//! content.

mod incremental;
mod sliding;

pub use incremental::Incremental;
pub use sliding::SlidingSnapshot;

use std::fmt;

use revdb_common::config::{Revisioning, StoreConfig};
use revdb_common::types::{PageKey, Revision};
use revdb_storage::backend::StorageBackend;
use revdb_storage::error::StorageResult;
use revdb_storage::page::{NodePage, PageReference};
use revdb_storage::record::NodeRecord;

use crate::chain::VersionChain;
use crate::container::NodePageContainer;

/// Policy for storing and reconstructing node page versions.
pub trait RevisioningStrategy<N: NodeRecord>: Send + Sync + fmt::Debug {
    /// Which policy this is.
    fn kind(&self) -> Revisioning;

    /// Milestone interval or window size.
    fn window(&self) -> u32;

    /// Loads the versions needed to reconstruct the page behind `latest`.
    fn collect_versions(
        &self,
        latest: &PageReference<N>,
        backend: &dyn StorageBackend<N>,
    ) -> StorageResult<VersionChain<N>>;

    /// Builds the container a writer uses to modify the page in `revision`.
    fn prepare_modification(
        &self,
        page_key: PageKey,
        chain: &VersionChain<N>,
        revision: Revision,
    ) -> NodePageContainer<N>;

    /// Read view of the page from its collected versions.
    fn reconstruct(&self, page_key: PageKey, chain: &VersionChain<N>) -> NodePage<N> {
        chain.merge(page_key)
    }
}

/// Creates the strategy configured for a store.
pub fn strategy_for<N: NodeRecord>(config: &StoreConfig) -> Box<dyn RevisioningStrategy<N>> {
    match config.revisioning {
        Revisioning::Incremental => Box::new(Incremental::new(config.revision_window)),
        Revisioning::SlidingSnapshot => Box::new(SlidingSnapshot::new(config.revision_window)),
    }
}

/// New, empty version of `page_key` for `revision` chained after `chain`.
fn successor_page<N: NodeRecord>(
    page_key: PageKey,
    chain: &VersionChain<N>,
    revision: Revision,
) -> NodePage<N> {
    let mut page = NodePage::new(page_key, revision);
    page.set_previous(chain.latest_location());
    page
}
