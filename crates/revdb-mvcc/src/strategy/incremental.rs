//! Incremental revisioning.

use revdb_common::config::Revisioning;
use revdb_common::types::{PageKey, Revision};
use revdb_storage::backend::StorageBackend;
use revdb_storage::error::StorageResult;
use revdb_storage::page::PageReference;
use revdb_storage::record::NodeRecord;
use tracing::trace;

use super::{successor_page, RevisioningStrategy};
use crate::chain::VersionChain;
use crate::container::NodePageContainer;

/// Complete page at every milestone, deltas in between.
///
/// A version is written complete when the page has no history, when the
/// revision is a multiple of the milestone, or when the delta chain would
/// otherwise reach the milestone length. Reconstruction therefore never
/// reads more than `milestone` versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incremental {
    milestone: u32,
}

impl Incremental {
    /// Creates the strategy. A milestone of 0 is treated as 1.
    pub fn new(milestone: u32) -> Self {
        Self {
            milestone: milestone.max(1),
        }
    }

    /// Milestone interval.
    pub fn milestone(&self) -> u32 {
        self.milestone
    }

    fn writes_complete(&self, previous_chain_len: Option<u32>, revision: Revision) -> bool {
        match previous_chain_len {
            None => true,
            Some(chain_len) => {
                revision.as_u64() % u64::from(self.milestone) == 0
                    || chain_len + 1 >= self.milestone
            }
        }
    }
}

impl<N: NodeRecord> RevisioningStrategy<N> for Incremental {
    fn kind(&self) -> Revisioning {
        Revisioning::Incremental
    }

    fn window(&self) -> u32 {
        self.milestone
    }

    fn collect_versions(
        &self,
        latest: &PageReference<N>,
        backend: &dyn StorageBackend<N>,
    ) -> StorageResult<VersionChain<N>> {
        VersionChain::collect(latest, backend, self.milestone as usize, true)
    }

    fn prepare_modification(
        &self,
        page_key: PageKey,
        chain: &VersionChain<N>,
        revision: Revision,
    ) -> NodePageContainer<N> {
        let complete = chain.merge(page_key);
        let mut modified = successor_page(page_key, chain, revision);
        let previous_chain_len = chain.latest().map(|page| page.chain_len());

        if self.writes_complete(previous_chain_len, revision) {
            for (slot, content) in complete.occupied() {
                if !content.is_deleted() {
                    let _ = modified.set_slot(slot, content.clone());
                }
            }
            modified.set_chain_len(0);
            trace!(%page_key, %revision, "incremental: complete version");
        } else {
            let chain_len = previous_chain_len.unwrap_or(0) + 1;
            modified.set_chain_len(chain_len);
            trace!(%page_key, %revision, chain_len, "incremental: delta version");
        }

        NodePageContainer::new(complete, modified)
    }
}
