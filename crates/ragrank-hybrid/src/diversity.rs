use std::collections::HashSet;

use tracing::debug;

use ragrank_core::settings::DiversityConfig;
use ragrank_core::types::{ChunkType, RetrievedChunk};

/// Soft page/type diversity over a score-sorted list.
///
/// One deterministic pass: once `page_after` items are selected, a chunk on
/// an already-selected page needs `page_min_score`; once `type_after` items
/// are selected, a chunk of an already-selected type needs `type_min_score`.
/// Selection stops at `max_results`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiversitySelector {
    cfg: DiversityConfig,
}

impl DiversitySelector {
    pub fn new(cfg: DiversityConfig) -> Self { Self { cfg } }

    pub fn config(&self) -> &DiversityConfig { &self.cfg }

    pub fn select(&self, candidates: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
        let total = candidates.len();
        let mut pages: HashSet<u32> = HashSet::new();
        let mut types: HashSet<ChunkType> = HashSet::new();
        let mut selected: Vec<RetrievedChunk> = Vec::with_capacity(self.cfg.max_results.min(total));

        for c in candidates {
            if selected.len() >= self.cfg.max_results {
                break;
            }
            let n = selected.len();
            if n >= self.cfg.page_after && pages.contains(&c.page) && c.score < self.cfg.page_min_score {
                continue;
            }
            if n >= self.cfg.type_after && types.contains(&c.chunk_type) && c.score < self.cfg.type_min_score {
                continue;
            }
            pages.insert(c.page);
            types.insert(c.chunk_type);
            selected.push(c);
        }

        for (rank, c) in selected.iter_mut().enumerate() {
            c.rank = rank;
        }
        debug!(candidates = total, selected = selected.len(), "diversity selection");
        selected
    }
}
