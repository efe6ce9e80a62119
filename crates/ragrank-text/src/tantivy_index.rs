use std::collections::HashMap;

use anyhow::Result;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument};
use tracing::{debug, info, warn};

use ragrank_core::traits::{ChunkCorpus, Retriever};
use ragrank_core::types::{Candidate, Chunk, SearchFilter, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Keyword source backed by an in-RAM Tantivy index. Scores are Tantivy's
/// own BM25 and are only comparable within one result list.
pub struct TantivyKeywordIndex {
	index: Index,
	reader: IndexReader,
	id_field: Field,
	text_field: Field,
	chunks: HashMap<String, Chunk>,
}

impl TantivyKeywordIndex {
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let id_field = schema.get_field("id")?;
		let text_field = schema.get_field("text")?;

		let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
		let mut stored = HashMap::with_capacity(chunks.len());
		for c in chunks {
			if stored.contains_key(&c.id) {
				warn!(chunk_id = %c.id, "duplicate chunk id skipped by tantivy index");
				continue;
			}
			writer.add_document(doc!(id_field => c.id.clone(), text_field => c.content.clone()))?;
			stored.insert(c.id.clone(), c.clone());
		}
		writer.commit()?;
		let reader = index.reader()?;
		reader.reload()?;
		info!(documents = stored.len(), "tantivy keyword index built");
		Ok(Self { index, reader, id_field, text_field, chunks: stored })
	}

	pub fn search(&self, query: &str, k: usize, filter: Option<&SearchFilter>) -> Result<Vec<Candidate>> {
		if self.chunks.is_empty() || k == 0 || query.trim().is_empty() {
			return Ok(Vec::new());
		}
		let searcher = self.reader.searcher();
		let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
		let (parsed, errors) = parser.parse_query_lenient(query);
		if !errors.is_empty() {
			debug!(query, errors = errors.len(), "lenient query parse dropped terms");
		}
		// Filtering happens after scoring, so widen the window when one is set.
		let limit = match filter {
			Some(f) if !f.is_empty() => self.chunks.len(),
			_ => k,
		};
		let top_docs = searcher.search(&parsed, &TopDocs::with_limit(limit.max(1)))?;

		let mut hits = Vec::new();
		for (score, address) in top_docs {
			if !(score > 0.0 && score.is_finite()) { continue; }
			let doc: TantivyDocument = searcher.doc(address)?;
			let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()) else { continue };
			let Some(chunk) = self.chunks.get(id) else { continue };
			if filter.is_some_and(|f| !f.matches(chunk)) { continue; }
			hits.push(Candidate::new(id, score, SourceKind::Lexical, hits.len()));
			if hits.len() == k { break; }
		}
		Ok(hits)
	}
}

impl Retriever for TantivyKeywordIndex {
	fn kind(&self) -> SourceKind { SourceKind::Lexical }

	fn retrieve(&self, query: &str, k: usize, filter: Option<&SearchFilter>) -> Result<Vec<Candidate>> {
		self.search(query, k, filter)
	}
}

impl ChunkCorpus for TantivyKeywordIndex {
	fn get(&self, id: &str) -> Option<&Chunk> { self.chunks.get(id) }
	fn len(&self) -> usize { self.chunks.len() }
}
