use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, Token, TokenFilter, TokenStream, Tokenizer};
use tantivy::Index;

use crate::tokenize::MIN_TOKEN_CHARS;

pub const ANALYZER: &str = "ragrank_terms";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _id_field = schema_builder.add_text_field("id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(ANALYZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let _text_field = schema_builder.add_text_field("text", text_options);
	schema_builder.build()
}

/// Same terms as `tokenize`: split on non-alphanumeric chars, lowercase,
/// drop anything shorter than `MIN_TOKEN_CHARS`.
pub fn analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(RemoveShortFilter::new(MIN_TOKEN_CHARS))
		.build()
}

pub fn register_tokenizer(index: &Index) {
	index.tokenizers().register(ANALYZER, analyzer());
}

/// Drops tokens with fewer than `min_chars` chars.
#[derive(Clone, Copy, Debug)]
pub struct RemoveShortFilter {
	min_chars: usize,
}

impl RemoveShortFilter {
	pub fn new(min_chars: usize) -> Self { Self { min_chars } }
}

impl TokenFilter for RemoveShortFilter {
	type Tokenizer<T: Tokenizer> = RemoveShortWrapper<T>;

	fn transform<T: Tokenizer>(self, tokenizer: T) -> RemoveShortWrapper<T> {
		RemoveShortWrapper { min_chars: self.min_chars, inner: tokenizer }
	}
}

#[derive(Clone)]
pub struct RemoveShortWrapper<T: Tokenizer> {
	min_chars: usize,
	inner: T,
}

impl<T: Tokenizer> Tokenizer for RemoveShortWrapper<T> {
	type TokenStream<'a> = RemoveShortStream<T::TokenStream<'a>>;

	fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
		RemoveShortStream { min_chars: self.min_chars, tail: self.inner.token_stream(text) }
	}
}

pub struct RemoveShortStream<S> {
	min_chars: usize,
	tail: S,
}

impl<S: TokenStream> TokenStream for RemoveShortStream<S> {
	fn advance(&mut self) -> bool {
		while self.tail.advance() {
			if self.tail.token().text.chars().count() >= self.min_chars {
				return true;
			}
		}
		false
	}

	fn token(&self) -> &Token { self.tail.token() }

	fn token_mut(&mut self) -> &mut Token { self.tail.token_mut() }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn terms(text: &str) -> Vec<String> {
		let mut analyzer = analyzer();
		let mut stream = analyzer.token_stream(text);
		let mut out = Vec::new();
		while stream.advance() {
			out.push(stream.token().text.clone());
		}
		out
	}

	#[test]
	fn analyzer_matches_plain_tokenizer() {
		for text in ["PV on the Roof", "Inverter-Fault: E42 at 3am", "ÉTÉ ça va über"] {
			assert_eq!(terms(text), crate::tokenize(text), "{text}");
		}
	}
}
