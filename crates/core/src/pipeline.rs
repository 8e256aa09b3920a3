use crate::embeddings::Embedder;
use crate::error::{AskError, IngestError};
use crate::extractor::extract_page_texts;
use crate::generation::{build_prompt, AnswerGenerator};
use crate::index::IndexStore;
use crate::industry::Industry;
use crate::models::{Answer, DocumentChunk, IngestReceipt};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MAX_QUESTION_CHARS: usize = 500;

/// Orchestrates the two service operations: ingesting an uploaded PDF into
/// the index and answering an industry-filtered question over it.
///
/// The embedder and generator are trait parameters so tests can substitute
/// fakes; one shared embedder keeps ingestion and query vectors compatible.
pub struct QaPipeline<E, G>
where
    E: Embedder,
    G: AnswerGenerator,
{
    store: IndexStore,
    embedder: E,
    generator: G,
    top_k: usize,
    max_question_chars: usize,
}

impl<E, G> QaPipeline<E, G>
where
    E: Embedder,
    G: AnswerGenerator,
{
    pub fn new(store: IndexStore, embedder: E, generator: G) -> Self {
        Self {
            store,
            embedder,
            generator,
            top_k: DEFAULT_TOP_K,
            max_question_chars: DEFAULT_MAX_QUESTION_CHARS,
        }
    }

    pub fn with_limits(mut self, top_k: usize, max_question_chars: usize) -> Self {
        self.top_k = top_k.max(1);
        self.max_question_chars = max_question_chars.max(1);
        self
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Extracts, tags, embeds, and indexes one uploaded PDF.
    ///
    /// All-or-nothing: nothing reaches the index unless every page embeds.
    pub async fn ingest(
        &self,
        pdf_path: &Path,
        file_name: &str,
        industry_raw: &str,
    ) -> Result<IngestReceipt, IngestError> {
        let industry: Industry = industry_raw.parse()?;

        if !has_pdf_suffix(file_name) {
            return Err(IngestError::NotAPdf(file_name.to_string()));
        }

        let pages = extract_page_texts(pdf_path)?;
        let checksum = digest_file(pdf_path).await?;
        let document_id = Uuid::new_v4().to_string();

        let chunks: Vec<DocumentChunk> = pages
            .iter()
            .map(|page| {
                DocumentChunk::new(&document_id, industry, file_name, page.number, page.text.clone())
            })
            .collect();

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        self.store.append(chunks, vectors).await?;

        Ok(IngestReceipt {
            document_id,
            file_name: file_name.to_string(),
            industry,
            pages: pages.len(),
            checksum,
            ingested_at: Utc::now(),
        })
    }

    /// Answers a question from chunks tagged with the requested industry.
    ///
    /// Zero retrieved chunks is a normal outcome, reported with a fixed
    /// message and `sources_found: 0` rather than an error.
    pub async fn ask(&self, question_raw: &str, industry_raw: &str) -> Result<Answer, AskError> {
        let industry: Industry = industry_raw.parse()?;

        let question = question_raw.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }
        let length = question.chars().count();
        if length > self.max_question_chars {
            return Err(AskError::QuestionTooLong {
                length,
                limit: self.max_question_chars,
            });
        }

        if !self.store.exists() {
            return Err(AskError::IndexNotFound(self.store.path().to_path_buf()));
        }

        let query_vector = self.embedder.embed(question).await?;
        let hits = self.store.search(&query_vector, industry, self.top_k).await?;

        if hits.is_empty() {
            return Ok(Answer {
                answer: format!("No documents found for {industry}. Please upload documents first."),
                industry,
                sources_found: 0,
            });
        }

        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_prompt(industry, &context, question);
        let answer = self.generator.answer(&prompt).await?;

        Ok(Answer {
            answer,
            industry,
            sources_found: hits.len(),
        })
    }
}

fn has_pdf_suffix(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

async fn digest_file(path: &Path) -> Result<String, std::io::Error> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
