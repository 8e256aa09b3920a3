pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod index;
pub mod industry;
pub mod models;
pub mod pipeline;
mod retry;

pub use embeddings::{
    AnyEmbedder, Embedder, HashedNgramEmbedder, RemoteEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{AskError, EmbedError, GenerationError, IndexError, IngestError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use generation::{
    build_prompt, AnswerGenerator, ChatCompletionClient, DEFAULT_COMPLETION_BASE_URL,
    DEFAULT_COMPLETION_MODEL,
};
pub use index::IndexStore;
pub use industry::{Industry, UnknownIndustry};
pub use models::{Answer, DocumentChunk, IngestReceipt, SearchHit};
pub use pipeline::{QaPipeline, DEFAULT_MAX_QUESTION_CHARS, DEFAULT_TOP_K};
