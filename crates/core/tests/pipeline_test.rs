use async_trait::async_trait;
use docqa_core::{
    AnswerGenerator, Embedder, GenerationError, HashedNgramEmbedder, IndexStore, Industry,
    QaPipeline,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use tempfile::tempdir;

struct CannedGenerator;

#[async_trait]
impl AnswerGenerator for CannedGenerator {
    async fn answer(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok("The warranty lasts ten years.".to_string())
    }
}

fn write_pdf(path: &Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("content stream should encode"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("pdf should save");
}

fn pipeline_at(dir: &Path) -> QaPipeline<HashedNgramEmbedder, CannedGenerator> {
    let embedder = HashedNgramEmbedder::default();
    let store = IndexStore::new(
        dir.join("index.json"),
        embedder.model_id(),
        embedder.dimensions(),
    );
    QaPipeline::new(store, embedder, CannedGenerator)
}

#[tokio::test]
async fn ingest_then_ask_round_trips_through_the_index() {
    let dir = tempdir().unwrap();
    let pdf_path = dir.path().join("warranty.pdf");
    let page_text = "The boiler warranty lasts ten years from installation.";
    write_pdf(&pdf_path, page_text);

    let pipeline = pipeline_at(dir.path());

    let receipt = pipeline
        .ingest(&pdf_path, "warranty.pdf", "HVAC")
        .await
        .expect("ingestion should succeed");
    assert_eq!(receipt.pages, 1);
    assert_eq!(receipt.industry, Industry::Hvac);
    assert_eq!(receipt.file_name, "warranty.pdf");
    assert!(!receipt.checksum.is_empty());
    assert!(pipeline.store().exists());

    // Same embedder, same text: the ingested page must come back.
    let answer = pipeline
        .ask(page_text, "hvac")
        .await
        .expect("query should succeed");
    assert!(answer.sources_found >= 1);
    assert_eq!(answer.answer, "The warranty lasts ten years.");
    assert_eq!(answer.industry, Industry::Hvac);
}

#[tokio::test]
async fn other_industries_cannot_see_the_document() {
    let dir = tempdir().unwrap();
    let pdf_path = dir.path().join("warranty.pdf");
    let page_text = "The boiler warranty lasts ten years from installation.";
    write_pdf(&pdf_path, page_text);

    let pipeline = pipeline_at(dir.path());
    pipeline
        .ingest(&pdf_path, "warranty.pdf", "hvac")
        .await
        .expect("ingestion should succeed");

    let answer = pipeline
        .ask(page_text, "legal")
        .await
        .expect("cross-industry query is a normal outcome");
    assert_eq!(answer.sources_found, 0);
    assert_eq!(
        answer.answer,
        "No documents found for legal. Please upload documents first."
    );
}

#[tokio::test]
async fn two_ingestions_accumulate_in_one_index() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    write_pdf(&first, "Refrigerant charge tables for model A.");
    write_pdf(&second, "Escrow requirements for closing a sale.");

    let pipeline = pipeline_at(dir.path());
    pipeline.ingest(&first, "first.pdf", "hvac").await.unwrap();
    pipeline
        .ingest(&second, "second.pdf", "real-estate")
        .await
        .unwrap();

    assert_eq!(pipeline.store().entry_count().await.unwrap(), 2);

    let hvac = pipeline.ask("refrigerant charge", "hvac").await.unwrap();
    assert_eq!(hvac.sources_found, 1);

    let real_estate = pipeline.ask("escrow requirements", "real-estate").await.unwrap();
    assert_eq!(real_estate.sources_found, 1);
}

#[tokio::test]
async fn corrupt_pdf_leaves_the_index_untouched() {
    let dir = tempdir().unwrap();
    let bad = dir.path().join("bad.pdf");
    std::fs::write(&bad, b"%PDF-1.4\n%not a real body").unwrap();

    let pipeline = pipeline_at(dir.path());
    let result = pipeline.ingest(&bad, "bad.pdf", "finance").await;
    assert!(result.is_err());
    assert!(!pipeline.store().exists());
}
