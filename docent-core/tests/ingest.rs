mod common;

use common::{small_chunk_config, text_upload, ScriptedProvider};
use docent_core::config::Config;
use docent_core::rag::{
    ExtractionError, IngestError, IngestPipeline, SkipReason, Upload, ValidationError,
};
use std::collections::HashSet;
use std::sync::Arc;

const CAPITALS: &str = "A is the capital of X. It sits on the northern river.\n\n\
    B is the capital of Y. It is known for its harbour.\n\n\
    C is the capital of Z. Its old town has narrow streets.\n\n\
    The population of X grew quickly after the war.\n\n\
    Trade between X and Y relies on the river.\n\n\
    Mountains separate Z from its neighbours.\n\n\
    Festivals in A draw visitors every summer.";

fn pipeline(config: &Config) -> IngestPipeline {
    IngestPipeline::new(&config.ingest, &config.rag, Arc::new(ScriptedProvider::new())).unwrap()
}

#[tokio::test]
async fn test_invalid_files_are_skipped() {
    let config = Config::default();
    let uploads = vec![
        text_upload("facts.txt", "A is the capital of X."),
        Upload::from_bytes("report.docx", "application/msword", b"binary".to_vec()),
        text_upload("empty.txt", ""),
        text_upload("../etc/passwd.txt", "root"),
        Upload::from_bytes("broken.pdf", "application/pdf", b"this is not a pdf".to_vec()),
        Upload::from_bytes("notes.txt", "application/json", b"{}".to_vec()),
    ];

    let ingested = pipeline(&config).process(uploads).await.unwrap();

    let sources: HashSet<_> = ingested.chunks.iter().map(|c| c.source_id.as_str()).collect();
    assert_eq!(sources, HashSet::from(["facts.txt"]));

    let skipped: Vec<_> = ingested.skipped.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        skipped,
        vec!["report.docx", "empty.txt", "../etc/passwd.txt", "broken.pdf", "notes.txt"]
    );
    assert!(matches!(
        ingested.skipped[0].reason,
        SkipReason::Invalid(ValidationError::UnsupportedExtension { .. })
    ));
    assert!(matches!(ingested.skipped[1].reason, SkipReason::Invalid(ValidationError::Empty)));
    assert!(matches!(
        ingested.skipped[2].reason,
        SkipReason::Invalid(ValidationError::InvalidFilename)
    ));
    assert!(matches!(
        ingested.skipped[3].reason,
        SkipReason::Extraction(ExtractionError::Pdf(_))
    ));
    assert!(matches!(
        ingested.skipped[4].reason,
        SkipReason::Extraction(ExtractionError::UnsupportedType(_))
    ));
}

#[tokio::test]
async fn test_oversized_file_is_skipped() {
    let mut config = Config::default();
    config.ingest.max_file_size = 16;

    let uploads = vec![
        text_upload("small.txt", "A is the capital."),
        text_upload("large.txt", "This file is well over sixteen bytes long."),
    ];

    let result = pipeline(&config).process(uploads).await;
    // "small.txt" is 17 bytes, so nothing survives.
    assert!(matches!(result, Err(IngestError::NoValidDocuments)));

    config.ingest.max_file_size = 20;
    let uploads = vec![
        text_upload("small.txt", "A is the capital."),
        text_upload("large.txt", "This file is well over sixteen bytes long."),
    ];
    let ingested = pipeline(&config).process(uploads).await.unwrap();
    assert_eq!(ingested.skipped.len(), 1);
    assert!(matches!(
        ingested.skipped[0].reason,
        SkipReason::Invalid(ValidationError::TooLarge { size: 42, max: 20 })
    ));
}

#[tokio::test]
async fn test_no_valid_documents() {
    let config = Config::default();
    let uploads = vec![
        Upload::from_bytes("image.png", "image/png", vec![0x89, 0x50]),
        text_upload("empty.txt", ""),
    ];

    let result = pipeline(&config).process(uploads).await;
    assert!(matches!(result, Err(IngestError::NoValidDocuments)));
}

#[tokio::test]
async fn test_whitespace_only_documents_are_not_indexed() {
    let config = Config::default();
    let result = pipeline(&config).process(vec![text_upload("blank.txt", " \n\n ")]).await;
    assert!(matches!(result, Err(IngestError::NoValidDocuments)));
}

#[tokio::test]
async fn test_too_many_files_rejects_batch() {
    let config = Config::default();
    let uploads: Vec<_> = (0..11)
        .map(|i| text_upload(&format!("doc{}.txt", i), "A is the capital of X."))
        .collect();

    let result = pipeline(&config).process(uploads).await;
    assert!(matches!(result, Err(IngestError::TooManyFiles { count: 11, max: 10 })));
}

#[tokio::test]
async fn test_chunks_are_exact_slices_of_the_document() {
    let config = small_chunk_config();
    let ingested = pipeline(&config)
        .process(vec![text_upload("capitals.txt", CAPITALS)])
        .await
        .unwrap();

    assert!(ingested.chunks.len() > 3);
    for (i, chunk) in ingested.chunks.iter().enumerate() {
        assert_eq!(chunk.sequence_index, i);
        assert_eq!(chunk.text, &CAPITALS[chunk.byte_range.clone()]);
        assert!(chunk.text.chars().count() <= config.rag.chunk_size);
    }

    // Stitching chunks back together, skipping overlaps, yields the source.
    let mut rebuilt = String::new();
    let mut covered = 0;
    for chunk in &ingested.chunks {
        let start = chunk.byte_range.start.max(covered);
        rebuilt.push_str(&CAPITALS[start..chunk.byte_range.end]);
        covered = chunk.byte_range.end;
    }
    assert_eq!(rebuilt, CAPITALS);
}

#[tokio::test]
async fn test_retriever_returns_k_unique_chunks() {
    let config = small_chunk_config();
    let ingested = pipeline(&config)
        .process(vec![text_upload("capitals.txt", CAPITALS)])
        .await
        .unwrap();
    assert!(ingested.chunks.len() >= config.rag.retriever.fetch_k);

    let results = ingested
        .index
        .retriever(config.rag.retriever)
        .retrieve("What is the capital of X?")
        .await
        .unwrap();

    assert_eq!(results.len(), config.rag.retriever.k);
    let unique: HashSet<_> = results
        .iter()
        .map(|r| (r.chunk.source_id.clone(), r.chunk.sequence_index))
        .collect();
    assert_eq!(unique.len(), results.len());
    assert!(results[0].chunk.text.contains("capital"));
}

/// Reader that records the thread it is read on.
struct ThreadRecordingReader {
    inner: std::io::Cursor<Vec<u8>>,
    threads: Arc<std::sync::Mutex<Vec<std::thread::ThreadId>>>,
}

impl std::io::Read for ThreadRecordingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.threads.lock().unwrap().push(std::thread::current().id());
        std::io::Read::read(&mut self.inner, buf)
    }
}

impl std::io::Seek for ThreadRecordingReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        std::io::Seek::seek(&mut self.inner, pos)
    }
}

#[tokio::test]
async fn test_extraction_runs_off_the_async_thread() {
    let config = Config::default();
    let threads = Arc::new(std::sync::Mutex::new(Vec::new()));
    let reader = ThreadRecordingReader {
        inner: std::io::Cursor::new(b"A is the capital of X.".to_vec()),
        threads: threads.clone(),
    };
    let uploads = vec![Upload::new("facts.txt", "text/plain", reader)];

    let ingested = pipeline(&config).process(uploads).await.unwrap();

    assert_eq!(ingested.chunks.len(), 1);
    let threads = threads.lock().unwrap();
    assert!(!threads.is_empty());
    assert!(threads.iter().all(|id| *id != std::thread::current().id()));
}
