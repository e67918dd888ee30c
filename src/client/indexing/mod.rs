use super::RagClient;
use crate::indexer::{FileWalker, KnowledgeSection, is_knowledge_document, split_markdown};
use crate::manifest::TrainManifest;
use crate::types::{ItemMetadata, KnowledgeResponse, Partition, TrainResponse};
use crate::vector_db::write_batch;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Write items in `write_batch_size` slices, one update per slice
async fn write_items(client: &RagClient, items: Vec<(Vec<f32>, ItemMetadata)>) -> Result<usize> {
    let batch_size = client.config.indexing.write_batch_size.max(1);
    let mut written = 0;
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let batch: Vec<_> = items.by_ref().take(batch_size).collect();
        written += write_batch(client.index.as_ref(), batch)
            .await
            .context("Failed to write to vector index")?;
    }

    Ok(written)
}

/// Train the client's root incrementally (or from scratch with `full`)
pub(crate) async fn do_train(client: &RagClient, full: bool) -> Result<TrainResponse> {
    let start = Instant::now();

    // Walk the tree on a blocking thread since it touches every directory
    let walker = FileWalker::new(&client.root).with_max_file_size(client.config.indexing.max_file_size);
    let files = tokio::task::spawn_blocking(move || walker.discover_files())
        .await
        .context("File discovery task failed")??;

    if full {
        tracing::info!("Full re-index requested, discarding manifest and index");
        client.index.clear().await.context("Failed to clear index")?;
        TrainManifest::remove(&client.manifest_path)?;
    }
    client.ensure_initialized().await?;

    let previous = if full {
        TrainManifest::default()
    } else {
        TrainManifest::load(&client.manifest_path).unwrap_or_default()
    };

    let diff = previous.diff(&files);
    tracing::info!(
        "{} files discovered: {} to process, {} unchanged, {} removed",
        files.len(),
        diff.to_process.len(),
        diff.unchanged.len(),
        diff.removed.len()
    );

    let mut response = TrainResponse {
        files_discovered: files.len(),
        files_unchanged: diff.unchanged.len(),
        files_removed: diff.removed.len(),
        ..Default::default()
    };

    if diff.is_noop() {
        tracing::info!("Index is up to date");
        response.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(response);
    }

    let chunked = client.chunker.chunk_files(&diff.to_process);
    response.errors = chunked.failures.clone();

    let mut texts = Vec::with_capacity(chunked.chunk_count());
    let mut metadata = Vec::with_capacity(chunked.chunk_count());
    let mut processed = Vec::with_capacity(chunked.files.len());
    for (file, chunks) in chunked.files {
        for chunk in &chunks {
            texts.push(chunk.content.clone());
            metadata.push(chunk.to_metadata());
        }
        processed.push((file, chunks.len()));
    }
    response.chunks_created = texts.len();

    // Embed everything before touching the index so a failed run leaves it intact
    let vectors = client
        .batcher
        .embed_many(texts)
        .await
        .context("Failed to generate embeddings")?;
    response.embeddings_generated = vectors.len();

    for path in &diff.removed {
        tracing::debug!("Removing items of deleted file {}", path);
        client.index.delete_by_path(Partition::Code, path).await?;
    }
    for file in &diff.to_process {
        client.index.delete_by_path(Partition::Code, &file.key()).await?;
    }

    let written = write_items(client, vectors.into_iter().zip(metadata).collect()).await?;

    let manifest = previous.next(&diff, &processed);
    manifest.save(&client.manifest_path)?;

    response.files_processed = processed.len();
    response.duration_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Trained {} files ({} chunks written) in {} ms",
        response.files_processed,
        written,
        response.duration_ms
    );

    Ok(response)
}

/// Index every knowledge document under `path`, replacing earlier sections of each
pub(crate) async fn do_ingest_knowledge(client: &RagClient, path: &Path) -> Result<KnowledgeResponse> {
    let start = Instant::now();

    let walker = FileWalker::new(path)
        .with_max_file_size(client.config.indexing.max_file_size)
        .with_filter("document", is_knowledge_document);
    let documents = tokio::task::spawn_blocking(move || walker.discover())
        .await
        .context("Document discovery task failed")??;

    client.ensure_initialized().await?;

    let mut errors = Vec::new();
    let mut sources = Vec::with_capacity(documents.len());
    let mut sections: Vec<KnowledgeSection> = Vec::new();

    for document in documents {
        let source = document.to_string_lossy().to_string();
        match tokio::fs::read_to_string(&document).await {
            Ok(text) => {
                let split = split_markdown(&source, &text);
                tracing::debug!("{} sections in {}", split.len(), source);
                sections.extend(split);
                sources.push(source);
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable document {}: {}", source, e);
                errors.push(format!("{}: {}", source, e));
            }
        }
    }

    let texts = sections.iter().map(|s| s.text.clone()).collect();
    let vectors = client
        .batcher
        .embed_many(texts)
        .await
        .context("Failed to generate embeddings")?;

    for source in &sources {
        client.index.delete_by_path(Partition::Knowledge, source).await?;
    }

    let items = vectors
        .into_iter()
        .zip(sections.iter().map(KnowledgeSection::to_metadata))
        .collect();
    let written = write_items(client, items).await?;

    let response = KnowledgeResponse {
        documents: sources.len(),
        sections: written,
        duration_ms: start.elapsed().as_millis() as u64,
        errors,
    };

    tracing::info!(
        "Ingested {} sections from {} documents in {} ms",
        response.sections,
        response.documents,
        response.duration_ms
    );

    Ok(response)
}
