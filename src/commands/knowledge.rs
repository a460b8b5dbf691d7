use super::{ProcessReport, Render, Services};
use crate::doc_processor::{self, UploadedDocument};
use crate::error::AppError;
use crate::session::{ConversationalSession, SessionContext};
use crate::vector_index::VectorIndex;

/// Extract, chunk and index `documents`, then install a fresh session.
///
/// The previous session is only replaced once the new index exists, so a
/// failed batch leaves the current conversation usable.
pub async fn process_documents(
    ctx: &mut SessionContext,
    services: &Services,
    documents: Vec<UploadedDocument>,
) -> Result<Render, AppError> {
    let report = build_session(ctx, services, documents).await?;
    Ok(Render::from_context(ctx).with_status(report.summary()))
}

async fn build_session(
    ctx: &mut SessionContext,
    services: &Services,
    documents: Vec<UploadedDocument>,
) -> Result<ProcessReport, AppError> {
    tracing::info!(documents = documents.len(), "processing upload batch");

    // PDF parsing is CPU-bound; keep it off the async workers.
    let extracted = tokio::task::spawn_blocking(move || doc_processor::extract_text(&documents))
        .await
        .map_err(|e| AppError::Internal(format!("extraction task failed: {}", e)))??;

    let chunks = services.splitter.split_text(&extracted.text);
    tracing::info!(chunks = chunks.len(), "split document text");
    let chunk_count = chunks.len();

    let index = VectorIndex::build(chunks, services.embedder.as_ref(), services.batch_size).await?;
    let session = ConversationalSession::new(
        index,
        services.embedder.clone(),
        services.chat.clone(),
        services.session.clone(),
    );
    tracing::info!(session = %session.id(), "session ready");
    ctx.replace(session);

    Ok(ProcessReport {
        documents: extracted.documents,
        chunks: chunk_count,
    })
}
