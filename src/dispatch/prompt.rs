//! Prompts for chunk and summary requests.

use crate::client::{ChatMessage, CompletionRequest, DecodingParams};
use crate::types::Chunk;

const CHUNK_SYSTEM_PROMPT: &str = "You answer questions using only the document excerpt you are given. \
If the excerpt does not contain the answer, reply briefly that this part of the document does not cover it.";

const SUMMARY_SYSTEM_PROMPT: &str = "You condense answers. Keep every fact, figure and name that \
answers the question and drop repetition.";

/// Builds the request for one chunk: question, `document i of N`,
/// `part j of M` and the chunk text.
pub fn chunk_request(
    model: &str,
    question: &str,
    chunk: &Chunk,
    decoding: DecodingParams,
) -> CompletionRequest {
    let (doc, doc_total) = chunk.document_position();
    let (part, part_total) = chunk.chunk_position();
    let user = format!(
        "Question: {}\n\nDocument {} of {} ({}), part {} of {}:\n\n{}",
        question.trim(),
        doc,
        doc_total,
        chunk.document_label,
        part,
        part_total,
        chunk.text
    );
    CompletionRequest::new(
        model,
        vec![
            ChatMessage::system(CHUNK_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ],
        decoding,
    )
}

pub fn summary_request(
    model: &str,
    aggregate: &str,
    target_words: usize,
    decoding: DecodingParams,
) -> CompletionRequest {
    let user = format!(
        "Summarize the following answer in about {} words:\n\n{}",
        target_words, aggregate
    );
    CompletionRequest::new(
        model,
        vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ],
        decoding,
    )
}
