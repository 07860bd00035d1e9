//! Fixed prompt text used by the document pipeline.

/// System instruction for each per-chunk extraction call.
pub const EXTRACTION_INSTRUCTION: &str = "Extract the key objectives, key results, metrics, and \
priorities from this section of the document. Be concise.";

/// Appended to the caller's system message for the consolidation call.
pub const CONSOLIDATION_PREAMBLE: &str = "The user's document was too large to process in one \
pass, so it was split into sections and the key information was extracted from each section. \
Use the extracted section summaries below to answer the user's question as if you had read \
the whole document.";

/// Returned when the document is empty.
pub const NO_CONTENT: &str = "The document has no content to process.";

pub fn chunk_user_message(index: usize, total: usize, chunk: &str) -> String {
    format!("Section {index} of {total}:\n\n{chunk}")
}

/// The original query followed by every chunk output labelled `Section i:`.
pub fn consolidation_user_message(query: &str, outputs: &[String]) -> String {
    let mut message = String::from(query);
    for (i, output) in outputs.iter().enumerate() {
        message.push_str(&format!("\n\nSection {}:\n{}", i + 1, output.trim()));
    }
    message
}

pub fn error_message(error: &impl std::fmt::Display) -> String {
    format!("An error occurred while processing the document: {error}")
}
