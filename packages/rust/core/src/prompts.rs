//! Inline task prompts for structuring, drafting and review.

/// Instruct the formatter to turn a free-text outline into `{"topics": [..]}`.
pub fn structuring_description(raw_outline: &str) -> String {
    format!(
        "Take the following text, which contains a list of topics:\n\
         ---\n\
         {raw_outline}\n\
         ---\n\
         Extract every item of the list, in order. Build a single JSON object with the key \
         \"topics\" holding an array with the items of the list.\n\
         Your output MUST be only the JSON, without any additional text or explanation."
    )
}

pub const STRUCTURING_EXPECTED: &str =
    r#"A single well-formed JSON object. Example: {"topics": ["Topic 1", "Topic 2"]}"#;

/// Ask the writer to develop one topic, continuing from what came before.
pub fn draft_description(topic: &str, recent_context: &str) -> String {
    format!(
        "Based on the context below, develop the topic: '{topic}'.\n\
         Write in colloquial Brazilian Portuguese. Do NOT use emojis or English words.\n\
         \n\
         CONTEXT OF WHAT HAS ALREADY BEEN WRITTEN:\n\
         ---\n\
         {recent_context}\n\
         ---"
    )
}

pub const DRAFT_EXPECTED: &str = "One or more paragraphs of text that go deeper into the topic.";

/// The draft itself arrives as the task's context.
pub const REVIEW_DESCRIPTION: &str = "Review the draft provided as context. Remove ALL emojis. \
     Translate any English word into a good Brazilian Portuguese equivalent. \
     Keep the tone conversational but professional. \
     Return ONLY the corrected, clean text.";

pub const REVIEW_EXPECTED: &str =
    "The final text, 100% in Brazilian Portuguese and without emojis.";
