// src/orchestrator/prompt.rs
// Prompt templates for the generation request

use url::Url;

const RETURN_FORMAT: &str = "Return a single JSON object with exactly these fields:\n\
{\"transcript\": \"<full spoken transcript of the video>\", \"notes\": [\"<key point>\", \"<key point>\"]}\n\
Do not wrap the JSON in markdown code fences and do not add commentary around it.";

const WARNINGS: &str = "- Transcribe what is actually said; do not invent dialogue.\n\
- Keep each note to a single, self-contained takeaway.\n\
- Preserve the order in which points appear in the video.";

/// Prompt for a video that was uploaded and is attached to the request
pub fn uploaded_file_prompt() -> String {
    format!(
        "# GOAL\nWatch the attached video. Produce a faithful transcript of all spoken \
content and an ordered list of the key points.\n\n# RETURN FORMAT\n{}\n\n# WARNINGS\n{}",
        RETURN_FORMAT, WARNINGS
    )
}

/// Prompt for a remote locator the model is asked to read directly.
///
/// The locator may be unreachable from the model's side, so the prompt pins
/// down what a well-formed failure answer looks like instead of leaving the
/// model to improvise.
pub fn remote_locator_prompt(locator: &Url) -> String {
    format!(
        "# GOAL\nWatch the video at {} and produce a faithful transcript of all spoken \
content and an ordered list of the key points.\n\n# RETURN FORMAT\n{}\n\n# WARNINGS\n{}\n\
- If the video cannot be accessed, still return the JSON object, with an empty \
transcript and a single note stating that the video at this URL was not accessible.",
        locator, RETURN_FORMAT, WARNINGS
    )
}
