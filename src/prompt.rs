/// What the model is told to answer when the input needs no change.
pub const NO_ERRORS_SENTINEL: &str = "No errors found";

/// Wrap user text in the correction instructions sent to the model.
pub fn correction_prompt(text: &str) -> String {
    format!(
        "Correct this English text: \"{text}\".\n\
         Return only the corrected version without explanations or markdown.\n\
         Maintain original meaning. If already correct, return \"{sentinel}\".",
        sentinel = NO_ERRORS_SENTINEL,
    )
}

/// The model's reply with trailing whitespace and newlines removed.
pub fn clean_reply(reply: &str) -> &str {
    reply.trim_end()
}

/// True when the model answered with the "nothing to fix" sentinel rather
/// than a corrected sentence.
pub fn is_no_correction(reply: &str) -> bool {
    let normalized = reply.trim().trim_end_matches(['.', '!']).to_lowercase();
    normalized == NO_ERRORS_SENTINEL.to_lowercase()
        || normalized.starts_with("no correction needed")
}
