//! Prompt templates for the generative stages.

use crate::pipeline::types::PipelineConfig;

/// Instruction sent alongside audio for transcription.
pub const TRANSCRIPTION_INSTRUCTION: &str =
    "Transcribe this audio precisely. Return only the transcription.";

/// Build the semantic analysis prompt for `text`.
pub fn semantic_analysis(text: &str) -> String {
    format!(
        "Analyze the following text. Return a JSON object with:\n\
         - \"mood\": a single adjective (e.g., \"Peaceful\", \"Excited\", \"Melancholic\").\n\
         - \"tags\": an array of 3 short relevant keywords.\n\
         \n\
         Text:\n\"{}\"",
        text.trim()
    )
}

/// Build the story builder prompt for a raw memory fragment.
///
/// The continuity instruction only appears when earlier chapters exist.
pub fn story_builder(raw_input: &str, config: &PipelineConfig) -> String {
    let mut prompt = String::from(
        "You are the Story Builder for a personal memory journal.\n\
         Transform a raw memory fragment (transcription or note) into a beautiful, \
         coherent narrative paragraph.\n\n",
    );

    if config.has_context() {
        prompt.push_str(&format!(
            "Context from previous chapters: \"{}\"\n\n",
            config.story_context.trim()
        ));
    }

    prompt.push_str(&format!("New input fragment: \"{}\"\n\n", raw_input.trim()));
    prompt.push_str("Instructions:\n");
    prompt.push_str("1. Write a single, beautifully crafted paragraph (approx 50-80 words).\n");
    prompt.push_str("2. Match the tone: warm, reflective, and personal.\n");
    if config.has_context() {
        prompt.push_str("3. Ensure smooth continuity with the previous chapters.\n");
    } else {
        prompt.push_str("3. This is the opening chapter of the story.\n");
    }
    prompt.push_str("4. Do not invent facts, but enhance the prose.\n");
    if !config.style.trim().is_empty() {
        prompt.push_str(&format!("5. Write in a {} style.\n", config.style.trim()));
    }
    prompt.push_str("Output ONLY the narrative text.");
    prompt
}

/// Build the illustration prompt for a narrative and its mood.
pub fn visual_generation(narrative: &str, mood: &str) -> String {
    format!(
        "Create a soft, semi-abstract digital illustration for the following scene.\n\
         Scene: {}\n\
         Mood: {}\n\
         Style: Soft pastel colors, digital art, rounded shapes, warm lighting, minimalist composition.",
        narrative.trim(),
        mood.trim()
    )
}
