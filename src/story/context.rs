//! Story context for narrative continuity.

use crate::defaults;
use crate::story::model::StorySpace;

/// Joins the narratives of the `window` most recent chapters, oldest first.
///
/// Returns an empty string until the story holds at least `window` chapters.
/// Pure: recomputed before every run, never cached on the story.
pub fn derive_context(story: &StorySpace, window: usize, separator: &str) -> String {
    if window == 0 || story.chapter_count() < window {
        return String::new();
    }
    story
        .recent_chapters(window)
        .rev()
        .map(|chapter| chapter.narrative())
        .collect::<Vec<_>>()
        .join(separator)
}

/// [`derive_context`] with the default window of three chapters.
pub fn story_context(story: &StorySpace) -> String {
    derive_context(story, defaults::CONTEXT_CHAPTERS, defaults::CONTEXT_SEPARATOR)
}
