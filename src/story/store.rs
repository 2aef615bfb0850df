//! In-memory store of story spaces.

use crate::defaults;
use crate::error::{LifeTalesError, Result};
use crate::story::model::{Chapter, StorySpace};

/// Story spaces, newest first. Chapters are write-once: only appends exist.
#[derive(Debug, Clone, Default)]
pub struct StoryStore {
    stories: Vec<StorySpace>,
}

impl StoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty story space and put it at the front of the collection.
    ///
    /// The title must not be blank; a blank theme becomes the default theme.
    pub fn create_story(&mut self, title: &str, theme: &str) -> Result<&StorySpace> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LifeTalesError::InvalidStory {
                message: "title must not be empty".to_string(),
            });
        }
        let theme = match theme.trim() {
            "" => defaults::DEFAULT_THEME,
            theme => theme,
        };

        let story = StorySpace::new(title.to_string(), theme.to_string());
        tracing::debug!(id = story.id(), title, theme, "story created");
        self.stories.insert(0, story);
        Ok(&self.stories[0])
    }

    /// Prepend `chapter` to the story with `story_id`.
    pub fn append_chapter(&mut self, story_id: &str, chapter: Chapter) -> Result<()> {
        let story = self
            .stories
            .iter_mut()
            .find(|s| s.id() == story_id)
            .ok_or_else(|| LifeTalesError::StoryNotFound {
                id: story_id.to_string(),
            })?;
        tracing::debug!(story = story_id, chapter = chapter.id(), "chapter appended");
        story.prepend(chapter);
        Ok(())
    }

    /// All story spaces, newest first.
    pub fn list_stories(&self) -> &[StorySpace] {
        &self.stories
    }

    pub fn get_story(&self, story_id: &str) -> Option<&StorySpace> {
        self.stories.iter().find(|s| s.id() == story_id)
    }

    pub fn contains(&self, story_id: &str) -> bool {
        self.get_story(story_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::AgentResponse;
    use crate::story::model::MediaType;

    fn chapter(narrative: &str) -> Chapter {
        Chapter::from_response(
            AgentResponse {
                transcription: narrative.to_string(),
                narrative: narrative.to_string(),
                mood: "Calm".to_string(),
                tags: vec!["Life".to_string()],
                illustration: None,
            },
            MediaType::Voice,
        )
    }

    #[test]
    fn test_create_story_prepends() {
        let mut store = StoryStore::new();
        let first = store.create_story("Kyoto Spring", "Travel").unwrap().id().to_string();
        let second = store
            .create_story("The Garden Project", "Project")
            .unwrap()
            .id()
            .to_string();

        let ids: Vec<&str> = store.list_stories().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_new_story_is_empty() {
        let mut store = StoryStore::new();
        let story = store.create_story("  Summer  ", "Travel").unwrap();
        assert_eq!(story.title(), "Summer");
        assert_eq!(story.chapter_count(), 0);
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let mut store = StoryStore::new();
        assert!(matches!(
            store.create_story("   ", "Travel"),
            Err(LifeTalesError::InvalidStory { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_blank_theme_defaults_to_personal() {
        let mut store = StoryStore::new();
        let story = store.create_story("Diary", "").unwrap();
        assert_eq!(story.theme(), "Personal");
    }

    #[test]
    fn test_append_chapter_newest_first() {
        let mut store = StoryStore::new();
        let id = store.create_story("Diary", "Daily").unwrap().id().to_string();

        store.append_chapter(&id, chapter("monday")).unwrap();
        store.append_chapter(&id, chapter("tuesday")).unwrap();

        let story = store.get_story(&id).unwrap();
        let narratives: Vec<&str> = story.chapters().map(|c| c.narrative()).collect();
        assert_eq!(narratives, vec!["tuesday", "monday"]);
    }

    #[test]
    fn test_append_to_unknown_story_fails() {
        let mut store = StoryStore::new();
        store.create_story("Diary", "Daily").unwrap();

        match store.append_chapter("nope", chapter("lost")) {
            Err(LifeTalesError::StoryNotFound { id }) => assert_eq!(id, "nope"),
            other => panic!("Expected StoryNotFound, got {:?}", other),
        }
        assert_eq!(store.list_stories()[0].chapter_count(), 0);
    }

    #[test]
    fn test_append_only_touches_target_story() {
        let mut store = StoryStore::new();
        let a = store.create_story("A", "").unwrap().id().to_string();
        let b = store.create_story("B", "").unwrap().id().to_string();

        store.append_chapter(&a, chapter("only in a")).unwrap();

        assert_eq!(store.get_story(&a).unwrap().chapter_count(), 1);
        assert_eq!(store.get_story(&b).unwrap().chapter_count(), 0);
    }

    #[test]
    fn test_get_story_unknown_is_none() {
        let store = StoryStore::new();
        assert!(store.get_story("missing").is_none());
        assert!(!store.contains("missing"));
    }
}
