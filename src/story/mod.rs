//! Story spaces, chapters and the context derived from them.

pub mod context;
pub mod model;
pub mod store;

pub use context::{derive_context, story_context};
pub use model::{Chapter, MediaType, StorySpace};
pub use store::StoryStore;
