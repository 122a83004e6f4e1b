pub use super::snippet::Entity as Snippet;
pub use super::tag::Entity as Tag;
pub use super::tagged_snippet::Entity as TaggedSnippet;
pub use super::user::Entity as User;
