pub mod stories;
pub mod story_images;
pub mod user_sessions;
pub mod users;

pub use stories::Entity as Stories;
pub use story_images::Entity as StoryImages;
pub use user_sessions::Entity as UserSessions;
pub use users::Entity as Users;
