pub mod moderation_history;
pub mod products;
pub mod reviews;
pub mod users;

pub use moderation_history::Entity as ModerationHistory;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
