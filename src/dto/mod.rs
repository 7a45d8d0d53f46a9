pub mod auth;
pub mod moderation;
pub mod products;
pub mod reviews;
