pub mod extract;
pub mod gravatar;
pub mod handlers;
pub mod password;
pub mod store;
pub mod token;
