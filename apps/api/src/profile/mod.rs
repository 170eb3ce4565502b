pub mod handlers;
pub mod normalize;
pub mod store;
