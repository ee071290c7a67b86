pub mod client;
pub mod entity;

pub use client::OrionClient;
pub use entity::OrionEntity;
