pub mod chat;
pub mod geocoding;
