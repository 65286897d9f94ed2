pub mod auth;
pub mod chat;
pub mod geocode;
pub mod meetups;
pub mod participants;
