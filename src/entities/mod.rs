pub mod meetup;
pub mod message;
pub mod participant;
pub mod user;
