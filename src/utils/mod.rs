pub mod geo;
pub mod limits;
pub mod jwt;
