pub mod dashboard;
pub mod ticket;
pub mod user;
