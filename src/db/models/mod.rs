pub mod approval;
pub mod reply;
pub mod ticket;
pub mod user;
