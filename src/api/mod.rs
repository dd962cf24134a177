pub mod auth;
pub mod dashboard;
pub mod google_oauth;
pub mod health;
pub mod ticket;
pub mod user;
