pub mod api_response;
pub mod pagination;
pub mod policy;
pub mod token;
