pub mod auth;
pub mod customer;
pub mod dashboard;
pub mod import;
pub mod note;
pub mod pagination;
