pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod masks;
pub mod notes;

#[cfg(test)]
pub(crate) mod test_support;
