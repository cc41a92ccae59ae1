// Catalog
pub mod images;
pub mod motorcycles;

// Back office
pub mod clients;
pub mod dashboard;
pub mod financial;

// Accounts
pub mod users;

pub(crate) mod validation;
