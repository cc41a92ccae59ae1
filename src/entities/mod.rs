pub mod client;
pub mod financial_record;
pub mod motorcycle;
pub mod motorcycle_image;
pub mod user;

pub use client::Entity as Client;
pub use financial_record::Entity as FinancialRecord;
pub use motorcycle::Entity as Motorcycle;
pub use motorcycle_image::Entity as MotorcycleImage;
pub use user::Entity as User;
