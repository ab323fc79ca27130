pub mod cache;
pub mod forecast;
pub mod health;
pub mod profiles;
