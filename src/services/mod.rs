pub mod credentials;
pub mod forecast_cache;
pub mod geocode;
pub mod memo;
pub mod profiles;
pub mod scoring;
pub mod upstream;
