pub mod fixture;
pub mod provider;
pub mod types;
