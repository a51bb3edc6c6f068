pub mod assets;
pub mod health;
pub mod metrics;
pub mod proxy;
