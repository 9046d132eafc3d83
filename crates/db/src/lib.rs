pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_memory, DbPool};
pub use fixtures::{DemoSeedDataset, SeedResult, SeedVerification};
