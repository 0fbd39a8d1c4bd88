//! In-memory state collaborator.

mod seed;
mod store;

pub use seed::{SeedData, SeedError, SeedSession};
pub use store::InMemoryPlanningStore;
