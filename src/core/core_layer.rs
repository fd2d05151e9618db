// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "registry/registry_service.rs"]
pub mod registry;

#[path = "citizenship/citizenship_service.rs"]
pub mod citizenship;

#[path = "legislature/legislature_service.rs"]
pub mod legislature;

#[path = "elections/mod.rs"]
pub mod elections;

#[path = "corporations/corporation_service.rs"]
pub mod corporations;

#[path = "statutes/mod.rs"]
pub mod statutes;
