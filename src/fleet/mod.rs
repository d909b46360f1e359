// ABOUTME: Fleet API surface: traits, errors, and the HTTP client.
// ABOUTME: The orchestrator only ever sees the traits.

mod api;
mod error;
mod http;

pub use api::{DesiredState, FleetApi, PlatformApi};
pub use error::FleetError;
pub use http::HttpFleet;
