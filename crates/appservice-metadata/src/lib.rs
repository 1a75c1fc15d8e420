pub mod appservice;

pub use k8_types;

/// API group of the AppService custom resource
pub const GROUP: &str = "app.codcodog.com";
pub const V1: &str = "v1";
