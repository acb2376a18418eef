//! Docker Compose parsing.
//!
//! Raw YAML is checked against a structural schema, deserialized into a
//! typed [`ComposeDocument`] and summarised as [`ComposeMetadata`].
//!
//! # Example
//!
//! ```rust
//! use compose_bridge::compose::parse_compose;
//!
//! let parsed = parse_compose("services:\n  web:\n    image: nginx\n    ports: [\"8080:80\"]\n").unwrap();
//! let web = parsed.metadata.service("web").unwrap();
//! assert_eq!(web.ports[0].host_port, 8080);
//! ```

pub mod metadata;
pub mod model;
pub mod parser;
pub mod schema;

pub use metadata::{
    ComposeMetadata, MountType, PortMapping, Protocol, ServiceMetadata, VolumeMount,
    flatten_environment, parse_port, parse_volume,
};
pub use model::{
    BuildConfig, ComposeDocument, Deploy, DeployResources, DependsOn, Environment, HealthCheck,
    Logging, NetworkSpec, Placement, ResourceSpec, RestartPolicy, Service, ServiceNetworks,
    StringOrList, UpdateConfig, VolumeSpec,
};
pub use parser::{ParsedCompose, parse_compose, parse_compose_file};
