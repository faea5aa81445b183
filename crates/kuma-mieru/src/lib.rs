//! Kuma Mieru: typed snapshots of Uptime Kuma status pages, extracted from
//! the rendered HTML with a JSON API fallback.

pub mod acquisition;
pub mod cache;
pub mod error;
pub mod generate;
pub mod maintenance;
pub mod resolver;
pub mod service;
pub mod settings;
pub mod site;
pub mod time;
pub mod types;

pub use acquisition::{HttpClient, HttpResponse, Transport, TransportOptions};
pub use cache::RequestScope;
pub use error::{ErrorKind, MieruError, MieruResult};
pub use generate::{generate_config, write_generated_config};
pub use maintenance::{process_maintenance_list, resolve_status};
pub use resolver::{require_dashboard_config, PreloadResolver};
pub use service::{ConfigResolver, RenderSnapshot};
pub use settings::{GeneratedConfig, Settings};
pub use site::FeatureOverrides;
pub use types::*;
