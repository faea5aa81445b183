//! Layered acquisition of the preload snapshot.
//!
//! HTML first: locate the embedded payload, repair it, parse it. The JSON
//! API is the fallback when the page carries nothing usable.

pub mod api_fallback;
pub mod http_client;
pub mod locator;
pub mod sanitizer;
pub mod validator;

pub use api_fallback::{fetch_fallback, ApiFallback};
pub use http_client::{HttpClient, HttpResponse, Transport, TransportOptions};
pub use locator::{locate_in_html, PreloadExtraction, PreloadSource};
pub use sanitizer::sanitize;
pub use validator::validate_preload_data;
