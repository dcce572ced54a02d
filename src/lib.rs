pub mod cache;
pub mod config;
pub mod detector;
pub mod enumerator;
pub mod error;
pub mod fetcher;
pub mod html;
pub mod model;
pub mod output;
pub mod paths;
pub mod registry;
pub mod scan;
pub mod signatures;
pub mod version;

pub use cache::KnownSlugCache;
pub use config::Config;
pub use detector::{Detection, Evidence, PlatformDetector};
pub use enumerator::{Enumerator, PluginEnumerator, ThemeEnumerator};
pub use error::{ProbeError, ProbeResult};
pub use fetcher::{HttpFetcher, PageFetcher, Prober};
pub use model::{Component, ComponentKind, DetectionMethod, RegistryMetadata, ScanResult, Target};
pub use registry::RegistryClient;
pub use scan::Scanner;
