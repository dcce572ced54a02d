//! Fixed fingerprint tables for WordPress.
//!
//! Every technique reads its paths and markers from here. Probe paths are
//! relative to the target's base URL.

/// Substring looked for in generator meta tags and hosting headers.
pub const PLATFORM_NAME: &str = "wordpress";

/// Content directory referenced by script and stylesheet URLs.
pub const CONTENT_MARKER: &str = "wp-content";

pub const PLUGIN_MARKER: &str = "/wp-content/plugins/";
pub const THEME_MARKER: &str = "/wp-content/themes/";

pub const PLUGIN_ROOT: &str = "wp-content/plugins/";
pub const THEME_ROOT: &str = "wp-content/themes/";

/// Paths whose `200 OK` alone confirms the platform.
pub const KNOWN_PATHS: &[&str] = &[
    "wp-admin/",
    "wp-content/",
    "wp-includes/",
    "readme.html",
    "wp-login.php",
];

/// Roots that may expose a directory index of installed plugins.
pub const PLUGIN_LISTING_PATHS: &[&str] = &["wp-content/plugins/", "plugins/"];

pub const THEME_LISTING_PATHS: &[&str] = &["wp-content/themes/"];

/// `(path under the plugin root, display name)` of files that only exist
/// when the plugin is installed.
pub const PLUGIN_SIGNATURE_FILES: &[(&str, &str)] = &[
    ("akismet/akismet.php", "Akismet Anti-Spam"),
    ("jetpack/jetpack.php", "Jetpack"),
    ("yoast-seo/wp-seo.php", "Yoast SEO"),
    ("wordpress-seo/wp-seo.php", "Yoast SEO"),
    ("contact-form-7/wp-contact-form-7.php", "Contact Form 7"),
    ("woocommerce/woocommerce.php", "WooCommerce"),
    ("elementor/elementor.php", "Elementor"),
    ("wordfence/wordfence.php", "Wordfence Security"),
];

/// Folder names under `wp-content/` that are never plugins.
pub const FALSE_POSITIVE_SLUGS: &[&str] = &[
    "uploads",
    "cache",
    "languages",
    "themes",
    "assets",
    "js",
    "css",
    "fonts",
    "images",
    "upgrade",
];

/// Placeholder name in the stock readme template.
pub const README_PLACEHOLDER_NAME: &str = "Plugin Name";

/// Response header some managed hosts use to name the platform.
pub const HOSTING_HEADER: &str = "x-hosting-provider";

/// Body classes emitted by hosted WordPress deployments.
///
/// Low precision: `vip` in particular shows up on unrelated sites. These
/// only run after every standard signal came back negative.
pub const HOSTED_CLASSES: &[&str] = &["wpcom", "vip", "wordpress-vip"];

/// Marker left in page source by the VIP platform.
pub const HOSTED_BODY_MARKER: &str = "wpvip";

/// Substring in a `Server` header, or in a `403` challenge page, left by
/// the edge protection service.
pub const PROTECTION_MARKER: &str = "cloudflare";

pub const PROTECTION_NAME: &str = "Cloudflare";
