use anyhow::{bail, Result};
use url::Url;

/// Base URL of the site being scanned.
///
/// The path always ends in `/`, so relative probe paths resolve under the
/// install directory instead of the host root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    base: Url,
}

impl Target {
    /// Parses user input, prepending `https://` when no scheme is given.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Target URL is empty");
        }

        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };

        let mut base = Url::parse(&with_scheme)?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("Unsupported scheme: {}", base.scheme());
        }
        if base.host_str().is_none() {
            bail!("Target URL has no host: {}", input);
        }

        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { base })
    }

    pub fn url(&self) -> &Url {
        &self.base
    }

    /// Joins a relative path onto the base URL.
    pub fn join(&self, path: &str) -> Option<Url> {
        self.base.join(path.trim_start_matches('/')).ok()
    }

    /// Filesystem-friendly label for result files.
    pub fn file_label(&self) -> String {
        let raw = self.base.as_str();
        let without_scheme = raw
            .strip_prefix("https://")
            .or_else(|| raw.strip_prefix("http://"))
            .unwrap_or(raw);

        without_scheme
            .trim_end_matches('/')
            .replace('/', "_")
            .replace('.', "-")
            .replace(':', "_")
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adds_scheme() {
        let target = Target::parse("example.com").unwrap();
        assert_eq!(target.url().as_str(), "https://example.com/");
    }

    #[test]
    fn test_parse_keeps_http() {
        let target = Target::parse("http://example.com").unwrap();
        assert_eq!(target.url().scheme(), "http");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(Target::parse("ftp://example.com").is_err());
        assert!(Target::parse("   ").is_err());
    }

    #[test]
    fn test_join_stays_under_install_dir() {
        let target = Target::parse("https://example.com/blog?p=1").unwrap();
        let url = target.join("/wp-content/plugins/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/blog/wp-content/plugins/");
    }

    #[test]
    fn test_file_label() {
        let target = Target::parse("https://www.example.com/blog").unwrap();
        assert_eq!(target.file_label(), "www-example-com_blog");
    }
}
