use crate::model::{Component, ScanResult};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Slug")]
    slug: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Detection Method")]
    method: String,
    #[tabled(rename = "Last Updated")]
    last_updated: String,
    #[tabled(rename = "Active Installs")]
    active_installs: String,
}

impl From<&Component> for ComponentRow {
    fn from(c: &Component) -> Self {
        let details = c.details.as_ref();
        Self {
            slug: c.slug.clone(),
            name: truncate(c.display_name().unwrap_or("-"), 40),
            version: format_version(c),
            kind: c.kind.display_name().to_string(),
            method: format_method(c),
            last_updated: details
                .and_then(|d| d.last_updated.clone())
                .unwrap_or_else(|| "-".to_string()),
            active_installs: details
                .and_then(|d| d.active_installs)
                .map(format_installs)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub fn print_cli_table(result: &ScanResult) -> Result<()> {
    print!("{}", render_table(result));
    Ok(())
}

pub(crate) fn render_table(result: &ScanResult) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("Target: {}\n", result.target));
    out.push_str(&format!(
        "Scan completed at: {}\n\n",
        result.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(protection) = &result.protection {
        out.push_str(&format!(
            "Protection: {} (detection may be limited)\n\n",
            protection
        ));
    }

    if !result.platform_detected {
        out.push_str("WordPress not detected.\n");
        return out;
    }

    if result.components.is_empty() {
        out.push_str("WordPress detected, but no plugins or themes were found.\n");
        return out;
    }

    out.push_str(&format!("Found {} components:\n\n", result.components.len()));
    let rows: Vec<ComponentRow> = result.components.iter().map(ComponentRow::from).collect();
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out.push_str("\n\n");
    out.push_str(&summary(result));
    out
}

fn summary(result: &ScanResult) -> String {
    let plugins = result.plugins().count();
    let themes = result.themes().count();
    let verified = result.plugins().filter(|c| c.is_verified()).count();
    let outdated = result
        .plugins()
        .filter(|c| c.latest_version().is_some())
        .count();

    let mut out = String::from("Summary:\n");
    out.push_str(&format!("  Plugins: {} ({} verified by readme)\n", plugins, verified));
    out.push_str(&format!("  Themes: {}\n", themes));
    if outdated > 0 {
        out.push_str(&format!("  Outdated plugins: {}\n", outdated));
    }
    out
}

fn format_version(c: &Component) -> String {
    let detected = c.version.as_deref().unwrap_or("-");
    match c.latest_version() {
        Some(latest) => format!("{} \x1b[33m(latest {})\x1b[0m", detected, latest),
        None => detected.to_string(),
    }
}

fn format_method(c: &Component) -> String {
    match c.verified_by {
        Some(verified) if verified != c.detected_by => {
            format!("{} + {}", c.detected_by, verified)
        }
        _ => c.detected_by.to_string(),
    }
}

/// `6000000` as `6,000,000+`, the way the directory advertises install
/// counts.
fn format_installs(count: u64) -> String {
    let digits = count.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push('+');
    grouped
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DetectionMethod, RegistryMetadata, Target};

    fn target() -> Target {
        Target::parse("https://blog.example.com").unwrap()
    }

    #[test]
    fn test_format_installs() {
        assert_eq!(format_installs(0), "0+");
        assert_eq!(format_installs(900), "900+");
        assert_eq!(format_installs(6_000_000), "6,000,000+");
        assert_eq!(format_installs(12_345), "12,345+");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ünïcödé plugin name", 10), "Ünïcödé...");
    }

    #[test]
    fn test_not_detected() {
        let result = ScanResult::new(&target(), false, Vec::new());
        assert!(render_table(&result).contains("WordPress not detected."));
    }

    #[test]
    fn test_protection_line_in_header() {
        let plain = render_table(&ScanResult::new(&target(), false, Vec::new()));
        assert!(!plain.contains("Protection:"));

        let shielded = ScanResult::new(&target(), false, Vec::new())
            .with_protection(Some("Cloudflare".to_string()));
        let out = render_table(&shielded);
        assert!(out.contains("Protection: Cloudflare (detection may be limited)"));
        assert!(out.contains("WordPress not detected."));
    }

    #[test]
    fn test_row_flags_newer_registry_version() {
        let mut akismet = Component::plugin("akismet", DetectionMethod::ResourceUrl).with_version("4.9");
        akismet.verified_by = Some(DetectionMethod::ReadmeVerified);
        akismet.details = Some(RegistryMetadata {
            name: Some("Akismet Anti-spam".to_string()),
            version: Some("5.3.1".to_string()),
            last_updated: Some("2024-03-21 2:41pm GMT".to_string()),
            active_installs: Some(6_000_000),
            ..Default::default()
        });

        let row = ComponentRow::from(&akismet);

        assert!(row.version.starts_with("4.9"));
        assert!(row.version.contains("(latest 5.3.1)"));
        assert_eq!(row.name, "Akismet Anti-spam");
        assert_eq!(row.method, "resource URL + readme.txt");
        assert_eq!(row.active_installs, "6,000,000+");
    }

    #[test]
    fn test_table_lists_components_and_summary() {
        let result = ScanResult::new(
            &target(),
            true,
            vec![
                Component::plugin("jetpack", DetectionMethod::KnownSignatureFile).with_name("Jetpack"),
                Component::theme("astra", DetectionMethod::DirectoryListing),
            ],
        );

        let rendered = render_table(&result);

        assert!(rendered.contains("Detection Method"));
        assert!(rendered.contains("jetpack"));
        assert!(rendered.contains("known file"));
        assert!(rendered.contains("Plugins: 1 (0 verified by readme)"));
        assert!(rendered.contains("Themes: 1"));
    }
}
