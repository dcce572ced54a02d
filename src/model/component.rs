use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Target;
use crate::version::is_newer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Plugin,
    Theme,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Plugin => "plugin",
            ComponentKind::Theme => "theme",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentKind::Plugin => "Plugin",
            ComponentKind::Theme => "Theme",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How a component was found on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[serde(rename = "resource URL")]
    ResourceUrl,
    #[serde(rename = "known file")]
    KnownSignatureFile,
    #[serde(rename = "directory listing")]
    DirectoryListing,
    #[serde(rename = "API enumeration")]
    RegistrySlugProbe,
    #[serde(rename = "readme.txt")]
    ReadmeVerified,
}

impl DetectionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            DetectionMethod::ResourceUrl => "resource URL",
            DetectionMethod::KnownSignatureFile => "known file",
            DetectionMethod::DirectoryListing => "directory listing",
            DetectionMethod::RegistrySlugProbe => "API enumeration",
            DetectionMethod::ReadmeVerified => "readme.txt",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Plugin directory data attached after a registry lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tested: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_installs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

/// A plugin or theme detected on the target.
///
/// `detected_by` keeps the first technique that saw the slug. Later
/// sightings only fill fields that are still empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub detected_by: DetectionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<DetectionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<RegistryMetadata>,
}

impl Component {
    pub fn new(slug: impl Into<String>, kind: ComponentKind, detected_by: DetectionMethod) -> Self {
        Self {
            slug: slug.into(),
            kind,
            detected_by,
            verified_by: None,
            name: None,
            version: None,
            author: None,
            details: None,
        }
    }

    pub fn plugin(slug: impl Into<String>, detected_by: DetectionMethod) -> Self {
        Self::new(slug, ComponentKind::Plugin, detected_by)
    }

    pub fn theme(slug: impl Into<String>, detected_by: DetectionMethod) -> Self {
        Self::new(slug, ComponentKind::Theme, detected_by)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Fills empty fields from a later sighting of the same slug.
    pub fn absorb(&mut self, other: Component) {
        if self.verified_by.is_none() {
            self.verified_by = other.verified_by;
        }
        if self.name.is_none() {
            self.name = other.name;
        }
        if self.version.is_none() {
            self.version = other.version;
        }
        if self.author.is_none() {
            self.author = other.author;
        }
        if self.details.is_none() {
            self.details = other.details;
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified_by.is_some()
    }

    /// Name to show, preferring what the target itself reported.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.details.as_ref().and_then(|d| d.name.as_deref()))
    }

    /// Returns the registry version when it is newer than the detected one.
    pub fn latest_version(&self) -> Option<&str> {
        let detected = self.version.as_deref()?;
        let latest = self.details.as_ref()?.version.as_deref()?;
        if is_newer(latest, detected) {
            Some(latest)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub target: String,
    pub scan_time: DateTime<Utc>,
    pub platform_detected: bool,
    /// Edge protection service seen in front of the target. Detection and
    /// enumeration may be incomplete when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<String>,
    pub components: Vec<Component>,
}

impl ScanResult {
    pub fn new(target: &Target, platform_detected: bool, components: Vec<Component>) -> Self {
        Self {
            target: target.to_string(),
            scan_time: Utc::now(),
            platform_detected,
            protection: None,
            components,
        }
    }

    pub fn with_protection(mut self, protection: Option<String>) -> Self {
        self.protection = protection;
        self
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(|c| c.kind == ComponentKind::Plugin)
    }

    pub fn themes(&self) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(|c| c.kind == ComponentKind::Theme)
    }
}
