#![forbid(unsafe_code)]

//! Provider configuration.
//!
//! [`ProviderConfig`] is a builder: only the theme map is required, every
//! other option has a default. Identifiers and the insertion point are fixed
//! once a provider mounts.

use std::fmt;

use themeswap_dom::NodeId;

use crate::theme_map::ThemeMap;

/// Default id of the active-theme stylesheet node.
pub const DEFAULT_STYLE_ID: &str = "current-theme-style";

/// Default attribute written onto the root content element.
pub const DEFAULT_THEME_ATTR: &str = "data-theme";

/// Prefix of every prefetch node id.
pub const PREFETCH_ID_PREFIX: &str = "theme-prefetch-";

/// Where new stylesheet and prefetch nodes go.
///
/// The absence of an insertion point (`None` in [`ProviderConfig`]) appends
/// to the end of the document head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertionPoint {
    /// Insert right after the first head comment whose trimmed text matches.
    Label(String),
    /// Insert right after this element, under its own parent.
    Node(NodeId),
}

impl fmt::Display for InsertionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label),
            Self::Node(node) => write!(f, "{node}"),
        }
    }
}

impl From<&str> for InsertionPoint {
    fn from(label: &str) -> Self {
        Self::Label(label.to_owned())
    }
}

impl From<String> for InsertionPoint {
    fn from(label: String) -> Self {
        Self::Label(label)
    }
}

impl From<NodeId> for InsertionPoint {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

/// Identifiers stamped into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifiers {
    /// Id of the single active-theme stylesheet node.
    pub id: String,
    /// Attribute on the root content element reflecting the active theme.
    pub attr: String,
}

impl Default for Identifiers {
    fn default() -> Self {
        Self {
            id: DEFAULT_STYLE_ID.to_owned(),
            attr: DEFAULT_THEME_ATTR.to_owned(),
        }
    }
}

/// What a load completion does when a newer switch has superseded it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum StaleLoadPolicy {
    /// Any completion marks the status loaded, including a completion for a
    /// stylesheet that was already replaced.
    #[default]
    Advance,
    /// Completions from superseded switches leave the status untouched.
    IgnoreSuperseded,
}

/// Everything a provider needs at mount.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    theme_map: ThemeMap,
    insertion_point: Option<InsertionPoint>,
    identifiers: Identifiers,
    default_theme: Option<String>,
    stale_load_policy: StaleLoadPolicy,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(theme_map: ThemeMap) -> Self {
        Self {
            theme_map,
            insertion_point: None,
            identifiers: Identifiers::default(),
            default_theme: None,
            stale_load_policy: StaleLoadPolicy::default(),
        }
    }

    /// Insert new nodes at `point` instead of the end of the head.
    #[must_use]
    pub fn insertion_point(mut self, point: impl Into<InsertionPoint>) -> Self {
        self.insertion_point = Some(point.into());
        self
    }

    /// Explicitly append to the end of the head.
    #[must_use]
    pub fn no_insertion_point(mut self) -> Self {
        self.insertion_point = None;
        self
    }

    /// Id of the active-theme stylesheet node.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.identifiers.id = id.into();
        self
    }

    /// Attribute written onto the root content element.
    #[must_use]
    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.identifiers.attr = attr.into();
        self
    }

    /// Theme switched to automatically on mount.
    #[must_use]
    pub fn default_theme(mut self, theme: impl Into<String>) -> Self {
        self.default_theme = Some(theme.into());
        self
    }

    #[must_use]
    pub fn stale_load_policy(mut self, policy: StaleLoadPolicy) -> Self {
        self.stale_load_policy = policy;
        self
    }

    #[must_use]
    pub fn theme_map(&self) -> &ThemeMap {
        &self.theme_map
    }

    #[must_use]
    pub fn insertion(&self) -> Option<&InsertionPoint> {
        self.insertion_point.as_ref()
    }

    #[must_use]
    pub fn identifiers(&self) -> &Identifiers {
        &self.identifiers
    }

    #[must_use]
    pub fn default_theme_key(&self) -> Option<&str> {
        self.default_theme.as_deref()
    }

    #[must_use]
    pub fn load_policy(&self) -> StaleLoadPolicy {
        self.stale_load_policy
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        ThemeMap,
        Option<InsertionPoint>,
        Identifiers,
        Option<String>,
        StaleLoadPolicy,
    ) {
        (
            self.theme_map,
            self.insertion_point,
            self.identifiers,
            self.default_theme,
            self.stale_load_policy,
        )
    }
}

/// Declarative provider options, as an embedding application would ship them
/// in a JSON or TOML document.
///
/// Only label insertion points can be expressed declaratively; `null` or a
/// missing `insertionPoint` both mean "append to the head".
#[cfg(feature = "serde")]
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderOptions {
    pub theme_map: ThemeMap,
    #[serde(default)]
    pub insertion_point: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attr: Option<String>,
    #[serde(default)]
    pub default_theme: Option<String>,
    #[serde(default)]
    pub stale_load_policy: StaleLoadPolicy,
}

#[cfg(feature = "serde")]
impl From<ProviderOptions> for ProviderConfig {
    fn from(options: ProviderOptions) -> Self {
        let mut config = Self::new(options.theme_map).stale_load_policy(options.stale_load_policy);
        if let Some(label) = options.insertion_point {
            config = config.insertion_point(label);
        }
        if let Some(id) = options.id {
            config = config.id(id);
        }
        if let Some(attr) = options.attr {
            config = config.attr(attr);
        }
        if let Some(theme) = options.default_theme {
            config = config.default_theme(theme);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProviderConfig::new(ThemeMap::from([("dark", "./dark.css")]));
        assert_eq!(config.identifiers().id, "current-theme-style");
        assert_eq!(config.identifiers().attr, "data-theme");
        assert_eq!(config.insertion(), None);
        assert_eq!(config.default_theme_key(), None);
        assert_eq!(config.load_policy(), StaleLoadPolicy::Advance);
    }

    #[test]
    fn builder_overrides() {
        let config = ProviderConfig::new(ThemeMap::new())
            .id("custom-id")
            .attr("custom-attr")
            .insertion_point("styles-here")
            .default_theme("dark")
            .stale_load_policy(StaleLoadPolicy::IgnoreSuperseded);
        assert_eq!(config.identifiers().id, "custom-id");
        assert_eq!(config.identifiers().attr, "custom-attr");
        assert_eq!(
            config.insertion(),
            Some(&InsertionPoint::Label("styles-here".into()))
        );
        assert_eq!(config.default_theme_key(), Some("dark"));

        let cleared = config.no_insertion_point();
        assert_eq!(cleared.insertion(), None);
    }

    #[test]
    fn insertion_point_display() {
        assert_eq!(InsertionPoint::from("marker").to_string(), "marker");
        assert_eq!(
            InsertionPoint::from(NodeId::from_raw(3)).to_string(),
            "node#3"
        );
    }
}
