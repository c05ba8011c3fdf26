use themeswap_dom::{DomError, NodeId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ThemeSwitchError>;

/// Configuration and document failures surfaced to the caller.
///
/// Recoverable problems (a missing marker comment, an unknown theme key) are
/// logged with `tracing::warn!` instead and never reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeSwitchError {
    #[error("insertion point {node} is not attached to a parent node")]
    DetachedInsertionPoint { node: NodeId },

    #[error("To use `use_theme_switcher`, component must be within a ThemeSwitcherProvider")]
    MissingProvider,

    #[error(transparent)]
    Dom(#[from] DomError),
}
