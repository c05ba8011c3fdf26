#![forbid(unsafe_code)]

//! Runtime stylesheet theme switching.
//!
//! # Role in themeswap
//! `themeswap` swaps which stylesheet is active in a document without a
//! reload. A [`ThemeSwitcherProvider`] owns the switch state for one mount and
//! publishes a [`ThemeSwitcherContext`] (switcher, theme keys, current theme,
//! status) that nested code reads with [`use_theme_switcher`].
//!
//! # This crate provides
//! - [`ThemeMap`] / [`ThemeKeys`] for the available themes.
//! - [`ProviderConfig`] for insertion point, identifiers, default theme.
//! - [`InsertionResolver`] for turning an insertion point into a position.
//! - [`prefetch_themes`] for idempotent `rel=prefetch` links.
//! - [`StyleSwapEngine`] for the active stylesheet lifecycle.
//! - [`Status`] / [`ThemeSwitcherState`] for the idle → loading → loaded
//!   state machine.
//!
//! # How it fits in the system
//! All document access goes through [`themeswap_dom::DocumentPort`]. Tests and
//! non-browser hosts use [`MemoryDocument`] and fire load events themselves;
//! browser builds use `WebDocument` (feature `web`).
//!
//! # Example
//!
//! ```
//! use themeswap::{MemoryDocument, ProviderConfig, Status, ThemeMap, ThemeSwitcherProvider};
//! use themeswap::use_theme_switcher;
//!
//! let doc = MemoryDocument::new();
//! let themes = ThemeMap::from([("dark", "./dark.css"), ("light", "./light.css")]);
//! let provider =
//!     ThemeSwitcherProvider::mount(ProviderConfig::new(themes).default_theme("dark"), doc.clone())?;
//!
//! provider.provide(|| -> themeswap::Result<()> {
//!     let context = use_theme_switcher()?;
//!     assert_eq!(context.status, Status::Loading);
//!     context.switch("light")
//! })?;
//! assert_eq!(provider.current_theme().as_deref(), Some("light"));
//! # Ok::<(), themeswap::ThemeSwitchError>(())
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod prefetch;
pub mod provider;
pub mod reactive;
pub mod resolver;
pub mod status;
pub mod theme_map;

#[cfg(feature = "serde")]
pub use config::ProviderOptions;
pub use config::{
    DEFAULT_STYLE_ID, DEFAULT_THEME_ATTR, Identifiers, InsertionPoint, PREFETCH_ID_PREFIX,
    ProviderConfig, StaleLoadPolicy,
};
pub use context::{ProviderScope, Switcher, ThemeSwitcherContext, use_theme_switcher};
pub use engine::{StyleSwapEngine, SwitchOutcome};
pub use error::{Result, ThemeSwitchError};
pub use prefetch::{prefetch_id, prefetch_themes};
pub use provider::ThemeSwitcherProvider;
pub use reactive::{Observable, Subscription};
pub use resolver::InsertionResolver;
pub use status::{LoadOutcome, LoadTicket, Status, ThemeSwitcherState};
pub use theme_map::{ThemeKeys, ThemeMap};

pub use themeswap_dom::{DocumentPort, MemoryDocument, NodeId};
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use themeswap_dom::WebDocument;
