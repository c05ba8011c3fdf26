#![forbid(unsafe_code)]

//! Published switcher context and provider scoping.
//!
//! A [`ThemeSwitcherContext`] is the read-only value consumers see:
//! the [`Switcher`], the key identity map, the current theme and the status.
//! Providers publish it through an [`Observable`](crate::reactive::Observable)
//! and make it reachable from nested code by entering a scope; nested code
//! reads it with [`use_theme_switcher`].
//!
//! Scopes live on a thread-local stack. The innermost live scope wins, and a
//! scope whose provider was dropped is skipped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::{Result, ThemeSwitchError};
use crate::status::Status;
use crate::theme_map::ThemeKeys;

/// Something that can switch themes on behalf of a [`Switcher`].
pub(crate) trait SwitchTarget {
    fn switch_theme(&self, theme: &str) -> Result<()>;
}

/// Something that can produce the current context value.
pub(crate) trait ContextSource {
    fn context(&self) -> ThemeSwitcherContext;
}

/// Handle consumers call to change themes.
///
/// Two switchers compare equal only when they are the same handle generation:
/// the provider issues a new one whenever its theme map is replaced.
#[derive(Clone)]
pub struct Switcher {
    target: Weak<dyn SwitchTarget>,
    identity: Rc<()>,
}

impl Switcher {
    pub(crate) fn new(target: Weak<dyn SwitchTarget>) -> Self {
        Self {
            target,
            identity: Rc::new(()),
        }
    }

    /// Switch to `theme`.
    ///
    /// A switch after the provider was dropped does nothing.
    pub fn switch(&self, theme: &str) -> Result<()> {
        match self.target.upgrade() {
            Some(target) => target.switch_theme(theme),
            None => {
                debug!(theme, "switch requested after provider was dropped");
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.identity, &other.identity)
    }
}

impl PartialEq for Switcher {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Switcher {}

impl fmt::Debug for Switcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switcher")
            .field("attached", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// The value a provider exposes to nested consumers.
#[derive(Clone, Debug)]
pub struct ThemeSwitcherContext {
    pub switcher: Switcher,
    pub themes: ThemeKeys,
    pub current_theme: Option<String>,
    pub status: Status,
}

impl ThemeSwitcherContext {
    /// Shorthand for `self.switcher.switch(theme)`.
    pub fn switch(&self, theme: &str) -> Result<()> {
        self.switcher.switch(theme)
    }
}

/// Equal when nothing a consumer could observe differs: same switcher and key
/// map handles, same status, same current theme.
impl PartialEq for ThemeSwitcherContext {
    fn eq(&self, other: &Self) -> bool {
        self.switcher.same_as(&other.switcher)
            && self.themes.same_as(&other.themes)
            && self.status == other.status
            && self.current_theme == other.current_theme
    }
}

impl Eq for ThemeSwitcherContext {}

thread_local! {
    static PROVIDERS: RefCell<Vec<(u64, Weak<dyn ContextSource>)>> = const { RefCell::new(Vec::new()) };
    static NEXT_SCOPE: Cell<u64> = const { Cell::new(0) };
}

/// Guard returned by entering a provider scope. Dropping it leaves the scope.
///
/// Guards may be dropped in any order: each one removes only its own entry.
#[must_use = "the provider scope ends when this guard is dropped"]
pub struct ProviderScope {
    id: u64,
    _not_send: PhantomData<Rc<()>>,
}

impl fmt::Debug for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderScope").field("id", &self.id).finish()
    }
}

impl Drop for ProviderScope {
    fn drop(&mut self) {
        PROVIDERS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(at) = stack.iter().rposition(|(id, _)| *id == self.id) {
                stack.remove(at);
            }
        });
    }
}

pub(crate) fn enter_scope(source: Weak<dyn ContextSource>) -> ProviderScope {
    let id = NEXT_SCOPE.with(|next| {
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    });
    PROVIDERS.with(|stack| stack.borrow_mut().push((id, source)));
    ProviderScope {
        id,
        _not_send: PhantomData,
    }
}

/// Read the context of the innermost enclosing provider.
///
/// Fails with [`ThemeSwitchError::MissingProvider`] outside every provider
/// scope.
pub fn use_theme_switcher() -> Result<ThemeSwitcherContext> {
    let source = PROVIDERS.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find_map(|(_, source)| source.upgrade())
    });
    source
        .map(|source| source.context())
        .ok_or(ThemeSwitchError::MissingProvider)
}
