#![forbid(unsafe_code)]

//! Active stylesheet swapping.
//!
//! [`StyleSwapEngine::switch`] owns the lifecycle of the single active-theme
//! link: it removes the previous one, creates and inserts the new one, stamps
//! the theme attribute on the root content element, and moves the state
//! machine to `Loading`. The load callback is built by the caller from the
//! [`LoadTicket`], so the engine stays free of provider plumbing.
//!
//! # Ordering
//!
//! 1. Same theme as current: return, nothing touched.
//! 2. Unknown theme: remove the active link, warn, state unchanged.
//! 3. Resolve the insertion position (a detached anchor fails here, before any
//!    mutation).
//! 4. Remove the active link, create and insert the new one.
//! 5. Commit `Loading` and the current theme.
//! 6. Write the attribute. This happens before the stylesheet has loaded.
//!
//! # Known hazard
//!
//! A link removed by a later switch can still deliver its load event. Under
//! [`StaleLoadPolicy::Advance`](crate::StaleLoadPolicy::Advance) that marks the
//! newer switch as loaded too early.

use std::cell::RefCell;

use themeswap_dom::{DocumentPort, LinkSpec, LoadCallback};
use tracing::{debug, debug_span, warn};

use crate::config::Identifiers;
use crate::error::Result;
use crate::resolver::InsertionResolver;
use crate::status::{LoadTicket, ThemeSwitcherState};
use crate::theme_map::ThemeMap;

/// What a call to [`StyleSwapEngine::switch`] did.
#[derive(Debug, Clone)]
pub enum SwitchOutcome {
    /// The requested theme was already current.
    Unchanged,
    /// The key is not in the theme map; only the old link was removed.
    UnknownTheme,
    /// A new stylesheet load started.
    Started(LoadTicket),
}

#[derive(Debug, Clone)]
pub struct StyleSwapEngine {
    identifiers: Identifiers,
    resolver: InsertionResolver,
}

impl StyleSwapEngine {
    #[must_use]
    pub fn new(identifiers: Identifiers, resolver: InsertionResolver) -> Self {
        Self {
            identifiers,
            resolver,
        }
    }

    #[must_use]
    pub fn identifiers(&self) -> &Identifiers {
        &self.identifiers
    }

    #[must_use]
    pub fn resolver(&self) -> &InsertionResolver {
        &self.resolver
    }

    /// Switch the active stylesheet to `theme`.
    ///
    /// `state` is only borrowed around reads and the final commit, never while
    /// the document is being mutated.
    pub fn switch<D, F>(
        &self,
        document: &D,
        themes: &ThemeMap,
        state: &RefCell<ThemeSwitcherState>,
        theme: &str,
        on_load: F,
    ) -> Result<SwitchOutcome>
    where
        D: DocumentPort + ?Sized,
        F: FnOnce(LoadTicket) -> LoadCallback,
    {
        let _span = debug_span!("themeswap.switch", theme).entered();

        if state.borrow().is_current(theme) {
            debug!("theme already active");
            return Ok(SwitchOutcome::Unchanged);
        }

        let Some(href) = themes.get(theme) else {
            document.remove_by_id(&self.identifiers.id);
            warn!(theme, "Could not find specified theme");
            return Ok(SwitchOutcome::UnknownTheme);
        };

        let position = self.resolver.resolve(document)?;
        if document.remove_by_id(&self.identifiers.id) {
            debug!(id = %self.identifiers.id, "removed previous stylesheet");
        }

        let ticket = state.borrow().prepare(theme);
        let link = document.create_link(
            &LinkSpec::stylesheet(self.identifiers.id.as_str(), href),
            Some(on_load(ticket.clone())),
        )?;
        document.insert(link, position)?;

        state.borrow_mut().commit(&ticket);
        document.set_attribute(document.root_content(), &self.identifiers.attr, theme)?;
        debug!(
            href,
            generation = ticket.generation(),
            attr = %self.identifiers.attr,
            "stylesheet swap started"
        );
        Ok(SwitchOutcome::Started(ticket))
    }
}
