#![forbid(unsafe_code)]

//! The theme switcher provider.
//!
//! [`ThemeSwitcherProvider`] owns one switcher state per mount and wires the
//! pieces together:
//!
//! ```text
//!  mount ──▶ default theme switch ──▶ prefetch pass ──▶ publish
//!  Switcher::switch ──▶ StyleSwapEngine ──▶ state commit ──▶ publish
//!  host load event ──▶ LoadTicket completion ──▶ publish
//!  set_theme_map ──▶ new Switcher + keys ──▶ publish ──▶ prefetch pass
//! ```
//!
//! Publishing recomputes the [`ThemeSwitcherContext`] and hands it to an
//! [`Observable`], which drops it unless the switcher handle, the key map
//! handle, the status or the current theme changed.
//!
//! Load callbacks and switchers hold weak references: once the provider is
//! dropped, late load events and stray switch calls do nothing.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use themeswap_dom::{DocumentPort, LoadCallback};
use tracing::{debug, info};

use crate::config::{Identifiers, InsertionPoint, ProviderConfig, StaleLoadPolicy};
use crate::context::{self, ContextSource, ProviderScope, SwitchTarget, Switcher, ThemeSwitcherContext};
use crate::engine::{StyleSwapEngine, SwitchOutcome};
use crate::error::Result;
use crate::prefetch::prefetch_themes;
use crate::reactive::{Observable, Subscription};
use crate::resolver::InsertionResolver;
use crate::status::{LoadOutcome, LoadTicket, Status, ThemeSwitcherState};
use crate::theme_map::{ThemeKeys, ThemeMap};

struct ProviderCore<D: DocumentPort + 'static> {
    this: Weak<ProviderCore<D>>,
    document: D,
    engine: StyleSwapEngine,
    stale_load_policy: StaleLoadPolicy,
    theme_map: RefCell<ThemeMap>,
    themes: RefCell<ThemeKeys>,
    default_theme: RefCell<Option<String>>,
    switcher: RefCell<Switcher>,
    state: RefCell<ThemeSwitcherState>,
    published: Observable<ThemeSwitcherContext>,
}

impl<D: DocumentPort + 'static> ProviderCore<D> {
    fn new_switcher(this: &Weak<Self>) -> Switcher {
        let target: Weak<dyn SwitchTarget> = this.clone();
        Switcher::new(target)
    }

    fn snapshot(&self) -> ThemeSwitcherContext {
        let state = self.state.borrow();
        ThemeSwitcherContext {
            switcher: self.switcher.borrow().clone(),
            themes: self.themes.borrow().clone(),
            current_theme: state.current_theme().map(str::to_owned),
            status: state.status(),
        }
    }

    fn publish(&self) {
        let value = self.snapshot();
        if self.published.set(value) {
            debug!(version = self.published.version(), "context republished");
        }
    }

    fn load_callback(&self, ticket: LoadTicket) -> LoadCallback {
        let core = self.this.clone();
        Box::new(move || match core.upgrade() {
            Some(core) => core.complete_load(&ticket),
            None => debug!(
                theme = ticket.theme(),
                "stylesheet loaded after provider was dropped"
            ),
        })
    }

    fn complete_load(&self, ticket: &LoadTicket) {
        let outcome = self
            .state
            .borrow_mut()
            .complete(ticket, self.stale_load_policy);
        let elapsed_ms = ticket.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            LoadOutcome::Applied => {
                info!(theme = ticket.theme(), elapsed_ms, "theme stylesheet loaded");
            }
            LoadOutcome::AppliedStale => {
                debug!(
                    theme = ticket.theme(),
                    generation = ticket.generation(),
                    "superseded stylesheet load marked the current switch loaded"
                );
            }
            LoadOutcome::Ignored => {
                debug!(
                    theme = ticket.theme(),
                    generation = ticket.generation(),
                    "ignored superseded stylesheet load"
                );
                return;
            }
        }
        self.publish();
    }

    fn prefetch(&self) -> Result<usize> {
        let themes = self.theme_map.borrow().clone();
        prefetch_themes(&self.document, self.engine.resolver(), &themes)
    }
}

impl<D: DocumentPort + 'static> SwitchTarget for ProviderCore<D> {
    fn switch_theme(&self, theme: &str) -> Result<()> {
        let themes = self.theme_map.borrow().clone();
        let outcome = self.engine.switch(&self.document, &themes, &self.state, theme, |ticket| {
            self.load_callback(ticket)
        })?;
        if let SwitchOutcome::Started(_) = outcome {
            self.publish();
        }
        Ok(())
    }
}

impl<D: DocumentPort + 'static> ContextSource for ProviderCore<D> {
    fn context(&self) -> ThemeSwitcherContext {
        self.published.get()
    }
}

/// Owns the switcher state for one mount over a document.
pub struct ThemeSwitcherProvider<D: DocumentPort + 'static> {
    core: Rc<ProviderCore<D>>,
}

impl<D: DocumentPort + 'static> std::fmt::Debug for ThemeSwitcherProvider<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeSwitcherProvider")
            .field("state", &*self.core.state.borrow())
            .field("themes", &*self.core.theme_map.borrow())
            .field("identifiers", self.core.engine.identifiers())
            .finish_non_exhaustive()
    }
}

impl<D: DocumentPort + 'static> ThemeSwitcherProvider<D> {
    /// Mount a provider over `document`.
    ///
    /// Switches to the default theme (if any and non-empty), then prefetches
    /// every theme.
    /// A detached insertion point element fails the mount.
    pub fn mount(config: ProviderConfig, document: D) -> Result<Self> {
        let (theme_map, insertion_point, identifiers, default_theme, stale_load_policy) =
            config.into_parts();
        let default_theme = default_theme.filter(|theme| !theme.is_empty());
        let engine = StyleSwapEngine::new(identifiers, InsertionResolver::new(insertion_point));
        let themes = ThemeKeys::of(&theme_map);

        let core = Rc::new_cyclic(|this: &Weak<ProviderCore<D>>| {
            let switcher = ProviderCore::new_switcher(this);
            let initial = ThemeSwitcherContext {
                switcher: switcher.clone(),
                themes: themes.clone(),
                current_theme: None,
                status: Status::Idle,
            };
            ProviderCore {
                this: this.clone(),
                document,
                engine,
                stale_load_policy,
                theme_map: RefCell::new(theme_map),
                themes: RefCell::new(themes),
                default_theme: RefCell::new(default_theme.clone()),
                switcher: RefCell::new(switcher),
                state: RefCell::new(ThemeSwitcherState::new()),
                published: Observable::new(initial),
            }
        });
        debug!(
            themes = core.theme_map.borrow().len(),
            default_theme = default_theme.as_deref(),
            "mounting theme switcher provider"
        );

        if let Some(theme) = default_theme.as_deref() {
            core.switch_theme(theme)?;
        }
        core.prefetch()?;
        Ok(Self { core })
    }

    /// Replace the theme map.
    ///
    /// An identical handle changes nothing. Otherwise the switcher handle is
    /// renewed, the key map is rebuilt if the key set changed, the context is
    /// republished and missing prefetch links are created.
    pub fn set_theme_map(&self, theme_map: ThemeMap) -> Result<()> {
        if self.core.theme_map.borrow().same_as(&theme_map) {
            return Ok(());
        }
        let keys_changed = !self.core.theme_map.borrow().same_key_set(&theme_map);
        if keys_changed {
            *self.core.themes.borrow_mut() = ThemeKeys::of(&theme_map);
        }
        *self.core.theme_map.borrow_mut() = theme_map;
        *self.core.switcher.borrow_mut() = ProviderCore::new_switcher(&self.core.this);
        debug!(keys_changed, "theme map replaced");
        self.core.publish();
        self.core.prefetch()?;
        Ok(())
    }

    /// Change the default theme. A change to `Some(theme)` switches to it.
    /// An empty theme counts as none.
    pub fn set_default_theme(&self, theme: Option<&str>) -> Result<()> {
        let theme = theme.filter(|theme| !theme.is_empty());
        if self.core.default_theme.borrow().as_deref() == theme {
            return Ok(());
        }
        *self.core.default_theme.borrow_mut() = theme.map(str::to_owned);
        match theme {
            Some(theme) => self.core.switch_theme(theme),
            None => Ok(()),
        }
    }

    /// Switch themes directly, as a consumer would through the context.
    pub fn switch(&self, theme: &str) -> Result<()> {
        self.core.switch_theme(theme)
    }

    /// The currently published context value.
    #[must_use]
    pub fn context(&self) -> ThemeSwitcherContext {
        self.core.context()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.core.state.borrow().status()
    }

    #[must_use]
    pub fn current_theme(&self) -> Option<String> {
        self.core.state.borrow().current_theme().map(str::to_owned)
    }

    #[must_use]
    pub fn switcher(&self) -> Switcher {
        self.core.switcher.borrow().clone()
    }

    #[must_use]
    pub fn theme_map(&self) -> ThemeMap {
        self.core.theme_map.borrow().clone()
    }

    #[must_use]
    pub fn identifiers(&self) -> &Identifiers {
        self.core.engine.identifiers()
    }

    #[must_use]
    pub fn insertion_point(&self) -> Option<&InsertionPoint> {
        self.core.engine.resolver().point()
    }

    #[must_use]
    pub fn document(&self) -> &D {
        &self.core.document
    }

    /// How many times the published context changed since mount.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.core.published.version()
    }

    /// Call `callback` with every newly published context value.
    pub fn subscribe(&self, callback: impl Fn(&ThemeSwitcherContext) + 'static) -> Subscription {
        self.core.published.subscribe(callback)
    }

    /// Make this provider the innermost one for [`context::use_theme_switcher`]
    /// until the guard drops.
    pub fn enter(&self) -> ProviderScope {
        let source: Weak<dyn ContextSource> = Rc::downgrade(&self.core) as Weak<dyn ContextSource>;
        context::enter_scope(source)
    }

    /// Run `content` inside this provider's scope.
    pub fn provide<R>(&self, content: impl FnOnce() -> R) -> R {
        let _scope = self.enter();
        content()
    }

    /// Tear the provider down. Nodes it created stay in the document.
    pub fn unmount(self) {
        debug!(
            current_theme = self.core.state.borrow().current_theme(),
            "unmounting theme switcher provider"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use themeswap_dom::MemoryDocument;

    fn themes() -> ThemeMap {
        ThemeMap::from([("dark", "./dark.css"), ("light", "./light.css")])
    }

    #[test]
    fn mount_without_default_stays_idle() {
        let doc = MemoryDocument::new();
        let provider = ThemeSwitcherProvider::mount(ProviderConfig::new(themes()), doc.clone()).unwrap();
        let context = provider.context();
        assert_eq!(context.status, Status::Idle);
        assert_eq!(context.current_theme, None);
        assert_eq!(context.themes.get("dark"), Some("dark"));
        assert_eq!(doc.attribute(doc.root_content(), "data-theme"), None);
        assert_eq!(doc.query(&[("rel", "prefetch")]).len(), 2);
        assert_eq!(provider.version(), 0);
    }

    #[test]
    fn load_after_unmount_is_dropped() {
        let doc = MemoryDocument::new();
        let provider = ThemeSwitcherProvider::mount(
            ProviderConfig::new(themes()).default_theme("dark"),
            doc.clone(),
        )
        .unwrap();
        let link = doc.element_by_id("current-theme-style").unwrap();
        let switcher = provider.switcher();
        provider.unmount();
        assert!(doc.fire_load(link));
        assert!(switcher.switch("light").is_ok());
        assert!(doc.query(&[("href", "./light.css"), ("rel", "stylesheet")]).is_empty());
    }

    #[test]
    fn identical_theme_map_changes_nothing() {
        let doc = MemoryDocument::new();
        let map = themes();
        let provider = ThemeSwitcherProvider::mount(ProviderConfig::new(map.clone()), doc.clone()).unwrap();
        let before = (provider.version(), doc.mutation_count());
        let switcher = provider.switcher();
        provider.set_theme_map(map).unwrap();
        assert_eq!((provider.version(), doc.mutation_count()), before);
        assert!(provider.switcher().same_as(&switcher));
    }

    #[test]
    fn new_theme_map_renews_switcher_and_prefetches() {
        let doc = MemoryDocument::new();
        let provider = ThemeSwitcherProvider::mount(ProviderConfig::new(themes()), doc.clone()).unwrap();
        let old = provider.context();

        provider
            .set_theme_map(ThemeMap::from([
                ("dark", "./dark.css"),
                ("light", "./light.css"),
            ]))
            .unwrap();
        let same_keys = provider.context();
        assert!(!same_keys.switcher.same_as(&old.switcher));
        assert!(same_keys.themes.same_as(&old.themes));
        assert_eq!(doc.query(&[("rel", "prefetch")]).len(), 2);

        provider
            .set_theme_map(ThemeMap::from([("sepia", "./sepia.css")]))
            .unwrap();
        let new_keys = provider.context();
        assert!(!new_keys.themes.same_as(&old.themes));
        assert_eq!(new_keys.themes.get("sepia"), Some("sepia"));
        assert_eq!(doc.query(&[("rel", "prefetch")]).len(), 3);
    }

    #[test]
    fn default_theme_change_switches() {
        let doc = MemoryDocument::new();
        let provider = ThemeSwitcherProvider::mount(
            ProviderConfig::new(themes()).default_theme("dark"),
            doc.clone(),
        )
        .unwrap();
        provider.set_default_theme(Some("dark")).unwrap();
        assert_eq!(provider.current_theme().as_deref(), Some("dark"));

        provider.set_default_theme(Some("light")).unwrap();
        assert_eq!(provider.current_theme().as_deref(), Some("light"));

        provider.set_default_theme(None).unwrap();
        assert_eq!(provider.current_theme().as_deref(), Some("light"));
    }
}
