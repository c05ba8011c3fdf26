//! Shared fixtures for themeswap integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use themeswap::{DocumentPort, MemoryDocument, NodeId, ThemeMap};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};

pub fn dark_light() -> ThemeMap {
    ThemeMap::from([("dark", "./dark.css"), ("light", "./light.css")])
}

/// A warning captured from the `tracing` pipeline.
#[derive(Debug, Clone)]
pub struct CapturedWarning {
    pub target: String,
    pub message: String,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_owned();
        }
    }
}

struct WarningCapture {
    warnings: Arc<Mutex<Vec<CapturedWarning>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarningCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != tracing::Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.warnings.lock().unwrap().push(CapturedWarning {
            target: event.metadata().target().to_owned(),
            message: visitor.0,
        });
    }
}

/// Run `f` with a subscriber that records every WARN event on this thread.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedWarning>) {
    let warnings = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(WarningCapture {
        warnings: Arc::clone(&warnings),
    });
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = warnings.lock().unwrap().clone();
    (result, captured)
}

/// The attached active-theme link for `id`, if any.
pub fn active_link(doc: &MemoryDocument, id: &str) -> Option<NodeId> {
    doc.element_by_id(id)
}

/// `id` attributes of the head's element children, in order.
pub fn head_element_ids(doc: &MemoryDocument) -> Vec<Option<String>> {
    doc.element_children(doc.head())
        .into_iter()
        .map(|node| doc.attribute(node, "id"))
        .collect()
}
