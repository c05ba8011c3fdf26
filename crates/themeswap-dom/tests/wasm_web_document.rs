#![cfg(all(target_arch = "wasm32", feature = "web"))]
#![forbid(unsafe_code)]

//! `WebDocument` against a real browser document.
//!
//! Run:
//!   wasm-pack test --headless --firefox crates/themeswap-dom --features web

use std::cell::Cell;
use std::rc::Rc;

use themeswap_dom::{DocumentPort, DomError, InsertPosition, LinkSpec, WebDocument};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Element, Event, Node};

wasm_bindgen_test_configure!(run_in_browser);

fn web() -> WebDocument {
    WebDocument::from_window().unwrap()
}

fn head_element(doc: &WebDocument, tag: &str, id: &str) -> Element {
    let element = doc.document().create_element(tag).unwrap();
    element.set_id(id);
    doc.document().head().unwrap().append_child(&element).unwrap();
    element
}

fn link(doc: &WebDocument, id: &str) -> Element {
    doc.document().get_element_by_id(id).unwrap()
}

#[wasm_bindgen_test]
fn finds_trimmed_marker_comment_in_head() {
    let doc = web();
    let comment = doc.document().create_comment("  wasm-marker-find \n");
    let head = doc.document().head().unwrap();
    head.append_child(&comment).unwrap();

    let marker = doc.find_marker_comment("wasm-marker-find");
    assert_eq!(marker, Some(doc.node_id(&comment)));
    assert_eq!(doc.find_marker_comment("wasm-marker-absent"), None);

    head.remove_child(&comment).unwrap();
}

#[wasm_bindgen_test]
fn inserts_link_right_after_anchor() {
    let doc = web();
    let anchor = head_element(&doc, "meta", "wasm-anchor");
    let follower = head_element(&doc, "meta", "wasm-follower");
    let anchor_id = doc.node_id(&anchor);

    let created = doc
        .create_link(
            &LinkSpec::prefetch("wasm-prefetch-dark", "./dark.css"),
            None,
        )
        .unwrap();
    doc.insert(created, InsertPosition::after(doc.head(), anchor_id))
        .unwrap();

    let inserted = link(&doc, "wasm-prefetch-dark");
    let next: Option<Node> = anchor.next_sibling();
    assert!(next.is_some_and(|next| next.is_same_node(Some(&inserted))));
    assert_eq!(inserted.get_attribute("rel").as_deref(), Some("prefetch"));
    assert_eq!(inserted.get_attribute("type").as_deref(), Some("text/css"));

    let stray = doc.node_id(&follower);
    let body_child = doc.document().create_element("div").unwrap();
    let body_child_id = doc.node_id(&body_child);
    assert_eq!(
        doc.insert(body_child_id, InsertPosition::after(doc.root_content(), stray)),
        Err(DomError::NotAChild {
            parent: doc.root_content(),
            anchor: stray,
        })
    );

    for id in ["wasm-anchor", "wasm-follower", "wasm-prefetch-dark"] {
        doc.remove_by_id(id);
    }
}

#[wasm_bindgen_test]
fn remove_by_id_detaches_and_releases_the_node() {
    let doc = web();
    let created = doc
        .create_link(
            &LinkSpec::stylesheet("wasm-current-style", "./dark.css"),
            None,
        )
        .unwrap();
    doc.insert(created, InsertPosition::append(doc.head()))
        .unwrap();
    let live = doc.registered_nodes();

    assert!(doc.remove_by_id("wasm-current-style"));
    assert!(doc.document().get_element_by_id("wasm-current-style").is_none());
    assert!(!doc.remove_by_id("wasm-current-style"));
    assert!(doc.registered_nodes() < live);

    // The retired id no longer resolves, even after its slot is reused.
    let reused = doc
        .create_link(&LinkSpec::stylesheet("wasm-reused", "./light.css"), None)
        .unwrap();
    assert_ne!(reused, created);
    assert_eq!(doc.parent(created), None);
    assert_eq!(
        doc.insert(created, InsertPosition::append(doc.head())),
        Err(DomError::UnknownNode(created))
    );
}

#[wasm_bindgen_test]
fn repeated_switches_keep_the_registry_bounded() {
    let doc = web();
    let baseline = doc.registered_nodes();
    for round in 0..20 {
        doc.remove_by_id("wasm-cycled-style");
        let created = doc
            .create_link(
                &LinkSpec::stylesheet("wasm-cycled-style", format!("./theme-{round}.css")),
                None,
            )
            .unwrap();
        doc.insert(created, InsertPosition::append(doc.head()))
            .unwrap();
    }
    assert!(doc.registered_nodes() <= baseline + 2);
    doc.remove_by_id("wasm-cycled-style");
}

#[wasm_bindgen_test]
fn writes_attribute_on_body() {
    let doc = web();
    doc.set_attribute(doc.root_content(), "data-wasm-theme", "dark")
        .unwrap();
    let body = doc.document().body().unwrap();
    assert_eq!(body.get_attribute("data-wasm-theme").as_deref(), Some("dark"));
    body.remove_attribute("data-wasm-theme").unwrap();
}

#[wasm_bindgen_test]
fn onload_runs_the_callback_once() {
    let doc = web();
    let fired = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&fired);
    let created = doc
        .create_link(
            &LinkSpec::stylesheet("wasm-onload-style", "./dark.css"),
            Some(Box::new(move || counter.set(counter.get() + 1))),
        )
        .unwrap();
    doc.insert(created, InsertPosition::append(doc.head()))
        .unwrap();

    let element = link(&doc, "wasm-onload-style");
    element
        .dispatch_event(&Event::new("load").unwrap())
        .unwrap();
    assert_eq!(fired.get(), 1);

    doc.remove_by_id("wasm-onload-style");
}
