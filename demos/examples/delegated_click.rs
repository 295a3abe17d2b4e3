// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delegated click dispatch through capture and bubble.
//!
//! A three-level tree handles `click` at every level. Only the root container
//! carries native listeners; the event system walks the fibers to find handlers.
//! The middle level stops propagation during the bubble phase.
//!
//! Run:
//! - `cargo run -p ripple_demos --example delegated_click`
//! - `RUST_LOG=ripple_events=trace cargo run -p ripple_demos --example delegated_click`

use std::cell::RefCell;
use std::rc::Rc;

use ripple_dom::{Document, NativeEvent};
use ripple_events::{
    EventSystem, Fiber, FiberTree, Listener, ListenerResult, Props, SyntheticEvent, listener,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut doc = Document::new();
    let container = doc.append_element(doc.document(), "div");
    let mut fibers = FiberTree::new();
    let root = fibers.insert(None, Fiber::host_root(container));
    let mut events = EventSystem::for_document(&doc);
    events.attach_root(&mut doc, &fibers, root);

    let log = Rc::new(RefCell::new(Vec::<String>::new()));
    let record = |label: String, stop: bool| -> Listener {
        let log = log.clone();
        listener(move |ev: &mut SyntheticEvent| -> ListenerResult {
            log.borrow_mut().push(format!("{label} ({})", ev.event_type()));
            if stop {
                ev.stop_propagation();
            }
            Ok(())
        })
    };

    let mut parent = root;
    let mut parent_node = container;
    for (tag, name) in [("section", "outer"), ("div", "middle"), ("button", "button")] {
        let node = doc.append_element(parent_node, tag);
        let props = Props::new()
            .with("onClickCapture", record(format!("{name} capture"), false))
            .with("onClick", record(format!("{name} bubble"), name == "middle"));
        let fiber = fibers.insert(Some(parent), Fiber::host_component(tag, node, props));
        events.commit(&mut doc, &fibers, fiber);
        parent = fiber;
        parent_node = node;
    }
    let button = parent_node;

    println!(
        "native click listeners on the container: {} capture, {} bubble",
        doc.listener_count(container, "click", true),
        doc.listener_count(container, "click", false)
    );

    events.deliver(&mut doc, &fibers, NativeEvent::new("click", Some(button)))?;
    println!("== Dispatch ==");
    for line in log.borrow().iter() {
        println!("  {line}");
    }
    assert_eq!(
        *log.borrow(),
        vec![
            "outer capture (click)",
            "middle capture (click)",
            "button capture (click)",
            "button bubble (click)",
            "middle bubble (click)",
        ]
    );
    Ok(())
}
