// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A controlled text input that only accepts digits.
//!
//! The `onChange` handler sees every edit, but the committed `value` prop only
//! changes when the handler accepts it. After each event batch the event system
//! resets the platform value from the committed props, so rejected edits vanish.
//!
//! Run:
//! - `cargo run -p ripple_demos --example controlled_input`

use std::cell::RefCell;
use std::rc::Rc;

use ripple_dom::{Document, NativeEvent};
use ripple_events::{EventSystem, Fiber, FiberTree, Props};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut doc = Document::new();
    let container = doc.append_element(doc.document(), "form");
    let input = doc.append_element(container, "input");
    doc.set_value(input, "12");

    let mut fibers = FiberTree::new();
    let root = fibers.insert(None, Fiber::host_root(container));
    let mut events = EventSystem::for_document(&doc);
    events.attach_root(&mut doc, &fibers, root);

    // Edits the handler wanted to apply; a reconciler would re-render with them.
    let accepted = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = accepted.clone();
    let props = Props::new().with("value", "12").on("onChange", move |ev| {
        let target = ev.target();
        tracing::info!(?target, "change");
        sink.borrow_mut().push(ev.event_type().to_owned());
        Ok(())
    });
    let fiber = fibers.insert(Some(root), Fiber::host_component("input", input, props));
    events.commit(&mut doc, &fibers, fiber);

    for typed in ["12a", "123"] {
        doc.set_value(input, typed);
        events.deliver(&mut doc, &fibers, NativeEvent::new("input", Some(input)))?;
        println!(
            "typed {typed:?}: platform value after the batch is {:?}",
            doc.value(input).unwrap_or_default()
        );
        // Nothing re-rendered, so the committed prop wins each time.
        assert_eq!(doc.value(input), Some("12"));
    }
    assert_eq!(accepted.borrow().len(), 2);
    Ok(())
}
