// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enter and leave events derived from native `mouseover`/`mouseout`.
//!
//! The pointer moves from outside the window onto a leaf, then across to a leaf in
//! a sibling branch. Leaves fire inner to outer up to the common ancestor, enters
//! fire outer to inner.
//!
//! Run:
//! - `cargo run -p ripple_demos --example hover_enter_leave`

use std::cell::RefCell;
use std::rc::Rc;

use ripple_dom::{Document, NativeEvent, NodeId};
use ripple_events::{EventSystem, Fiber, FiberId, FiberTree, Props};
use tracing_subscriber::EnvFilter;

struct App {
    doc: Document,
    fibers: FiberTree,
    events: EventSystem,
    log: Rc<RefCell<Vec<String>>>,
}

impl App {
    fn add(&mut self, parent: FiberId, parent_node: NodeId, label: &str) -> (FiberId, NodeId) {
        let node = self.doc.append_element(parent_node, "div");
        let enter_log = self.log.clone();
        let leave_log = self.log.clone();
        let enter_label = format!("enter {label}");
        let leave_label = format!("leave {label}");
        let props = Props::new()
            .on("onMouseEnter", move |_| {
                enter_log.borrow_mut().push(enter_label.clone());
                Ok(())
            })
            .on("onMouseLeave", move |_| {
                leave_log.borrow_mut().push(leave_label.clone());
                Ok(())
            });
        let fiber = self
            .fibers
            .insert(Some(parent), Fiber::host_component("div", node, props));
        self.events.commit(&mut self.doc, &self.fibers, fiber);
        (fiber, node)
    }

    fn take_log(&self) -> Vec<String> {
        core::mem::take(&mut *self.log.borrow_mut())
    }
}

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
    let mut app = App {
        doc,
        fibers,
        events,
        log: Rc::new(RefCell::new(Vec::new())),
    };

    // 1 → {2 → 3, 4}
    let (one, one_node) = app.add(root, container, "1");
    let (two, two_node) = app.add(one, one_node, "2");
    let (_, three_node) = app.add(two, two_node, "3");
    let (_, four_node) = app.add(one, one_node, "4");

    // Arriving from outside the window: only an `over`, with no related target.
    app.events.deliver(
        &mut app.doc,
        &app.fibers,
        NativeEvent::new("mouseover", Some(three_node)),
    )?;
    let first = app.take_log();
    println!("== Hover (first) ==\n  {first:?}");
    assert_eq!(first, vec!["enter 1", "enter 2", "enter 3"]);

    // Moving to the sibling branch: the `out` produces both halves.
    app.events.deliver(
        &mut app.doc,
        &app.fibers,
        NativeEvent::new("mouseout", Some(three_node)).with_related_target(Some(four_node)),
    )?;
    app.events.deliver(
        &mut app.doc,
        &app.fibers,
        NativeEvent::new("mouseover", Some(four_node)).with_related_target(Some(three_node)),
    )?;
    let second = app.take_log();
    println!("== Hover (second) ==\n  {second:?}");
    assert_eq!(second, vec!["leave 3", "leave 2", "enter 4"]);
    Ok(())
}
