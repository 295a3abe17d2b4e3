// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::rc::Rc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ripple_dom::{Document, NativeEvent, NodeId};
use ripple_events::{EventSystem, Fiber, FiberId, FiberTree, Props};

struct Tree {
    doc: Document,
    fibers: FiberTree,
    events: EventSystem,
    leaf: NodeId,
    hits: Rc<Cell<u64>>,
}

/// A single chain `depth` levels deep where every level handles clicks in both phases.
fn gen_chain(depth: usize) -> Tree {
    let mut doc = Document::new();
    let container = doc.append_element(doc.document(), "div");
    let mut fibers = FiberTree::new();
    let root = fibers.insert(None, Fiber::host_root(container));
    let mut events = EventSystem::for_document(&doc);
    events.attach_root(&mut doc, &fibers, root);

    let hits = Rc::new(Cell::new(0_u64));
    let mut parent: FiberId = root;
    let mut parent_node = container;
    for _ in 0..depth {
        let node = doc.append_element(parent_node, "div");
        let bubble = hits.clone();
        let capture = hits.clone();
        let props = Props::new()
            .on("onClick", move |_| {
                bubble.set(bubble.get() + 1);
                Ok(())
            })
            .on("onClickCapture", move |_| {
                capture.set(capture.get() + 1);
                Ok(())
            });
        let fiber = fibers.insert(Some(parent), Fiber::host_component("div", node, props));
        events.commit(&mut doc, &fibers, fiber);
        parent = fiber;
        parent_node = node;
    }
    Tree {
        doc,
        fibers,
        events,
        leaf: parent_node,
        hits,
    }
}

/// `count` flat siblings, each with an `onMouseEnter`, for hover sweeps.
fn gen_row(count: usize) -> (Tree, Vec<NodeId>) {
    let mut doc = Document::new();
    let container = doc.append_element(doc.document(), "div");
    let mut fibers = FiberTree::new();
    let root = fibers.insert(None, Fiber::host_root(container));
    let mut events = EventSystem::for_document(&doc);
    events.attach_root(&mut doc, &fibers, root);
    let hits = Rc::new(Cell::new(0_u64));
    let mut cells = Vec::with_capacity(count);
    for _ in 0..count {
        let node = doc.append_element(container, "span");
        let enter = hits.clone();
        let props = Props::new().on("onMouseEnter", move |_| {
            enter.set(enter.get() + 1);
            Ok(())
        });
        let fiber = fibers.insert(Some(root), Fiber::host_component("span", node, props));
        events.commit(&mut doc, &fibers, fiber);
        cells.push(node);
    }
    let leaf = cells.last().copied().unwrap_or(container);
    (
        Tree {
            doc,
            fibers,
            events,
            leaf,
            hits,
        },
        cells,
    )
}

fn bench_click(c: &mut Criterion) {
    let mut group = c.benchmark_group("click");
    for depth in [4_usize, 16, 64] {
        group.throughput(Throughput::Elements(depth as u64 * 2));
        group.bench_function(format!("deliver_depth{}", depth), |b| {
            let mut tree = gen_chain(depth);
            b.iter(|| {
                let Tree {
                    doc,
                    fibers,
                    events,
                    leaf,
                    ..
                } = &mut tree;
                events
                    .deliver(doc, fibers, NativeEvent::new("click", Some(*leaf)))
                    .unwrap();
            });
            black_box(tree.hits.get());
        });
    }
    group.finish();
}

fn bench_attach(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach");
    group.bench_function("listen_to_all_supported_events", |b| {
        b.iter_batched(
            || {
                let mut doc = Document::new();
                let container = doc.append_element(doc.document(), "div");
                let events = EventSystem::for_document(&doc);
                (doc, container, events)
            },
            |(mut doc, container, mut events)| {
                events.listen_to_all_supported_events(&mut doc, container);
                black_box(doc.listeners(container).len());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_hover(c: &mut Criterion) {
    let mut group = c.benchmark_group("hover");
    for n in [16_usize, 128] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("sweep_row_n{}", n), |b| {
            let (mut tree, cells) = gen_row(n);
            b.iter(|| {
                let mut from = None;
                for &cell in &cells {
                    let over = NativeEvent::new("mouseover", Some(cell)).with_related_target(from);
                    tree.events.deliver(&mut tree.doc, &tree.fibers, over).unwrap();
                    if let Some(prev) = from {
                        let out = NativeEvent::new("mouseout", Some(prev)).with_related_target(Some(cell));
                        tree.events.deliver(&mut tree.doc, &tree.fibers, out).unwrap();
                    }
                    from = Some(cell);
                }
            });
            black_box((tree.leaf, tree.hits.get()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_click, bench_attach, bench_hover);
criterion_main!(benches);
