//! End-to-end behaviour of the component tree: leaf bookkeeping, cascade
//! close, event routing and concurrent structural changes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wtree_core::component::ComponentHost;
use wtree_core::{
    Component, ComponentBase, ComponentTree, DynComponent, Event, EventKind, EventRef,
    FrameContext, NodeId, TreeError, TreeNode, Window,
};

#[derive(Default)]
struct Counter {
    updates: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Component for Counter {
    fn kind(&self) -> &str {
        "counter"
    }

    fn update(&mut self, _base: &ComponentBase, _frame: &FrameContext) -> bool {
        self.updates.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn on_close(&mut self, _base: &ComponentBase) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn counter(window: &Arc<Window>) -> Arc<ComponentHost<Counter>> {
    ComponentHost::new(Arc::clone(window), Counter::default())
}

fn ping() -> EventRef {
    Event::custom("ping").shared()
}

fn assert_leaf_invariant(tree: &ComponentTree) {
    let mut expected: Vec<NodeId> = tree
        .all_nodes()
        .iter()
        .filter(|n| n.is_leaf())
        .map(|n| n.id())
        .collect();
    expected.sort();
    assert_eq!(tree.leaf_ids(), expected);
}

/// R with children X, Y and grandchild Z under X.
struct Fixture {
    window: Arc<Window>,
    tree: ComponentTree,
    x: Arc<TreeNode>,
    y: Arc<TreeNode>,
    z: Arc<TreeNode>,
    z_host: Arc<ComponentHost<Counter>>,
}

fn fixture() -> Fixture {
    let window = Window::headless(320.0, 240.0);
    let tree = ComponentTree::new(counter(&window)).unwrap();
    let x = tree.root().new_node(counter(&window)).unwrap();
    let y = tree.root().new_node(counter(&window)).unwrap();
    let z_host = counter(&window);
    let z = x.new_node(z_host.clone()).unwrap();
    Fixture {
        window,
        tree,
        x,
        y,
        z,
        z_host,
    }
}

#[test]
fn test_scenario_a_close_keeps_parent_with_remaining_child_off_leaf_set() {
    let f = fixture();
    let mut expected = vec![f.y.id(), f.z.id()];
    expected.sort();
    assert_eq!(f.tree.leaf_ids(), expected);

    assert!(f.x.close());
    assert!(!f.z.is_alive());
    assert_eq!(f.tree.leaf_ids(), vec![f.y.id()]);
    assert_leaf_invariant(&f.tree);
}

#[test]
fn test_cascade_close_makes_only_child_parent_a_leaf() {
    let f = fixture();
    f.y.close();
    f.x.close();
    assert_eq!(f.tree.leaf_ids(), vec![f.tree.root().id()]);
    assert_eq!(f.tree.all_nodes().len(), 1);
    assert_leaf_invariant(&f.tree);
}

#[test]
fn test_scenario_b_unhandled_event_is_returned_unchanged() {
    let f = fixture();
    let event = ping();
    let out = f.z_host.process(&event).unwrap();
    assert!(Arc::ptr_eq(&out, &event));

    let dispatched = f.tree.dispatch(&event);
    assert!(!dispatched.consumed);
    assert!(dispatched.emitted.is_empty());
}

#[test]
fn test_scenario_c_consumed_at_leaf() {
    let f = fixture();
    f.z_host
        .register_processor(EventKind::custom("ping"), |_, _, _| None);
    let dispatched = f.tree.dispatch(&ping());
    assert!(dispatched.consumed);
    assert!(dispatched.emitted.is_empty());
    assert_eq!(f.tree.stats().events_consumed, 1);
}

#[test]
fn test_scenario_d_replaced_at_leaf() {
    let f = fixture();
    f.z_host.register_processor(EventKind::custom("ping"), |_, _, _| {
        Some(Event::custom("pong").shared())
    });
    let dispatched = f.tree.dispatch(&ping());
    assert!(dispatched.consumed);
    assert_eq!(dispatched.emitted.len(), 1);
    assert_eq!(dispatched.emitted[0].kind(), EventKind::custom("pong"));
}

#[test]
fn test_scenario_e_concurrent_close_removes_once() {
    let f = fixture();
    let wins = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                if f.x.close() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
                let ids: Vec<NodeId> = f.tree.all_nodes().iter().map(|n| n.id()).collect();
                assert!(!ids.contains(&f.x.id()));
                assert!(!ids.contains(&f.z.id()));
            });
        }
    });
    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(f.tree.root().child_count(), 1);
    assert_leaf_invariant(&f.tree);
}

#[test]
fn test_close_twice_and_absent_lookups_are_no_ops() {
    let f = fixture();
    assert!(f.tree.delete_node(&f.x));
    assert!(!f.tree.delete_node(&f.x));
    assert!(!f.x.close());
    assert!(f.tree.find_node(&*f.z_host).is_none());
    assert!(!f.tree.delete_component(&*f.z_host));

    let stranger = counter(&f.window);
    assert!(f.tree.find_node(&*stranger).is_none());
    assert_leaf_invariant(&f.tree);
}

#[test]
fn test_find_node_locates_component() {
    let f = fixture();
    let node = f.tree.find_node(&*f.z_host).unwrap();
    assert_eq!(node.id(), f.z.id());
    assert!(f.tree.contains(&f.z));
    assert!(f.tree.delete_component(&*f.z_host));
    assert!(!f.z_host.is_alive());
    assert_eq!(f.tree.leaf_ids(), {
        let mut ids = vec![f.x.id(), f.y.id()];
        ids.sort();
        ids
    });
}

#[test]
fn test_update_reaches_every_live_node_once() {
    let window = Window::headless(100.0, 100.0);
    let updates = Arc::new(AtomicUsize::new(0));
    let make = || {
        ComponentHost::new(
            Arc::clone(&window),
            Counter {
                updates: Arc::clone(&updates),
                ..Counter::default()
            },
        )
    };
    let tree = ComponentTree::new(make()).unwrap();
    let mut frontier = vec![Arc::clone(tree.root())];
    for _ in 0..3 {
        let mut next = Vec::new();
        for node in &frontier {
            for _ in 0..4 {
                next.push(node.new_node(make()).unwrap());
            }
        }
        frontier = next;
    }
    let total = 1 + 4 + 16 + 64;
    assert_eq!(tree.all_nodes().len(), total);

    tree.update();
    assert_eq!(updates.load(Ordering::SeqCst), total);

    frontier[0].parent().unwrap().close();
    let alive = tree.all_nodes().len();
    assert_eq!(alive, total - 5);
    updates.store(0, Ordering::SeqCst);
    tree.update();
    assert_eq!(updates.load(Ordering::SeqCst), alive);
    assert_leaf_invariant(&tree);
}

#[test]
fn test_event_consumption_exclusivity() {
    let f = fixture();
    f.z_host
        .register_processor(EventKind::custom("ping"), |_, _, e| Some(Arc::clone(e)));
    let dispatched = f.tree.dispatch(&ping());
    assert!(!dispatched.consumed);
    assert!(dispatched.emitted.is_empty());
}

#[test]
fn test_consumed_by_child_skips_parent() {
    let window = Window::headless(100.0, 100.0);
    let parent_calls = Arc::new(AtomicUsize::new(0));
    let root = counter(&window);
    {
        let calls = Arc::clone(&parent_calls);
        root.register_processor(EventKind::Event, move |_, _, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            None
        });
    }
    let tree = ComponentTree::new(root).unwrap();
    let child = counter(&window);
    child.register_processor(EventKind::custom("ping"), |_, _, _| None);
    tree.root().new_node(child).unwrap();

    assert!(tree.dispatch(&ping()).consumed);
    assert_eq!(parent_calls.load(Ordering::SeqCst), 0);

    assert!(tree.dispatch(&Event::custom("other").shared()).consumed);
    assert_eq!(parent_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sibling_double_consumption_keeps_all_effects() {
    let window = Window::headless(100.0, 100.0);
    let tree = ComponentTree::new(counter(&window)).unwrap();
    let handled = Arc::new(AtomicUsize::new(0));
    for tag in ["first", "second"] {
        let host = counter(&window);
        let handled = Arc::clone(&handled);
        host.register_processor(EventKind::custom("ping"), move |_, _, _| {
            handled.fetch_add(1, Ordering::SeqCst);
            Some(Event::custom(tag).shared())
        });
        tree.root().new_node(host).unwrap();
    }

    let dispatched = tree.dispatch(&ping());
    assert!(dispatched.consumed);
    assert_eq!(handled.load(Ordering::SeqCst), 2);
    let kinds: Vec<EventKind> = dispatched.emitted.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![EventKind::custom("first"), EventKind::custom("second")]
    );
    assert_eq!(tree.stats().double_consumed, 1);
}

#[test]
fn test_shared_output_event_is_deduplicated() {
    let window = Window::headless(100.0, 100.0);
    let tree = ComponentTree::new(counter(&window)).unwrap();
    let pong = Event::custom("pong").shared();
    for _ in 0..3 {
        let host = counter(&window);
        let pong = Arc::clone(&pong);
        host.register_processor(EventKind::custom("ping"), move |_, _, _| {
            Some(Arc::clone(&pong))
        });
        tree.root().new_node(host).unwrap();
    }
    let emitted = tree.process(&ping());
    assert_eq!(emitted.len(), 1);
    assert!(Arc::ptr_eq(&emitted[0], &pong));
}

#[test]
fn test_concurrent_attach_and_close() {
    let window = Window::headless(100.0, 100.0);
    let tree = ComponentTree::new(counter(&window)).unwrap();
    let target = tree.root().new_node(counter(&window)).unwrap();
    let sibling = tree.root().new_node(counter(&window)).unwrap();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    match target.new_node(counter(&window)) {
                        Ok(_) | Err(TreeError::ParentClosed(_)) => {}
                        Err(other) => panic!("unexpected attach error: {other}"),
                    }
                    let _ = sibling.new_node(counter(&window));
                }
            });
        }
        s.spawn(|| {
            tree.update();
            target.close();
        });
    });

    assert!(!target.is_alive());
    assert!(target.children().iter().all(|c| !c.is_alive()));
    assert_eq!(sibling.child_count(), 200);
    assert_leaf_invariant(&tree);
}

#[test]
fn test_handler_can_defer_closing_its_own_node() {
    let window = Window::headless(100.0, 100.0);
    let tree = ComponentTree::new(counter(&window)).unwrap();
    let host = counter(&window);
    let node = tree.root().new_node(host.clone()).unwrap();
    host.register_processor(EventKind::custom("ping"), |_, base, _| {
        base.close_deferred();
        None
    });
    assert!(tree.dispatch(&ping()).consumed);
    assert!(node.is_alive());
    assert_eq!(window.pending_deferred(), 1);

    tree.draw(&mut wtree_core::canvas::RecordingCanvas::new());
    assert!(!node.is_alive());
    assert_eq!(tree.leaf_ids(), vec![tree.root().id()]);
}

#[test]
fn test_handler_closes_parent_synchronously() {
    let window = Window::headless(100.0, 100.0);
    let tree = ComponentTree::new(counter(&window)).unwrap();
    let dialog_host = counter(&window);
    let dialog = tree.root().new_node(dialog_host.clone()).unwrap();
    let button_host = counter(&window);
    let button = dialog.new_node(button_host.clone()).unwrap();
    button_host.register_processor(EventKind::custom("click"), |_, base, _| {
        base.node().unwrap().parent().unwrap().close();
        None
    });

    let dispatched = tree.dispatch(&Event::custom("click").shared());
    assert!(dispatched.consumed);
    assert!(!dialog.is_alive());
    assert!(!button.is_alive());
    assert_eq!(tree.leaf_ids(), vec![tree.root().id()]);
    assert_eq!(dialog_host.with(|c| c.closes.load(Ordering::SeqCst)), 1);

    // The button was busy in its own handler; its on_close waits for draw.
    assert_eq!(button_host.with(|c| c.closes.load(Ordering::SeqCst)), 0);
    assert_eq!(window.pending_deferred(), 1);
    tree.draw(&mut wtree_core::canvas::RecordingCanvas::new());
    assert_eq!(button_host.with(|c| c.closes.load(Ordering::SeqCst)), 1);
    assert_leaf_invariant(&tree);
}

#[test]
fn test_concurrent_parent_and_child_close() {
    for _ in 0..200 {
        let window = Window::headless(100.0, 100.0);
        let tree = ComponentTree::new(counter(&window)).unwrap();
        let keep = tree.root().new_node(counter(&window)).unwrap();
        let parent = tree.root().new_node(counter(&window)).unwrap();
        let first = parent.new_node(counter(&window)).unwrap();
        let second = parent.new_node(counter(&window)).unwrap();
        let grandchild = first.new_node(counter(&window)).unwrap();

        std::thread::scope(|s| {
            for node in [&parent, &first, &second, &grandchild] {
                s.spawn(move || {
                    node.close();
                });
            }
        });

        for node in [&parent, &first, &second, &grandchild] {
            assert!(!node.is_alive());
        }
        assert_eq!(tree.leaf_ids(), vec![keep.id()]);
        assert_eq!(tree.all_nodes().len(), 2);
        assert_leaf_invariant(&tree);
    }
}
