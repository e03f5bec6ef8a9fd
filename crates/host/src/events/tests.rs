use std::sync::atomic::AtomicUsize;

use super::*;

fn counting(counter: &Arc<AtomicUsize>, flow: ControlFlow<()>) -> Listener<u32> {
	let counter = Arc::clone(counter);
	Box::new(move |_: &u32| {
		counter.fetch_add(1, Ordering::SeqCst);
		flow
	})
}

#[test]
fn continue_listener_sees_every_event() {
	let bus = EventBus::<u32>::new("test");
	let hits = Arc::new(AtomicUsize::new(0));
	let _sub = bus.subscribe(counting(&hits, ControlFlow::Continue(())));

	assert_eq!(bus.emit(&1), 1);
	assert_eq!(bus.emit(&2), 1);
	assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn break_releases_listener_after_first_delivery() {
	let bus = EventBus::<u32>::new("test");
	let hits = Arc::new(AtomicUsize::new(0));
	let sub = bus.subscribe(counting(&hits, ControlFlow::Break(())));

	assert_eq!(bus.emit(&1), 1);
	assert!(sub.is_released());
	assert!(bus.is_empty());

	assert_eq!(bus.emit(&1), 0);
	assert_eq!(hits.load(Ordering::SeqCst), 1);

	assert!(!sub.dispose(), "self-released subscription must not release twice");
}

#[test]
fn dispose_is_idempotent() {
	let bus = EventBus::<u32>::new("test");
	let hits = Arc::new(AtomicUsize::new(0));
	let sub = bus.subscribe(counting(&hits, ControlFlow::Continue(())));

	assert!(sub.dispose());
	assert!(!sub.dispose());
	assert_eq!(bus.len(), 0);
	assert_eq!(bus.emit(&7), 0);
	assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn dropping_subscription_releases_listener() {
	let bus = EventBus::<u32>::new("test");
	let hits = Arc::new(AtomicUsize::new(0));
	drop(bus.subscribe(counting(&hits, ControlFlow::Continue(()))));

	assert!(bus.is_empty());
	bus.emit(&1);
	assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn subscription_outliving_bus_disposes_quietly() {
	let bus = EventBus::<u32>::new("test");
	let sub = bus.subscribe(Box::new(|_: &u32| ControlFlow::Continue(())));
	drop(bus);
	assert!(sub.dispose());
}

#[test]
fn listener_may_dispose_another_subscription() {
	let bus = EventBus::<u32>::new("test");
	let hits = Arc::new(AtomicUsize::new(0));
	let victim = Arc::new(Mutex::new(None::<Subscription>));

	let victim_slot = Arc::clone(&victim);
	let _killer = bus.subscribe(Box::new(move |_: &u32| {
		if let Some(sub) = victim_slot.lock().take() {
			sub.dispose();
		}
		ControlFlow::Continue(())
	}));
	*victim.lock() = Some(bus.subscribe(counting(&hits, ControlFlow::Continue(()))));

	assert_eq!(bus.emit(&1), 1, "victim disposed before its turn");
	assert_eq!(hits.load(Ordering::SeqCst), 0);
	assert_eq!(bus.len(), 1);
}
