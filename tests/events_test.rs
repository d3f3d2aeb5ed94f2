use std::cell::RefCell;
use std::rc::Rc;

use medikit::error::Error;
use medikit::events::{Dispatcher, EventId};

#[derive(Debug, Default)]
struct Trace {
    calls: Vec<&'static str>,
}

const ON_TEST: EventId<Trace> = EventId::new("test.on_test");
const ON_NESTED: EventId<Trace> = EventId::new("test.on_nested");

fn record(name: &'static str) -> impl Fn(&Dispatcher, &mut Trace) -> medikit::error::Result<()> {
    move |_, trace: &mut Trace| {
        trace.calls.push(name);
        Ok(())
    }
}

#[test]
fn test_priority_order() {
    let dispatcher = Dispatcher::new();
    dispatcher.add_listener(ON_TEST, 10, record("a"));
    dispatcher.add_listener(ON_TEST, -10, record("b"));
    dispatcher.add_listener(ON_TEST, 0, record("c"));

    let mut trace = Trace::default();
    dispatcher.dispatch(ON_TEST, &mut trace).unwrap();

    assert_eq!(trace.calls, ["b", "c", "a"]);
    assert_eq!(dispatcher.get_listeners("test.on_test"), [-10, 0, 10]);
}

#[test]
fn test_equal_priorities_keep_registration_order() {
    let dispatcher = Dispatcher::new();
    dispatcher.add_listener(ON_TEST, 0, record("first"));
    dispatcher.add_listener(ON_TEST, -5, record("early"));
    dispatcher.add_listener(ON_TEST, 0, record("second"));
    dispatcher.add_listener(ON_TEST, 0, record("third"));

    let mut trace = Trace::default();
    dispatcher.dispatch(ON_TEST, &mut trace).unwrap();

    assert_eq!(trace.calls, ["early", "first", "second", "third"]);
}

#[test]
fn test_dispatch_without_listeners() {
    let dispatcher = Dispatcher::new();
    let mut trace = Trace::default();

    dispatcher.dispatch(ON_TEST, &mut trace).unwrap();

    assert!(trace.calls.is_empty());
    assert!(!dispatcher.has_listeners("test.on_test"));
}

#[test]
fn test_failing_listener_stops_dispatch() {
    let dispatcher = Dispatcher::new();
    dispatcher.add_listener(ON_TEST, 0, record("before"));
    dispatcher.add_listener(ON_TEST, 1, |_, _: &mut Trace| Err(Error::ConfigError("boom".into())));
    dispatcher.add_listener(ON_TEST, 2, record("after"));

    let mut trace = Trace::default();
    let result = dispatcher.dispatch(ON_TEST, &mut trace);

    assert!(matches!(result, Err(Error::ConfigError(_))));
    assert_eq!(trace.calls, ["before"]);
}

#[test]
fn test_nested_dispatch_and_late_registration() {
    let dispatcher = Dispatcher::new();
    let late_calls = Rc::new(RefCell::new(0));

    dispatcher.add_listener(ON_NESTED, 0, record("nested"));
    let counter = Rc::clone(&late_calls);
    dispatcher.add_listener(ON_TEST, 0, move |dispatcher, trace: &mut Trace| {
        trace.calls.push("outer");
        dispatcher.dispatch(ON_NESTED, trace)?;
        let counter = Rc::clone(&counter);
        dispatcher.add_listener(ON_TEST, 5, move |_, _: &mut Trace| {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        Ok(())
    });

    let mut trace = Trace::default();
    dispatcher.dispatch(ON_TEST, &mut trace).unwrap();

    assert_eq!(trace.calls, ["outer", "nested"]);
    // Listeners added during a dispatch only see the next one.
    assert_eq!(*late_calls.borrow(), 0);
    assert_eq!(dispatcher.get_listeners("test.on_test"), [0, 5]);
}
