//! Event dispatching.
//!
//! Features never talk to each other directly: they register listeners on a
//! [`Dispatcher`] for typed event identifiers, and the dispatcher calls them in
//! ascending priority order. Listeners receive the dispatcher itself so they can
//! dispatch nested events (feature extension points) or register more listeners
//! while a dispatch is in progress.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::config::registry::ConfigurationRegistry;
use crate::error::Result;

/// Typed identifier of an event, carrying the payload type `E` listeners receive.
pub struct EventId<E> {
    name: &'static str,
    payload: PhantomData<fn(&mut E)>,
}

impl<E> EventId<E> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, payload: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E> Clone for EventId<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EventId<E> {}

impl<E> fmt::Debug for EventId<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.name)
    }
}

impl<E> fmt::Display for EventId<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Happens first; features derive their data and write most of the files.
pub const ON_START: EventId<ProjectEvent> = EventId::new("medikit.on_start");

/// Happens last, for features that need the complete picture.
pub const ON_END: EventId<ProjectEvent> = EventId::new("medikit.on_end");

/// Happens when a generated file was opened for writing.
pub const ON_FILE_OPENED: EventId<FileEvent> = EventId::new("medikit.on_file_opened");

/// Happens when a generated file was written and closed.
pub const ON_FILE_CLOSED: EventId<FileEvent> = EventId::new("medikit.on_file_closed");

/// Listener callback for events carrying a payload of type `E`.
pub type Listener<E> = Rc<dyn Fn(&Dispatcher, &mut E) -> Result<()>>;

struct Registration {
    priority: i32,
    // Always a `Listener<E>` for the `E` of the event id it was registered with.
    listener: Rc<dyn Any>,
}

/// Priority ordered publish/subscribe hub.
#[derive(Default)]
pub struct Dispatcher {
    listeners: RefCell<HashMap<&'static str, Vec<Registration>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event`.
    ///
    /// Lower priorities run first. Listeners sharing a priority run in registration order.
    pub fn add_listener<E, F>(&self, event: EventId<E>, priority: i32, listener: F)
    where
        E: 'static,
        F: Fn(&Dispatcher, &mut E) -> Result<()> + 'static,
    {
        let listener: Listener<E> = Rc::new(listener);
        let mut listeners = self.listeners.borrow_mut();
        let registrations = listeners.entry(event.name).or_default();
        let index = registrations.partition_point(|r| r.priority <= priority);
        registrations.insert(index, Registration { priority, listener: Rc::new(listener) });
    }

    /// Calls every listener of `event` with `payload`, in priority order.
    ///
    /// The first failing listener aborts the dispatch and its error is returned.
    pub fn dispatch<E: 'static>(&self, event: EventId<E>, payload: &mut E) -> Result<()> {
        let is_file_event = event.name.starts_with("medikit.on_file_");
        if !is_file_event {
            debug!("\u{26a1} Dispatching {event}...");
        }

        // Snapshot, so listeners can add listeners while we iterate.
        let listeners: Vec<Listener<E>> = self
            .listeners
            .borrow()
            .get(event.name)
            .map(|registrations| {
                registrations
                    .iter()
                    .filter_map(|r| r.listener.downcast_ref::<Listener<E>>().cloned())
                    .collect()
            })
            .unwrap_or_default();

        for listener in listeners {
            listener(self, &mut *payload)?;
        }

        if !is_file_event {
            debug!("   ... {event} done.");
        }
        Ok(())
    }

    /// Priorities of the listeners registered for `event`, in call order.
    pub fn get_listeners(&self, event: &str) -> Vec<i32> {
        self.listeners
            .borrow()
            .get(event)
            .map(|registrations| registrations.iter().map(|r| r.priority).collect())
            .unwrap_or_default()
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        !self.get_listeners(event).is_empty()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut map = f.debug_map();
        for (name, registrations) in listeners.iter() {
            map.entry(name, &registrations.len());
        }
        map.finish()
    }
}

/// Payload of the project lifecycle events.
#[derive(Debug, Default)]
pub struct ProjectEvent {
    /// Projectfile variables, in declaration order.
    pub variables: IndexMap<String, String>,
    /// Legacy file contents channel (name to content).
    pub files: IndexMap<String, String>,
    pub config: ConfigurationRegistry,
}

impl ProjectEvent {
    pub fn new(config: ConfigurationRegistry) -> Self {
        Self { config, ..Self::default() }
    }
}

/// Payload of the file events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Path of the file, relative to the project root.
    pub filename: PathBuf,
    /// Whether an existing file is replaced.
    pub overwrite: bool,
}

impl FileEvent {
    pub fn new<P: Into<PathBuf>>(filename: P, overwrite: bool) -> Self {
        Self { filename: filename.into(), overwrite }
    }
}
