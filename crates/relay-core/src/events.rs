//! Observability event system shared by every relay component.
//!
//! `AbilityIndex`, `SuspensionPolicy`, `QuotaLedger`, `ConsumeTxn` and
//! `RelayEngine` each define their own event enum and route it through an
//! [`EventListeners`] collection, so none of them hard-wire a logging or
//! metrics backend.

#[cfg(feature = "tracing")]
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event emitted by a relay component for observability purposes.
pub trait RelayEvent: Send + Sync + fmt::Debug {
    /// Machine-readable event kind, e.g. `"ability_suspended"`.
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> Instant;

    /// Name of the emitting instance (ability key, channel id, token id, ...).
    fn source(&self) -> &str;
}

/// Receives events from a component.
pub trait EventListener<E: RelayEvent>: Send + Sync {
    /// Called synchronously for every emitted event.
    fn on_event(&self, event: &E);
}

/// A boxed event listener.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered collection of event listeners for one component instance.
#[derive(Clone)]
pub struct EventListeners<E: RelayEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: RelayEvent> EventListeners<E> {
    /// Creates an empty listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to every registered listener.
    ///
    /// A panicking listener is caught so one bad observer never takes down
    /// the relay path; the panic is logged with `tracing` and counted with
    /// `metrics` when those features are enabled.
    pub fn emit(&self, event: &E) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if let Err(_panic_payload) = result {
                #[cfg(feature = "tracing")]
                log_listener_panic(index, event, _panic_payload.as_ref());

                #[cfg(feature = "metrics")]
                record_listener_panic_metric(event);

                #[cfg(not(feature = "tracing"))]
                let _ = index;

                #[cfg(not(any(feature = "tracing", feature = "metrics")))]
                let _ = _panic_payload;
            }
        }
    }

    /// True if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: RelayEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A listener backed by a closure, for ad-hoc wiring (tests, quick glue code).
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps a closure as a listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: RelayEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(feature = "tracing")]
fn log_listener_panic<E: RelayEvent>(index: usize, event: &E, panic_payload: &(dyn Any + Send)) {
    let panic_message = panic_payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    tracing::warn!(
        listener_index = index,
        source = event.source(),
        event_type = event.event_type(),
        panic_message = %panic_message,
        "relay event listener panicked"
    );
}

#[cfg(feature = "metrics")]
fn record_listener_panic_metric<E: RelayEvent>(event: &E) {
    let source_label = event.source().to_string();
    let event_type_label = event.event_type().to_string();

    metrics::counter!(
        "relay_event_listener_panics_total",
        "source" => source_label,
        "event_type" => event_type_label
    )
    .increment(1);
}
