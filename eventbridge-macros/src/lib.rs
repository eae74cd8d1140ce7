//! Procedural macros for eventbridge.
//!
//! - `#[event_interface]` - Typed event adapters for Rust traits

use proc_macro::TokenStream;

mod interface;

/// Generate a typed event adapter for a trait.
///
/// For `trait Listener` this emits `ListenerAdapter`, a newtype over
/// `eventbridge::EventAdapter` that implements `Listener`. Each trait method
/// emits the event named after it; `#[event(name = "...")]` on a method
/// overrides the name. Parameters must be reference types that convert into
/// `Value`; primitive parameters are rejected. Return types follow the
/// interface return rule: `()`, primitives, or `Option<T>`/`Value` for
/// references, which always come back as `None`/`Value::Null`.
///
/// # Attributes
///
/// - `name = "..."` - Interface name used in the descriptor (defaults to the trait name)
/// - `adapter = Ident` - Name of the generated adapter type
///
/// # Example
///
/// ```rust,ignore
/// #[eventbridge::event_interface(name = "com.example.Listener")]
/// pub trait Listener {
///     #[event(name = "onTick")]
///     fn on_tick(&self, label: String);
///     #[event(name = "onAsk")]
///     fn on_ask(&self, question: String) -> bool;
/// }
///
/// let adapter = ListenerAdapter::new(engine.shared())?;
/// adapter.add_sync_listener("onTick", recorder.function())?;
/// adapter.on_tick("hello".to_owned());
/// assert!(adapter.on_ask("ok?".to_owned()));
/// ```
#[proc_macro_attribute]
pub fn event_interface(attr: TokenStream, item: TokenStream) -> TokenStream {
    interface::event_interface_impl(attr, item)
}
