//! Publish/subscribe glue between triggers and the components that react to them.
//!
//! Triggers (app lifecycle, user actions, push notifications) [`emit`](EventBus::emit) an
//! [`Event`]; every [`Handler`] registered for the event's [`EventName`] runs. Handlers may read and
//! write the store, call the selector or the poller, and emit further events.
//!
//! ```rust,no_run
//! use wallet_sync::{Event, EventBus, EventName, Handler};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! bus.on(
//!     EventName::MnemonicBackupNeeded,
//!     Handler::new(|event| async move {
//!         println!("show backup prompt: {event:?}");
//!         Ok(())
//!     }),
//! );
//!
//! // fire-and-forget
//! bus.emit(Event::AppBackupCheckRequested);
//!
//! // or wait for the handlers
//! let results = bus.emit(Event::WalletsSyncRequested).wait().await;
//! # }
//! ```

mod bus;
mod event;
mod handle;
mod throttle;

pub use bus::{EventBus, Handler, HandlerResult};
pub use event::{Event, EventName, PushKind, PushNotification};
pub use handle::EmitHandle;
pub use throttle::throttle;
