//! # Event Bus
//!
//! A typed, asynchronous broadcast bus shared by the payment slices.
//! Webhook handlers publish what happened; listeners such as the audit trail
//! subscribe without the publishers knowing about them.
//!
//! * **Type-Safe**: Events are identified by their Rust type.
//! * **Fan-out**: Every subscriber sees every event published after it subscribed.
//! * **Lag tolerant**: [`EventReceiverExt::next_event`] skips over dropped messages.
//!
//! # Example
//!
//! ```rust
//! use qpay_event_bus::{EventBus, EventBusError, EventReceiverExt};
//!
//! #[derive(Debug)]
//! struct InvoicePaid { amount_cents: i64 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     let mut rx = bus.subscribe::<InvoicePaid>()?;
//!     bus.publish(InvoicePaid { amount_cents: 4_900 })?;
//!
//!     let event = rx.next_event().await.expect("bus is open");
//!     assert_eq!(event.amount_cents, 4_900);
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{Event, EventBus};
pub use error::EventBusError;
pub use receiver::EventReceiverExt;
