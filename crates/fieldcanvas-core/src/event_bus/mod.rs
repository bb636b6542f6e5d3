//! # Event Bus Module
//!
//! Publish/subscribe channel between the placement session and the
//! surrounding UI (menus, forms, notices).
//!
//! ## Overview
//!
//! - The session publishes typed events without knowing its listeners
//! - Listeners filter by category or by field and receive events
//!   synchronously, or poll a tokio broadcast receiver from an async task
//! - A field filter keeps following a new field after its create resolves
//! - Each session owns its own bus; there is no process-wide instance
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldcanvas_core::event_bus::{AppEvent, EventBus, EventCategory, EventFilter};
//!
//! let bus = EventBus::new();
//! let sub = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Selection]),
//!     |event| {
//!         if let AppEvent::Selection(sel) = event {
//!             println!("selection: {:?}", sel);
//!         }
//!     },
//! );
//! bus.unsubscribe(sub);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
