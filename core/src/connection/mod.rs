#![deny(unsafe_code)]
#![deny(warnings)]
//! Connection bookkeeping shared by the facade and the stack callbacks
//!
//! - **`state`**: lifecycle state machine
//! - **`context`**: the one mutable record per connection, plus the
//!   borrowed receive hand-off slot
//! - **`events`**: the callback set the stack drives during `poll`

pub mod context;
pub mod events;
pub mod state;

pub use context::{ConnectionContext, ReceiveSlot};
pub use events::EventDispatch;
pub use state::ConnectionState;
