//! Push gateway client
//!
//! Wire protocol types, the event handler table and the session state
//! machine (connect → identify → heartbeat → dispatch).

mod client;
mod error;
mod handler;
mod protocol;

pub use client::{ClientConfig, ConnectionState, GatewayClient, GatewayResolver, StaticResolver};
pub use error::{GatewayError, GatewayResult};
pub use handler::{EventHandler, HandlerTable};
pub use protocol::{
    bot_token, Envelope, Hello, Identify, Intents, OpCode, AT_MESSAGE_CREATE, C2C_MESSAGE_CREATE,
    DIRECT_MESSAGE_CREATE, GROUP_AT_MESSAGE_CREATE,
};
