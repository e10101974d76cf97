//! API surface shared by every userhub transport binding.
//!
//! The same message structs are encoded as protobuf on the gRPC binding
//! (via `prost`) and as JSON on the Connect and REST bindings (via `serde`),
//! so the three transports cannot drift apart.

pub mod code;
pub mod envelope;
pub mod messages;
pub mod methods;

pub use code::ErrorCode;
pub use envelope::Envelope;
