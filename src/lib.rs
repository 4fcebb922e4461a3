//! Typed client for REST-over-Postgres gateways (PostgREST, pREST).
//!
//! Calls are captured as `(path, args)` pairs, routed to one HTTP request,
//! compiled with [`aether_dsl`], sent with retry, and normalized on the way back.

pub mod client;
pub mod error;
pub mod schema;
pub mod transport;

pub use aether_dsl as dsl;

pub use client::{
    AetherClient, AetherClientBuilder, CallArg, CallChain, CallHandler, PluginHandle, Route,
    Router, TableHandle, TableMethod, PLUGIN_NAMESPACE,
};
pub use dsl::{BigInt, Dialect, Direction, QueryFilter, QueryOptions};
pub use error::{AetherError, AetherResult, ErrorKind, NetworkCause};
pub use schema::{Column, DatabaseSchema, EnumType, ForeignKey, Table};
pub use transport::{
    CallOptions, CancelSignal, GatewayRequest, HttpCarrier, RetryOptions, Transport,
};
