//! Carmine Core - transparent remote method invocation.
//!
//! A client calls methods on a typed stub; each call is packed into an
//! [`InvocationRequest`], carried to the remote side by a [`Transport`],
//! dispatched to the implementation chosen by a [`Resolver`], and the
//! [`InvocationResponse`] is unpacked back into a return value or an error.
//! A string-keyed [`Context`] travels with every call in both directions.
//!
//! # Example
//!
//! ```rust,ignore
//! use carmine_core::{remote_interface, RemoteInterface, Session};
//!
//! remote_interface! {
//!     pub trait RemoteTest => RemoteTestStub("carmine.demo.RemoteTest") {
//!         fn get_greetings = "getGreetings"(for_name: String) -> String;
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> carmine_core::Result<()> {
//!     let session = Session::new("http://localhost:8080/carmine")?;
//!     let greeter: RemoteTestStub = session.remote();
//!
//!     println!("{}", greeter.get_greetings("Ann".into()).await?);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod server;
pub mod transport;
pub mod value;

// Re-export commonly used types
pub use client::{ClientStub, RemoteInterface, Session, SessionBuilder};
pub use config::{ServerConfig, TransportOptions, WireConfig};
pub use envelope::{
    Context, FailureClass, InvocationRequest, InvocationResponse, Outcome, RemoteFailure,
};
pub use error::{CarmineError, Result};
pub use server::{
    resolver_fn, start_http_server, Dispatcher, HttpServerHandle, Resolver, ServiceObject,
    ServiceRegistry, TcpServer, TcpServerHandle,
};
pub use transport::{HttpTransport, MemoryTransport, TcpTransport, Transport};
pub use value::{FromValue, IntoValue, TypeTag, Value, ValueType};

// Used by `remote_interface!`; also handy for implementing generated traits.
pub use async_trait::async_trait;
