//! Server side: implementation objects, resolution, dispatch and hosting.

mod dispatcher;
mod http;
mod resolver;
mod service;
mod tcp;

pub use dispatcher::Dispatcher;
pub use http::{router, start_http_server, HttpServerHandle};
pub use resolver::{resolver_fn, FnResolver, Resolver, ServiceRegistry};
pub use service::{next_arg, MethodFuture, RemoteMethod, ServiceBuilder, ServiceObject};
pub use tcp::{TcpServer, TcpServerHandle};
