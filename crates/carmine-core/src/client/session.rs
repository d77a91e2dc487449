//! Client sessions.
//!
//! A [`Session`] binds an endpoint, the transport that reaches it, and the
//! property context shared by every call made through it. Sessions are cheap
//! to clone; clones share the same context.
//!
//! # Context semantics
//!
//! Every call sends a snapshot of the context and, when a response arrives,
//! replaces the whole context with the one the response carries. Calls that
//! complete concurrently therefore overwrite each other: the last response to
//! arrive wins. A call that fails at the transport level leaves the context
//! untouched.

use super::interface::RemoteInterface;
use super::stub::ClientStub;
use crate::config::TransportOptions;
use crate::envelope::Context;
use crate::error::{CarmineError, Result};
use crate::transport::{self, Transport};
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use url::Url;

struct SessionInner {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    context: RwLock<Context>,
}

/// Connection settings plus the shared context for remote calls.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session for `endpoint` with default transport options.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::builder(endpoint).build()
    }

    pub fn builder(endpoint: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(endpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Untyped stub for `interface_name`.
    pub fn stub(&self, interface_name: impl Into<String>) -> ClientStub {
        ClientStub::new(self.clone(), interface_name)
    }

    /// Typed stub for an interface declared with
    /// [`remote_interface!`](crate::remote_interface).
    pub fn remote<R: RemoteInterface>(&self) -> R {
        R::from_stub(self.stub(R::INTERFACE_NAME))
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        self.read_context().get(key).cloned()
    }

    /// Set a context property, returning the value it replaced.
    pub fn add_property(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.write_context().insert(key, value)
    }

    pub fn remove_property(&self, key: &str) -> Option<Value> {
        self.write_context().remove(key)
    }

    /// Snapshot of the current context.
    pub fn properties(&self) -> Context {
        self.read_context().clone()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn replace_context(&self, context: Context) {
        *self.write_context() = context;
    }

    fn read_context(&self) -> RwLockReadGuard<'_, Context> {
        self.inner
            .context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_context(&self) -> RwLockWriteGuard<'_, Context> {
        self.inner
            .context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("transport", &self.inner.transport)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Session`].
///
/// # Example
///
/// ```rust,no_run
/// use carmine_core::Session;
/// use std::time::Duration;
///
/// # fn example() -> carmine_core::Result<()> {
/// let session = Session::builder("http://localhost:8080/carmine")
///     .connect_timeout(Duration::from_secs(5))
///     .property("user", "ann")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    endpoint: String,
    options: TransportOptions,
    transport: Option<Arc<dyn Transport>>,
    context: Context,
}

impl SessionBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            options: TransportOptions::default(),
            transport: None,
            context: Context::new(),
        }
    }

    /// Use this transport instead of the one picked from the URL scheme.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = Some(timeout);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    /// Initial context property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key, value);
        self
    }

    pub fn build(self) -> Result<Session> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| CarmineError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => transport::for_endpoint(&endpoint, &self.options)?,
        };

        Ok(Session {
            inner: Arc::new(SessionInner {
                endpoint,
                transport,
                context: RwLock::new(self.context),
            }),
        })
    }
}
