//! Resolution of interface names to implementation instances.
//!
//! The dispatcher never decides on its own which object serves an interface:
//! every request goes through a [`Resolver`]. The resolver sees the request
//! context mutably, so it can authorize the caller and leave entries behind
//! that travel back to the client with the response.

use super::service::ServiceObject;
use crate::envelope::{Context, RemoteFailure};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Maps an interface name to the instance that will serve a call.
///
/// Called once per request. Returning an error aborts the request before any
/// method is invoked.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync + 'static {
    async fn resolve(
        &self,
        interface_name: &str,
        context: &mut Context,
    ) -> Result<ServiceObject, RemoteFailure>;
}

/// A [`Resolver`] backed by a plain closure. Built with [`resolver_fn`].
#[derive(Clone)]
pub struct FnResolver<F> {
    resolve: F,
}

/// Wrap a synchronous closure as a [`Resolver`].
pub fn resolver_fn<F>(resolve: F) -> FnResolver<F>
where
    F: Fn(&str, &mut Context) -> Result<ServiceObject, RemoteFailure> + Send + Sync + 'static,
{
    FnResolver { resolve }
}

#[async_trait::async_trait]
impl<F> Resolver for FnResolver<F>
where
    F: Fn(&str, &mut Context) -> Result<ServiceObject, RemoteFailure> + Send + Sync + 'static,
{
    async fn resolve(
        &self,
        interface_name: &str,
        context: &mut Context,
    ) -> Result<ServiceObject, RemoteFailure> {
        (self.resolve)(interface_name, context)
    }
}

type Factory = Arc<dyn Fn(&Context) -> Result<ServiceObject, RemoteFailure> + Send + Sync>;

/// Table-driven resolver: one factory per interface name.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    factories: HashMap<String, Factory>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory that builds the instance for every call.
    pub fn register<F>(&mut self, interface_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Context) -> Result<ServiceObject, RemoteFailure> + Send + Sync + 'static,
    {
        self.factories.insert(interface_name.into(), Arc::new(factory));
        self
    }

    /// Register one shared instance served to every call.
    pub fn register_instance(
        &mut self,
        interface_name: impl Into<String>,
        service: ServiceObject,
    ) -> &mut Self {
        self.register(interface_name, move |_| Ok(service.clone()))
    }

    /// Registered interface names, sorted.
    pub fn interfaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("interfaces", &self.interfaces())
            .finish()
    }
}

#[async_trait::async_trait]
impl Resolver for ServiceRegistry {
    async fn resolve(
        &self,
        interface_name: &str,
        context: &mut Context,
    ) -> Result<ServiceObject, RemoteFailure> {
        match self.factories.get(interface_name) {
            Some(factory) => factory(context),
            None => {
                debug!("No implementation registered for {}", interface_name);
                Err(RemoteFailure::resolution(
                    "ImplementationNotFound",
                    format!("no implementation registered for {}", interface_name),
                ))
            }
        }
    }
}
