//! Server-side implementation objects and their method tables.
//!
//! A [`ServiceObject`] is what a resolver hands to the dispatcher: a named
//! set of methods, each declared with a name and parameter types. Overloads
//! (same name, different parameter types) are allowed.
//!
//! # Method matching
//!
//! A call matches a method when the name is equal, the arity is equal, and
//! for every position the *runtime* type of the argument equals the declared
//! parameter type. A null argument has no runtime type and matches nothing,
//! so a call passing null fails with a method-not-found failure even when
//! only one overload could apply.

use crate::envelope::RemoteFailure;
use crate::error::CarmineError;
use crate::value::{FromValue, TypeTag, Value};
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a method handler.
pub type MethodFuture = BoxFuture<'static, Result<Value, RemoteFailure>>;

type Handler = Arc<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>;

/// One invocable method of a [`ServiceObject`].
#[derive(Clone)]
pub struct RemoteMethod {
    name: String,
    params: Vec<TypeTag>,
    handler: Handler,
}

impl RemoteMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    /// True when `arguments` can be passed to this method under the
    /// runtime-type matching policy.
    pub fn accepts(&self, method_name: &str, arguments: &[Value]) -> bool {
        self.name == method_name
            && self.params.len() == arguments.len()
            && self
                .params
                .iter()
                .zip(arguments)
                .all(|(param, arg)| arg.type_tag().as_ref() == Some(param))
    }

    pub fn invoke(&self, arguments: Vec<Value>) -> MethodFuture {
        (self.handler)(arguments)
    }
}

impl fmt::Debug for RemoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(TypeTag::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.name, params)
    }
}

/// A resolved implementation instance, ready to be invoked.
#[derive(Debug, Clone)]
pub struct ServiceObject {
    type_name: String,
    methods: Vec<RemoteMethod>,
}

impl ServiceObject {
    pub fn builder(type_name: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder {
            type_name: type_name.into(),
            methods: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn methods(&self) -> &[RemoteMethod] {
        &self.methods
    }

    /// Find the method matching the call, see the module docs for the policy.
    pub fn find_method(&self, method_name: &str, arguments: &[Value]) -> Option<&RemoteMethod> {
        self.methods
            .iter()
            .find(|method| method.accepts(method_name, arguments))
    }
}

/// Builder for [`ServiceObject`].
///
/// Registering a method whose name and parameter types equal an earlier
/// registration replaces the earlier one.
pub struct ServiceBuilder {
    type_name: String,
    methods: Vec<RemoteMethod>,
}

impl ServiceBuilder {
    /// Register a synchronous method.
    pub fn method<F>(self, name: impl Into<String>, params: Vec<TypeTag>, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, RemoteFailure> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |args| future::ready(handler(args)).boxed());
        self.push(name.into(), params, handler)
    }

    /// Register an asynchronous method.
    pub fn async_method<F, Fut>(
        self,
        name: impl Into<String>,
        params: Vec<TypeTag>,
        handler: F,
    ) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteFailure>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |args| handler(args).boxed());
        self.push(name.into(), params, handler)
    }

    fn push(mut self, name: String, params: Vec<TypeTag>, handler: Handler) -> Self {
        self.methods.retain(|existing| !(existing.name == name && existing.params == params));
        self.methods.push(RemoteMethod {
            name,
            params,
            handler,
        });
        self
    }

    pub fn build(self) -> ServiceObject {
        ServiceObject {
            type_name: self.type_name,
            methods: self.methods,
        }
    }
}

/// Take the next argument of a dispatched call and convert it.
///
/// A conversion failure is reported as a failure of the invoked method.
pub fn next_arg<T: FromValue>(
    arguments: &mut impl Iterator<Item = Value>,
) -> Result<T, RemoteFailure> {
    T::from_value(arguments.next().unwrap_or(Value::Null)).map_err(CarmineError::into_failure)
}
