//! Invocation envelopes exchanged across the call boundary.
//!
//! An [`InvocationRequest`] describes one remote call; an
//! [`InvocationResponse`] describes its outcome. Both carry a [`Context`],
//! the string-keyed property map that travels with every call in both
//! directions.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property map shared between a session and the remote side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(BTreeMap<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert an entry, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// One remote call: target interface, method, arguments and a context snapshot.
///
/// Fields are only readable; a request is never changed after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    interface_name: String,
    method_name: String,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    context: Context,
}

impl InvocationRequest {
    /// Create a request. `context` is taken by value, so the request owns its
    /// own copy regardless of what happens to the caller's map afterwards.
    pub fn new(
        interface_name: impl Into<String>,
        method_name: impl Into<String>,
        arguments: Vec<Value>,
        context: Context,
    ) -> Self {
        Self {
            interface_name: interface_name.into(),
            method_name: method_name.into(),
            arguments,
            context,
        }
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Split into `(interface_name, method_name, arguments, context)`.
    pub fn into_parts(self) -> (String, String, Vec<Value>, Context) {
        (
            self.interface_name,
            self.method_name,
            self.arguments,
            self.context,
        )
    }
}

/// Stage of the remote call at which a failure was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The resolution hook could not produce an implementation.
    Resolution,
    /// No method matched the name, arity and argument types.
    MethodNotFound,
    /// The invoked method itself raised.
    Target,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Resolution => write!(f, "resolution"),
            FailureClass::MethodNotFound => write!(f, "method-not-found"),
            FailureClass::Target => write!(f, "target"),
        }
    }
}

/// Serializable description of an error raised on the remote side.
///
/// `kind` identifies the original error (for example `IllegalArgument` or an
/// application error type name); `message` is its display text. Stack traces
/// are not carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteFailure {
    pub class: FailureClass,
    pub kind: String,
    pub message: String,
    /// Optional structured payload attached by the raising side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl RemoteFailure {
    /// A failure raised by an invoked method.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: FailureClass::Target,
            kind: kind.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// A failure raised by the resolution hook.
    pub fn resolution(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, message).with_class(FailureClass::Resolution)
    }

    /// No method on the resolved instance matches the call.
    pub fn method_not_found(interface_name: &str, method_name: &str, arguments: &[Value]) -> Self {
        let signature = arguments
            .iter()
            .map(Value::kind_name)
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            "MethodNotFound",
            format!("{}.{}({})", interface_name, method_name, signature),
        )
        .with_class(FailureClass::MethodNotFound)
    }

    pub fn with_class(mut self, class: FailureClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Outcome of a remote call, tagged explicitly so a successful `Null` result
/// is never mistaken for a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { result: Value },
    Failure { failure: RemoteFailure },
}

/// Outcome of one remote call together with the context after the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    outcome: Outcome,
    #[serde(default)]
    context: Context,
}

impl InvocationResponse {
    /// A successful invocation that produced `result`.
    pub fn success(result: Value, context: Context) -> Self {
        Self {
            outcome: Outcome::Success { result },
            context,
        }
    }

    /// A failed invocation.
    pub fn failed(failure: RemoteFailure, context: Context) -> Self {
        Self {
            outcome: Outcome::Failure { failure },
            context,
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success { result } => Some(result),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&RemoteFailure> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { failure } => Some(failure),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Split into the call outcome and the returned context.
    pub fn into_parts(self) -> (std::result::Result<Value, RemoteFailure>, Context) {
        let outcome = match self.outcome {
            Outcome::Success { result } => Ok(result),
            Outcome::Failure { failure } => Err(failure),
        };
        (outcome, self.context)
    }
}
