//! Untyped client stub.

use super::session::Session;
use crate::codec;
use crate::error::{CarmineError, Result};
use crate::envelope::InvocationRequest;
use crate::value::{FromValue, Value};
use bytes::Bytes;
use tracing::debug;

/// Forwards calls on one interface through a [`Session`].
///
/// Typed stubs generated by [`remote_interface!`](crate::remote_interface)
/// wrap one of these.
#[derive(Debug, Clone)]
pub struct ClientStub {
    session: Session,
    interface_name: String,
}

impl ClientStub {
    pub fn new(session: Session, interface_name: impl Into<String>) -> Self {
        Self {
            session,
            interface_name: interface_name.into(),
        }
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Invoke `method_name` remotely.
    ///
    /// A remote failure comes back as [`CarmineError::Remote`] after the
    /// session context was replaced with the returned one. Transport and
    /// decode errors leave the context as it was.
    pub async fn invoke(&self, method_name: &str, arguments: Vec<Value>) -> Result<Value> {
        let request = InvocationRequest::new(
            self.interface_name.as_str(),
            method_name,
            arguments,
            self.session.properties(),
        );
        let frame = codec::encode_request(&request)?;

        debug!(
            "Invoking {}.{} on {}",
            self.interface_name,
            method_name,
            self.session.endpoint()
        );

        let reply = self
            .session
            .transport()
            .exchange(self.session.endpoint(), Bytes::from(frame))
            .await?;
        let response = codec::decode_response(&reply)?;

        let (outcome, context) = response.into_parts();
        self.session.replace_context(context);

        outcome.map_err(|failure| {
            debug!("{}.{} failed remotely: {}", self.interface_name, method_name, failure);
            CarmineError::Remote(failure)
        })
    }

    /// Invoke and convert the result.
    pub async fn invoke_as<T: FromValue>(
        &self,
        method_name: &str,
        arguments: Vec<Value>,
    ) -> Result<T> {
        T::from_value(self.invoke(method_name, arguments).await?)
    }
}
