//! Server-side request processing.
//!
//! The dispatcher owns no transport. It takes request frames, resolves the
//! target through the configured [`Resolver`], invokes the matching method
//! and produces response frames. The HTTP and TCP servers, as well as the
//! in-memory transport, all feed it.

use super::resolver::Resolver;
use crate::codec;
use crate::envelope::{FailureClass, InvocationRequest, InvocationResponse, RemoteFailure};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, warn};

/// Resolves, invokes and answers invocation requests.
#[derive(Clone)]
pub struct Dispatcher {
    resolver: Arc<dyn Resolver>,
}

impl Dispatcher {
    pub fn new<R: Resolver>(resolver: R) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Process one decoded request.
    ///
    /// Never fails: every problem becomes a failure outcome. On a resolution
    /// failure the response carries the request context exactly as received.
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationResponse {
        let (interface_name, method_name, arguments, received) = request.into_parts();
        debug!(
            "Dispatching {}.{} with {} argument(s)",
            interface_name,
            method_name,
            arguments.len()
        );

        let mut context = received.clone();
        let service = match self.resolver.resolve(&interface_name, &mut context).await {
            Ok(service) => service,
            Err(failure) => {
                warn!("Resolution of {} failed: {}", interface_name, failure);
                return InvocationResponse::failed(
                    failure.with_class(FailureClass::Resolution),
                    received,
                );
            }
        };

        let Some(method) = service.find_method(&method_name, &arguments) else {
            let failure =
                RemoteFailure::method_not_found(&interface_name, &method_name, &arguments);
            warn!(
                "No method on {} matches {}",
                service.type_name(),
                failure.message
            );
            return InvocationResponse::failed(failure, context);
        };

        match method.invoke(arguments).await {
            Ok(result) => InvocationResponse::success(result, context),
            Err(failure) => {
                debug!("{}.{} raised {}", interface_name, method_name, failure);
                InvocationResponse::failed(failure.with_class(FailureClass::Target), context)
            }
        }
    }

    /// Process one request frame and return the response frame.
    ///
    /// Returns `None` when the request cannot be decoded or no response can
    /// be encoded; the caller then sends nothing back.
    pub async fn process_request(&self, frame: &[u8]) -> Option<Vec<u8>> {
        let request = match codec::decode_request(frame) {
            Ok(request) => request,
            Err(e) => {
                error!("Discarding undecodable invocation request: {}", e);
                return None;
            }
        };

        let response = self.dispatch(request).await;
        Self::encode(response)
    }

    /// Read one request frame from `reader` and write the response to `writer`.
    ///
    /// Problems are logged, never returned; on any of them nothing is written.
    pub async fn process_stream<R, W>(&self, reader: &mut R, writer: &mut W)
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let frame = match codec::read_frame(reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Stream closed before a request arrived");
                return;
            }
            Err(e) => {
                error!("Failed to read invocation request: {}", e);
                return;
            }
        };

        let Some(response) = self.process_request(&frame).await else {
            return;
        };

        if let Err(e) = codec::write_frame(writer, &response).await {
            error!("Failed to write invocation response: {}", e);
        }
    }

    /// Encode a response, falling back to a failure outcome when the result
    /// itself cannot be encoded.
    fn encode(response: InvocationResponse) -> Option<Vec<u8>> {
        let err = match codec::encode_response(&response) {
            Ok(bytes) => return Some(bytes),
            Err(e) => e,
        };

        warn!("Invocation result could not be encoded: {}", err);
        let (_, context) = response.into_parts();
        let fallback = InvocationResponse::failed(err.into_failure(), context);
        match codec::encode_response(&fallback) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("Dropping unencodable invocation response: {}", e);
                None
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Context;
    use crate::server::{resolver_fn, ServiceObject, ServiceRegistry};
    use crate::value::{TypeTag, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn greeter() -> ServiceObject {
        ServiceObject::builder("GreeterImpl")
            .method("greet", vec![TypeTag::Str], |args| match args[0].as_str() {
                Some("") => Err(RemoteFailure::new("IllegalArgument", "empty name")),
                Some(name) => Ok(Value::from(format!("Hello, {}", name))),
                None => Ok(Value::Null),
            })
            .method("nothing", vec![], |_| Ok(Value::Null))
            .method("nan", vec![], |_| Ok(Value::Float(f64::NAN)))
            .build()
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ServiceRegistry::new();
        registry.register_instance("demo.Greeter", greeter());
        Dispatcher::new(registry)
    }

    fn request(interface: &str, method: &str, args: Vec<Value>) -> InvocationRequest {
        InvocationRequest::new(interface, method, args, [("k", "v")].into_iter().collect())
    }

    #[tokio::test]
    async fn test_success_carries_result_and_context() {
        let response = dispatcher()
            .dispatch(request("demo.Greeter", "greet", vec![Value::from("Ann")]))
            .await;
        assert_eq!(response.result(), Some(&Value::from("Hello, Ann")));
        assert_eq!(response.context().get("k"), Some(&Value::from("v")));
    }

    #[tokio::test]
    async fn test_null_result_is_success() {
        let response = dispatcher()
            .dispatch(request("demo.Greeter", "nothing", vec![]))
            .await;
        assert!(response.is_successful());
        assert_eq!(response.result(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_target_failure_preserves_kind_and_message() {
        let response = dispatcher()
            .dispatch(request("demo.Greeter", "greet", vec![Value::from("")]))
            .await;
        let failure = response.failure().unwrap();
        assert_eq!(failure.class, FailureClass::Target);
        assert_eq!(failure.kind, "IllegalArgument");
        assert_eq!(failure.message, "empty name");
    }

    #[tokio::test]
    async fn test_null_argument_is_method_not_found() {
        let response = dispatcher()
            .dispatch(request("demo.Greeter", "greet", vec![Value::Null]))
            .await;
        let failure = response.failure().unwrap();
        assert_eq!(failure.class, FailureClass::MethodNotFound);
        assert_eq!(failure.message, "demo.Greeter.greet(null)");
    }

    #[tokio::test]
    async fn test_resolution_failure_skips_invocation_and_keeps_context() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = invoked.clone();
        let dispatcher = Dispatcher::new(resolver_fn(move |name: &str, context: &mut Context| {
            context.insert("touched", true);
            if name == "demo.Greeter" {
                let counter = counter.clone();
                Ok(ServiceObject::builder("Counting")
                    .method("greet", vec![TypeTag::Str], move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Value::Null)
                    })
                    .build())
            } else {
                Err(RemoteFailure::resolution("ClassNotFound", name.to_string()))
            }
        }));

        let response = dispatcher
            .dispatch(request("demo.Bogus", "greet", vec![Value::from("x")]))
            .await;
        let failure = response.failure().unwrap();
        assert_eq!(failure.class, FailureClass::Resolution);
        assert_eq!(failure.kind, "ClassNotFound");
        assert!(!response.context().contains_key("touched"));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);

        let response = dispatcher
            .dispatch(request("demo.Greeter", "greet", vec![Value::from("x")]))
            .await;
        assert!(response.is_successful());
        assert_eq!(response.context().get("touched"), Some(&Value::Bool(true)));
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_request_roundtrip() {
        let greet = request("demo.Greeter", "greet", vec![Value::from("Bo")]);
        let frame = codec::encode_request(&greet).unwrap();
        let reply = dispatcher().process_request(&frame).await.unwrap();
        let response = codec::decode_response(&reply).unwrap();
        assert_eq!(response.result(), Some(&Value::from("Hello, Bo")));
    }

    #[tokio::test]
    async fn test_process_request_garbage_yields_nothing() {
        assert!(dispatcher().process_request(b"\0\0\0\x03abc").await.is_none());
    }

    #[tokio::test]
    async fn test_unencodable_result_becomes_failure() {
        let frame = codec::encode_request(&request("demo.Greeter", "nan", vec![])).unwrap();
        let reply = dispatcher().process_request(&frame).await.unwrap();
        let response = codec::decode_response(&reply).unwrap();
        assert_eq!(response.failure().unwrap().kind, "EncodeError");
        assert_eq!(response.context().get("k"), Some(&Value::from("v")));
    }

    #[tokio::test]
    async fn test_process_stream_writes_one_response() {
        let greet = request("demo.Greeter", "greet", vec![Value::from("Cy")]);
        let frame = codec::encode_request(&greet).unwrap();
        let mut reader = std::io::Cursor::new(frame);
        let mut writer = Vec::new();

        dispatcher().process_stream(&mut reader, &mut writer).await;

        let response = codec::decode_response(&writer).unwrap();
        assert_eq!(response.result(), Some(&Value::from("Hello, Cy")));
    }

    #[tokio::test]
    async fn test_process_stream_empty_input_writes_nothing() {
        let mut reader = std::io::Cursor::new(Vec::new());
        let mut writer = Vec::new();
        dispatcher().process_stream(&mut reader, &mut writer).await;
        assert!(writer.is_empty());
    }
}
