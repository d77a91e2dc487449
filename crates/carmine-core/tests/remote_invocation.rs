//! End-to-end invocation over every transport.

use carmine_core::server::next_arg;
use carmine_core::{
    resolver_fn, start_http_server, CarmineError, Context, Dispatcher, FailureClass,
    MemoryTransport, RemoteFailure, ServiceObject, Session, TcpServer, TypeTag, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Via {
    Memory,
    Http,
    Tcp,
}

const ALL: [Via; 3] = [Via::Memory, Via::Http, Via::Tcp];

struct Harness {
    session: Session,
    invocations: Arc<AtomicUsize>,
    _server: Option<Box<dyn Send>>,
}

fn probe(user: Value, invocations: Arc<AtomicUsize>) -> ServiceObject {
    ServiceObject::builder("ProbeImpl")
        .method("greet", vec![TypeTag::Str], move |args| {
            invocations.fetch_add(1, Ordering::SeqCst);
            let name: String = next_arg(&mut args.into_iter())?;
            if name.is_empty() {
                Err(RemoteFailure::new("IllegalArgument", "name must not be empty"))
            } else {
                Ok(Value::from(format!("Hello, {}", name)))
            }
        })
        .method("whoami", vec![], move |_| Ok(user.clone()))
        .method("nothing", vec![], |_| Ok(Value::Null))
        .build()
}

/// Serves `test.Probe`; every resolution stamps `version = v<n>` into the
/// context.
fn probe_dispatcher(invocations: Arc<AtomicUsize>) -> Dispatcher {
    let resolutions = AtomicUsize::new(0);
    Dispatcher::new(resolver_fn(move |name: &str, context: &mut Context| {
        if name != "test.Probe" {
            return Err(RemoteFailure::resolution(
                "ClassNotFound",
                format!("{}Impl", name),
            ));
        }
        let n = resolutions.fetch_add(1, Ordering::SeqCst) + 1;
        context.insert("version", format!("v{}", n));
        let user = context.get("user").cloned().unwrap_or(Value::Null);
        Ok(probe(user, invocations.clone()))
    }))
}

async fn harness(via: Via) -> Harness {
    let invocations = Arc::new(AtomicUsize::new(0));
    let dispatcher = probe_dispatcher(invocations.clone());

    let (session, server): (Session, Option<Box<dyn Send>>) = match via {
        Via::Memory => {
            let session = Session::builder("memory://probe")
                .transport(MemoryTransport::new(dispatcher))
                .build()
                .unwrap();
            (session, None)
        }
        Via::Http => {
            let handle = start_http_server(dispatcher, "127.0.0.1", 0, "/carmine")
                .await
                .unwrap();
            let session = Session::new(&handle.endpoint("/carmine")).unwrap();
            (session, Some(Box::new(handle) as Box<dyn Send>))
        }
        Via::Tcp => {
            let handle = TcpServer::start(dispatcher, "127.0.0.1:0").await.unwrap();
            let session = Session::new(&handle.endpoint()).unwrap();
            (session, Some(Box::new(handle) as Box<dyn Send>))
        }
    };

    Harness {
        session,
        invocations,
        _server: server,
    }
}

fn expect_remote(result: carmine_core::Result<Value>) -> RemoteFailure {
    match result {
        Err(CarmineError::Remote(failure)) => failure,
        other => panic!("expected remote failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_call_returns_remote_value() {
    for via in ALL {
        let h = harness(via).await;
        let result = h
            .session
            .stub("test.Probe")
            .invoke("greet", vec![Value::from("Ann")])
            .await
            .unwrap();
        assert_eq!(result, Value::from("Hello, Ann"), "via {:?}", via);
        assert_eq!(h.invocations.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_null_result_is_success() {
    for via in ALL {
        let h = harness(via).await;
        let result = h.session.stub("test.Probe").invoke("nothing", vec![]).await;
        assert_eq!(result.unwrap(), Value::Null, "via {:?}", via);
    }
}

#[tokio::test]
async fn test_target_failure_reraised_with_kind_and_message() {
    for via in ALL {
        let h = harness(via).await;
        let failure = expect_remote(
            h.session
                .stub("test.Probe")
                .invoke("greet", vec![Value::from("")])
                .await,
        );
        assert_eq!(failure.class, FailureClass::Target, "via {:?}", via);
        assert_eq!(failure.kind, "IllegalArgument");
        assert_eq!(failure.message, "name must not be empty");

        // The context is still replaced by the one the failure carried.
        assert_eq!(h.session.property("version"), Some(Value::from("v1")));
    }
}

#[tokio::test]
async fn test_resolution_failure_never_invokes_and_keeps_context() {
    for via in ALL {
        let h = harness(via).await;
        h.session.add_property("user", "ann");
        let before = h.session.properties();

        let failure = expect_remote(
            h.session
                .stub("test.Bogus")
                .invoke("greet", vec![Value::from("Ann")])
                .await,
        );
        assert_eq!(failure.class, FailureClass::Resolution, "via {:?}", via);
        assert_eq!(failure.kind, "ClassNotFound");
        assert_eq!(failure.message, "test.BogusImpl");
        assert_eq!(h.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(h.session.properties(), before);
    }
}

#[tokio::test]
async fn test_context_travels_both_ways() {
    for via in ALL {
        let h = harness(via).await;
        let probe = h.session.stub("test.Probe");
        h.session.add_property("user", "ann");

        let first = probe.invoke("whoami", vec![]).await.unwrap();
        assert_eq!(first, Value::from("ann"), "via {:?}", via);
        assert_eq!(h.session.property("version"), Some(Value::from("v1")));

        probe.invoke("whoami", vec![]).await.unwrap();
        assert_eq!(h.session.property("version"), Some(Value::from("v2")));
        assert_eq!(h.session.property("user"), Some(Value::from("ann")));
    }
}

#[tokio::test]
async fn test_null_argument_is_method_not_found() {
    for via in ALL {
        let h = harness(via).await;
        let failure = expect_remote(
            h.session
                .stub("test.Probe")
                .invoke("greet", vec![Value::Null])
                .await,
        );
        assert_eq!(failure.class, FailureClass::MethodNotFound, "via {:?}", via);
        assert_eq!(failure.message, "test.Probe.greet(null)");
        assert_eq!(h.invocations.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_concurrent_calls_last_response_wins() {
    for via in ALL {
        let h = harness(via).await;
        let probe = h.session.stub("test.Probe");

        let calls = (0..8).map(|_| probe.invoke("whoami", vec![]));
        for result in futures::future::join_all(calls).await {
            result.unwrap();
        }

        let version = h.session.property("version").unwrap();
        let n: usize = version.as_str().unwrap()[1..].parse().unwrap();
        assert!((1..=8).contains(&n), "via {:?}: {}", via, n);
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    for endpoint in [format!("http://{}/carmine", addr), format!("tcp://{}", addr)] {
        let session = Session::new(&endpoint).unwrap();
        session.add_property("user", "ann");
        let before = session.properties();

        let err = session
            .stub("test.Probe")
            .invoke("greet", vec![Value::from("Ann")])
            .await
            .unwrap_err();
        assert!(err.is_transport(), "{}: {:?}", endpoint, err);
        assert!(err.remote_failure().is_none());
        assert_eq!(session.properties(), before);
    }
}
