//! Typed remote interfaces.
//!
//! [`remote_interface!`](crate::remote_interface) declares an async trait
//! once and derives both sides from it: a client stub implementing the trait
//! by forwarding every call through a [`ClientStub`], and an export that
//! turns any implementation into a [`ServiceObject`](crate::ServiceObject)
//! for the dispatcher.

use super::stub::ClientStub;

/// A typed stub generated by [`remote_interface!`](crate::remote_interface).
pub trait RemoteInterface: Sized {
    /// Interface name sent in every request.
    const INTERFACE_NAME: &'static str;

    fn from_stub(stub: ClientStub) -> Self;

    fn stub(&self) -> &ClientStub;
}

/// Declare a remote interface.
///
/// ```rust,ignore
/// carmine_core::remote_interface! {
///     /// Greets people.
///     pub trait RemoteTest => RemoteTestStub("carmine.demo.RemoteTest") {
///         fn get_greetings = "getGreetings"(for_name: String) -> String;
///     }
/// }
///
/// // Client side
/// let greeter: RemoteTestStub = session.remote();
/// let text = greeter.get_greetings("Ann".into()).await?;
///
/// // Server side
/// let implementation: Arc<dyn RemoteTest> = Arc::new(RemoteTestImpl);
/// registry.register_instance(RemoteTestStub::INTERFACE_NAME, implementation.into_service());
/// ```
///
/// The string after each method name is the method name on the wire.
/// Parameter types must implement `IntoValue`, `FromValue` and `ValueType`;
/// return types `IntoValue` and `FromValue`. Implementations raise
/// application failures by returning `CarmineError::Remote`.
#[macro_export]
macro_rules! remote_interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident => $stub:ident ($iface:literal) {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident = $wire:literal ( $($arg:ident : $ty:ty),* $(,)? ) -> $ret:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        #[$crate::async_trait]
        $vis trait $name: Send + Sync {
            $(
                $(#[$method_meta])*
                async fn $method(&self, $($arg: $ty),*) -> $crate::Result<$ret>;
            )*
        }

        #[doc = concat!("Client stub for `", $iface, "`.")]
        #[derive(Debug, Clone)]
        $vis struct $stub {
            stub: $crate::ClientStub,
        }

        impl $crate::RemoteInterface for $stub {
            const INTERFACE_NAME: &'static str = $iface;

            fn from_stub(stub: $crate::ClientStub) -> Self {
                Self { stub }
            }

            fn stub(&self) -> &$crate::ClientStub {
                &self.stub
            }
        }

        #[$crate::async_trait]
        impl $name for $stub {
            $(
                async fn $method(&self, $($arg: $ty),*) -> $crate::Result<$ret> {
                    let arguments = vec![$($crate::IntoValue::into_value($arg)?),*];
                    self.stub.invoke_as($wire, arguments).await
                }
            )*
        }

        impl dyn $name {
            /// Expose this implementation to a dispatcher.
            pub fn into_service(self: ::std::sync::Arc<Self>) -> $crate::ServiceObject {
                $crate::ServiceObject::builder(stringify!($name))
                $(
                    .async_method(
                        $wire,
                        vec![$(<$ty as $crate::ValueType>::type_tag()),*],
                        {
                            let target = ::std::sync::Arc::clone(&self);
                            move |args: ::std::vec::Vec<$crate::Value>| {
                                let target = ::std::sync::Arc::clone(&target);
                                async move {
                                    #[allow(unused_mut, unused_variables)]
                                    let mut args = args.into_iter();
                                    $(
                                        let $arg = $crate::server::next_arg::<$ty>(&mut args)?;
                                    )*
                                    let result = target
                                        .$method($($arg),*)
                                        .await
                                        .map_err($crate::CarmineError::into_failure)?;
                                    $crate::IntoValue::into_value(result)
                                        .map_err($crate::CarmineError::into_failure)
                                }
                            }
                        },
                    )
                )*
                .build()
            }
        }
    };
}
