//! Carmine demo: a greeting interface, its server-side implementation, and a
//! resolver that finds implementations by naming convention.

use carmine_core::{
    async_trait, remote_interface, Context, RemoteFailure, RemoteInterface, Resolver,
    ServiceObject,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

remote_interface! {
    /// Greeting service whose logic lives on the remote side.
    pub trait RemoteTest => RemoteTestStub("carmine.demo.RemoteTest") {
        /// Short greeting message for `for_name`.
        fn get_greetings = "getGreetings"(for_name: String) -> String;
    }
}

/// Server-side implementation of [`RemoteTest`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteTestImpl;

#[async_trait]
impl RemoteTest for RemoteTestImpl {
    async fn get_greetings(&self, for_name: String) -> carmine_core::Result<String> {
        let name = if for_name.is_empty() {
            "unknown"
        } else {
            for_name.as_str()
        };
        Ok(format!("Greetings from the remote server, {}", name))
    }
}

type Factory = Arc<dyn Fn() -> ServiceObject + Send + Sync>;

/// Resolves interface `X` to the implementation registered as `XImpl`.
///
/// A real deployment should check the caller here, for example against a
/// credential carried in the context, before handing out an instance.
#[derive(Clone, Default)]
pub struct ConventionResolver {
    implementations: HashMap<String, Factory>,
}

impl ConventionResolver {
    pub const IMPL_SUFFIX: &'static str = "Impl";

    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under its full type name.
    pub fn with_implementation<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> ServiceObject + Send + Sync + 'static,
    {
        self.implementations.insert(type_name.into(), Arc::new(factory));
        self
    }

    /// Resolver knowing every implementation of this crate.
    pub fn demo() -> Self {
        Self::new().with_implementation(
            format!("{}{}", RemoteTestStub::INTERFACE_NAME, Self::IMPL_SUFFIX),
            || {
                let implementation: Arc<dyn RemoteTest> = Arc::new(RemoteTestImpl);
                implementation.into_service()
            },
        )
    }
}

#[async_trait]
impl Resolver for ConventionResolver {
    async fn resolve(
        &self,
        interface_name: &str,
        _context: &mut Context,
    ) -> Result<ServiceObject, RemoteFailure> {
        let type_name = format!("{}{}", interface_name, Self::IMPL_SUFFIX);
        debug!("Resolving {} to {}", interface_name, type_name);

        self.implementations
            .get(&type_name)
            .map(|factory| factory())
            .ok_or_else(|| RemoteFailure::resolution("ClassNotFound", type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carmine_core::FailureClass;

    #[tokio::test]
    async fn test_greetings() {
        let greeter = RemoteTestImpl;
        assert_eq!(
            greeter.get_greetings("Ann".into()).await.unwrap(),
            "Greetings from the remote server, Ann"
        );
        assert_eq!(
            greeter.get_greetings(String::new()).await.unwrap(),
            "Greetings from the remote server, unknown"
        );
    }

    #[tokio::test]
    async fn test_convention_appends_impl_suffix() {
        let resolver = ConventionResolver::demo();
        let mut context = Context::new();

        let service = resolver
            .resolve("carmine.demo.RemoteTest", &mut context)
            .await
            .unwrap();
        assert_eq!(service.methods()[0].name(), "getGreetings");

        let failure = resolver.resolve("Bogus", &mut context).await.unwrap_err();
        assert_eq!(failure.class, FailureClass::Resolution);
        assert_eq!(failure.kind, "ClassNotFound");
        assert_eq!(failure.message, "BogusImpl");
    }
}
