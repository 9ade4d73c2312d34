//! BoxTextProvider -- object-safe dynamic dispatch wrapper for TextProvider.
//!
//! 1. Define an object-safe `TextProviderDyn` trait with boxed futures
//! 2. Blanket-impl `TextProviderDyn` for all `T: TextProvider`
//! 3. `BoxTextProvider` wraps `Box<dyn TextProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use rampart_types::gateway::{GatewayError, GenerationRequest};

use super::provider::TextProvider;

/// Object-safe version of [`TextProvider`] with boxed futures.
///
/// Exists solely to enable dynamic dispatch (`dyn TextProviderDyn`). A
/// blanket implementation is provided for all types implementing
/// `TextProvider`.
pub trait TextProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>>;

    fn probe_boxed(&self) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + '_>>;
}

/// Blanket implementation: any `TextProvider` automatically implements
/// `TextProviderDyn`.
impl<T: TextProvider> TextProviderDyn for T {
    fn name(&self) -> &str {
        TextProvider::name(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }

    fn probe_boxed(&self) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + '_>> {
        Box::pin(self.probe())
    }
}

/// Type-erased text provider for runtime provider selection.
///
/// Since `TextProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxTextProvider` provides equivalent methods that delegate to
/// the inner `TextProviderDyn` trait object.
pub struct BoxTextProvider {
    inner: Box<dyn TextProviderDyn + Send + Sync>,
}

impl BoxTextProvider {
    /// Wrap a concrete `TextProvider` in a type-erased box.
    pub fn new<T: TextProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Generate the draft text for a request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        self.inner.generate_boxed(request).await
    }

    /// Issue the small fixed probe request.
    pub async fn probe(&self) -> Result<String, GatewayError> {
        self.inner.probe_boxed().await
    }
}
