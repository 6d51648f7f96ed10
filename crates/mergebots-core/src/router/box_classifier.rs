//! BoxClassifier -- object-safe dynamic dispatch wrapper for Classifier.
//!
//! 1. `ClassifierDyn` is the object-safe form with a boxed future
//! 2. Blanket impl of `ClassifierDyn` for every `T: Classifier`
//! 3. `BoxClassifier` wraps `Arc<dyn ClassifierDyn>` and delegates

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::classifier::{Candidate, Classifier};

/// Object-safe version of [`Classifier`] with a boxed future.
pub trait ClassifierDyn: Send + Sync {
    fn choose_boxed<'a>(
        &'a self,
        conversation: &'a str,
        candidates: &'a [Candidate],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

impl<T: Classifier> ClassifierDyn for T {
    fn choose_boxed<'a>(
        &'a self,
        conversation: &'a str,
        candidates: &'a [Candidate],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.choose(conversation, candidates))
    }
}

/// Type-erased classifier, cheap to clone into handler streams.
#[derive(Clone)]
pub struct BoxClassifier {
    inner: Arc<dyn ClassifierDyn>,
}

impl BoxClassifier {
    pub fn new<T: Classifier + 'static>(classifier: T) -> Self {
        Self {
            inner: Arc::new(classifier),
        }
    }

    pub async fn choose(
        &self,
        conversation: &str,
        candidates: &[Candidate],
    ) -> anyhow::Result<String> {
        self.inner.choose_boxed(conversation, candidates).await
    }
}

impl std::fmt::Debug for BoxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxClassifier").finish_non_exhaustive()
    }
}
