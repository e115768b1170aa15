//! Scripted verdicts for any `Judge`

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use veritas_domain::{Judge, ServiceError};

type Script<I, V> = dyn Fn(&I) -> Result<V, ServiceError> + Send + Sync;

/// Judge whose verdicts come from a closure
///
/// # Examples
///
/// ```
/// use veritas_domain::{Judge, Relevance, RelevanceQuery};
/// use veritas_llm::ScriptedJudge;
///
/// # async fn demo() {
/// let judge = ScriptedJudge::new(|q: &RelevanceQuery| {
///     Ok(if q.body.contains("plastic") { Relevance::Relevant } else { Relevance::Irrelevant })
/// });
/// let query = RelevanceQuery { claim: "c".into(), title: "t".into(), body: "plastic bags".into() };
/// assert_eq!(judge.judge(&query).await.unwrap(), Relevance::Relevant);
/// assert_eq!(judge.calls(), 1);
/// # }
/// ```
pub struct ScriptedJudge<I: ?Sized, V> {
    script: Arc<Script<I, V>>,
    calls: Arc<AtomicUsize>,
}

impl<I: ?Sized, V> ScriptedJudge<I, V> {
    /// Judge that answers with `script(input)`
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&I) -> Result<V, ServiceError> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Judge that always answers `verdict`
    pub fn always(verdict: V) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        Self::new(move |_| Ok(verdict.clone()))
    }

    /// Judge that always fails with `error`
    pub fn failing(error: ServiceError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Number of judgements made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<I: ?Sized, V> Clone for ScriptedJudge<I, V> {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<I: ?Sized, V> fmt::Debug for ScriptedJudge<I, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedJudge")
            .field("calls", &self.calls())
            .finish()
    }
}

#[async_trait]
impl<I, V> Judge<I> for ScriptedJudge<I, V>
where
    I: ?Sized + Sync + 'static,
    V: Send + 'static,
{
    type Verdict = V;

    async fn judge(&self, input: &I) -> Result<V, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_domain::{AliasGroup, Relevance, RelevanceQuery};

    fn query(body: &str) -> RelevanceQuery {
        RelevanceQuery {
            claim: "claim".into(),
            title: "title".into(),
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn test_always() {
        let judge = ScriptedJudge::always(Relevance::Irrelevant);
        assert_eq!(judge.judge(&query("x")).await.unwrap(), Relevance::Irrelevant);
        assert_eq!(judge.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing() {
        let judge: ScriptedJudge<RelevanceQuery, Relevance> =
            ScriptedJudge::failing(ServiceError::Timeout("slow".into()));
        assert_eq!(
            judge.judge(&query("x")).await,
            Err(ServiceError::Timeout("slow".into()))
        );
    }

    #[tokio::test]
    async fn test_unsized_input() {
        let judge = ScriptedJudge::new(|names: &[String]| {
            Ok(names.iter().map(AliasGroup::identity).collect::<Vec<_>>())
        });
        let names = vec!["Paris".to_string(), "France".to_string()];
        let groups = judge.judge(names.as_slice()).await.unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_call_count() {
        let judge = ScriptedJudge::always(Relevance::Relevant);
        let other = judge.clone();
        other.judge(&query("x")).await.unwrap();
        assert_eq!(judge.calls(), 1);
    }
}
