use std::future::Future;
use std::time::Instant;

use aceload_core::AppResult;
use tracing::{debug, info, warn};

/// Nesting context for timed log lines.
///
/// Each timed step hands a nested scope to its body, so log lines are
/// indented by how deep in the load or teardown they were emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogScope {
    depth: usize,
}

impl LogScope {
    /// Returns the outermost scope.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the scope one level deeper.
    #[must_use]
    pub fn nested(self) -> Self {
        Self {
            depth: self.depth.saturating_add(1),
        }
    }

    /// Returns the message indentation for this depth.
    #[must_use]
    pub fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }

    /// Times a phase, reporting completion at info level.
    pub async fn timed<T, F, Fut>(self, message: &str, work: F) -> AppResult<T>
    where
        F: FnOnce(LogScope) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.run_timed(message, false, work).await
    }

    /// Times a detailed step, reporting completion at debug level.
    pub async fn timed_detail<T, F, Fut>(self, message: &str, work: F) -> AppResult<T>
    where
        F: FnOnce(LogScope) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.run_timed(message, true, work).await
    }

    async fn run_timed<T, F, Fut>(self, message: &str, detail: bool, work: F) -> AppResult<T>
    where
        F: FnOnce(LogScope) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let scope = self.nested();
        let indent = scope.indent();
        debug!(depth = scope.depth, "{indent}{message} ... starting");

        let started = Instant::now();
        let result = work(scope).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) if detail => {
                debug!(depth = scope.depth, ?elapsed, "{indent}{message} ... done ({elapsed:?})");
            }
            Ok(_) => {
                info!(depth = scope.depth, ?elapsed, "{indent}{message} ... done ({elapsed:?})");
            }
            Err(error) => {
                warn!(
                    depth = scope.depth,
                    ?elapsed,
                    error = %error,
                    "{indent}{message} ... failed ({elapsed:?})"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use aceload_core::AppError;

    use super::LogScope;

    #[tokio::test]
    async fn timed_bodies_receive_a_nested_scope() {
        let depth = LogScope::root()
            .timed("outer", |outer| async move {
                outer
                    .timed_detail("inner", |inner| async move { Ok(inner.depth()) })
                    .await
            })
            .await;

        assert_eq!(depth.ok(), Some(2));
    }

    #[tokio::test]
    async fn timed_propagates_failures() {
        let result: Result<(), _> = LogScope::root()
            .timed("failing", |_| async {
                Err(AppError::Internal("boom".to_owned()))
            })
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn indentation_follows_depth() {
        assert_eq!(LogScope::root().nested().nested().indent(), "    ");
    }
}
