//! Extraction fallback chain
//!
//! Runs the ordered strategies for a format until one produces non-trivial
//! text. Each attempt runs on a blocking thread under a timeout; no single
//! strategy failure (error, panic, timeout, or empty output) aborts the
//! chain. When everything fails, the typed attempt errors are classified
//! into one aggregate error and the raw details go to the logs only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ExtractionError, FailedAttempt, StrategyError};
use super::format::FileFormat;
use super::strategies::{chain_for, ExtractionStrategy};
use super::types::ExtractionResult;

/// Multi-strategy extraction engine shared by the single-shot and chunked
/// upload paths.
pub struct ExtractionPipeline {
    timeout: Duration,
    chains: HashMap<FileFormat, Vec<Arc<dyn ExtractionStrategy>>>,
}

impl ExtractionPipeline {
    pub fn new(timeout: Duration) -> Self {
        let mut chains = HashMap::new();
        for format in [FileFormat::PlainText, FileFormat::Pdf, FileFormat::Ooxml] {
            chains.insert(format, chain_for(format));
        }
        Self { timeout, chains }
    }

    /// Replace the chain for one format. Used by tests to inject stub
    /// strategies; production code keeps the defaults.
    pub fn with_chain(
        mut self,
        format: FileFormat,
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
    ) -> Self {
        self.chains.insert(format, strategies);
        self
    }

    /// Run the fallback chain for `format` over `data`.
    pub async fn extract(
        &self,
        data: Vec<u8>,
        format: FileFormat,
    ) -> Result<ExtractionResult, ExtractionError> {
        let strategies = match self.chains.get(&format) {
            Some(chain) if !chain.is_empty() => chain,
            _ => {
                return Err(ExtractionError::InvalidFormat(format!(
                    "no extraction strategies for '{}'",
                    format
                )))
            }
        };

        let data = Arc::new(data);
        let mut attempts: Vec<FailedAttempt> = Vec::new();

        for strategy in strategies {
            let name = strategy.name();
            let task_data = Arc::clone(&data);
            let task_strategy = Arc::clone(strategy);

            let outcome = tokio::time::timeout(
                self.timeout,
                tokio::task::spawn_blocking(move || task_strategy.extract(&task_data)),
            )
            .await;

            let error = match outcome {
                // Timed out: stop waiting; the blocking task itself cannot
                // be cancelled and is left to finish on its thread.
                Err(_) => StrategyError::Unknown(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )),
                // The strategy panicked; the task boundary contains it.
                Ok(Err(join_err)) => {
                    StrategyError::Unknown(format!("extraction task failed: {}", join_err))
                }
                Ok(Ok(Ok(result))) => {
                    if result.text.trim().is_empty() {
                        StrategyError::Empty
                    } else {
                        tracing::debug!(
                            strategy = name,
                            format = %format,
                            text_length = result.text.len(),
                            pages = result.page_count,
                            "Extraction strategy succeeded"
                        );
                        return Ok(result);
                    }
                }
                Ok(Ok(Err(e))) => e,
            };

            tracing::debug!(strategy = name, format = %format, error = %error, "Extraction strategy failed");
            attempts.push(FailedAttempt {
                strategy: name,
                error,
            });
        }

        let detail: Vec<String> = attempts
            .iter()
            .map(|a| format!("{}: {}", a.strategy, a.error))
            .collect();
        tracing::warn!(
            format = %format,
            attempts = detail.join("; "),
            "All extraction strategies failed"
        );
        Err(ExtractionError::classify(&attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedText(&'static str, &'static str);

    impl ExtractionStrategy for FixedText {
        fn name(&self) -> &'static str {
            self.0
        }

        fn extract(&self, _data: &[u8]) -> Result<ExtractionResult, StrategyError> {
            Ok(ExtractionResult {
                text: self.1.to_string(),
                formatted: None,
                page_count: 1,
                strategy: self.0,
                layout_preserved: true,
            })
        }
    }

    struct FixedFailure(&'static str, fn() -> StrategyError);

    impl ExtractionStrategy for FixedFailure {
        fn name(&self) -> &'static str {
            self.0
        }

        fn extract(&self, _data: &[u8]) -> Result<ExtractionResult, StrategyError> {
            Err((self.1)())
        }
    }

    struct Panicking;

    impl ExtractionStrategy for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn extract(&self, _data: &[u8]) -> Result<ExtractionResult, StrategyError> {
            panic!("strategy blew up");
        }
    }

    struct Slow;

    impl ExtractionStrategy for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn extract(&self, _data: &[u8]) -> Result<ExtractionResult, StrategyError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(ExtractionResult {
                text: "too late".to_string(),
                formatted: None,
                page_count: 1,
                strategy: "slow",
                layout_preserved: true,
            })
        }
    }

    fn pipeline_with(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> ExtractionPipeline {
        ExtractionPipeline::new(Duration::from_secs(5))
            .with_chain(FileFormat::PlainText, strategies)
    }

    #[tokio::test]
    async fn first_success_wins_and_later_strategies_do_not_run() {
        let pipeline = pipeline_with(vec![
            Arc::new(FixedText("a", "from a")),
            Arc::new(FixedText("b", "from b")),
        ]);
        let result = pipeline
            .extract(b"x".to_vec(), FileFormat::PlainText)
            .await
            .unwrap();
        assert_eq!(result.text, "from a");
        assert_eq!(result.strategy, "a");
    }

    #[tokio::test]
    async fn failure_falls_through_to_next_strategy() {
        let pipeline = pipeline_with(vec![
            Arc::new(FixedFailure("a", || {
                StrategyError::Corrupted("broken".into())
            })),
            Arc::new(FixedText("b", "recovered")),
        ]);
        let result = pipeline
            .extract(b"x".to_vec(), FileFormat::PlainText)
            .await
            .unwrap();
        assert_eq!(result.text, "recovered");
        assert_eq!(result.strategy, "b");
    }

    #[tokio::test]
    async fn empty_output_counts_as_failure() {
        let pipeline = pipeline_with(vec![
            Arc::new(FixedText("a", "   \n ")),
            Arc::new(FixedText("b", "real text")),
        ]);
        let result = pipeline
            .extract(b"x".to_vec(), FileFormat::PlainText)
            .await
            .unwrap();
        assert_eq!(result.strategy, "b");
    }

    #[tokio::test]
    async fn all_password_failures_classify_as_password_protected() {
        let pipeline = pipeline_with(vec![
            Arc::new(FixedFailure("a", || {
                StrategyError::Unknown("engine gave up".into())
            })),
            Arc::new(FixedFailure("b", || {
                StrategyError::PasswordProtected("encrypted".into())
            })),
        ]);
        let err = pipeline
            .extract(b"x".to_vec(), FileFormat::PlainText)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::PasswordProtected));
    }

    #[tokio::test]
    async fn panic_is_contained_and_chain_continues() {
        let pipeline = pipeline_with(vec![
            Arc::new(Panicking),
            Arc::new(FixedText("b", "still here")),
        ]);
        let result = pipeline
            .extract(b"x".to_vec(), FileFormat::PlainText)
            .await
            .unwrap();
        assert_eq!(result.text, "still here");
    }

    #[tokio::test]
    async fn timeout_moves_on_to_next_strategy() {
        let pipeline = ExtractionPipeline::new(Duration::from_millis(50))
            .with_chain(
                FileFormat::PlainText,
                vec![Arc::new(Slow), Arc::new(FixedText("b", "fast enough"))],
            );
        let result = pipeline
            .extract(b"x".to_vec(), FileFormat::PlainText)
            .await
            .unwrap();
        assert_eq!(result.text, "fast enough");
    }

    #[tokio::test]
    async fn unknown_format_is_rejected_before_any_strategy() {
        let pipeline = ExtractionPipeline::new(Duration::from_secs(5));
        let err = pipeline
            .extract(b"x".to_vec(), FileFormat::Unrecognized)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn default_chains_handle_real_samples() {
        let pipeline = ExtractionPipeline::new(Duration::from_secs(30));

        let text = pipeline
            .extract(b"plain words".to_vec(), FileFormat::PlainText)
            .await
            .unwrap();
        assert_eq!(text.text, "plain words");

        let pdf = super::super::strategies::pdf::tests::sample_pdf("Chained up");
        let result = pipeline.extract(pdf, FileFormat::Pdf).await.unwrap();
        assert!(result.text.contains("Chained up"));

        // Bare zip with only the document part; some tier of the OOXML
        // chain must pull the body text out of it.
        let docx = super::super::strategies::ooxml::tests::sample_docx(
            r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>Fallback body</w:t></w:r></w:p></w:body></w:document>"#,
        );
        let result = pipeline.extract(docx, FileFormat::Ooxml).await.unwrap();
        assert!(result.text.contains("Fallback body"));
    }
}
