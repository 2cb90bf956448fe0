use std::{collections::HashSet, sync::Arc};

use orx_model::{BatchReport, Label};
use tracing::{info, instrument, warn};

use crate::{error::OrxError, service::CodeHost};

/// Applies change requests to the code host one after another, in a caller-chosen order.
pub struct IntegrationSequencer {
    host: Arc<dyn CodeHost>,
}

impl IntegrationSequencer {
    pub fn new(host: Arc<dyn CodeHost>) -> Self {
        Self { host }
    }

    /// Merge the artifact of each label in `order`.
    ///
    /// Every label in `order` must have an artifact and appear once; this is checked before the
    /// first merge.
    /// Stops at the first failing merge and does not attempt the remaining ones.
    /// Returns the merged URLs in merge order.
    #[instrument(level = "debug", skip(self, report), fields(artifacts = report.len()))]
    pub async fn apply(
        &self,
        report: &BatchReport,
        order: &[Label],
    ) -> Result<Vec<String>, OrxError> {
        let mut steps = Vec::with_capacity(order.len());
        let mut seen = HashSet::with_capacity(order.len());
        for label in order {
            if !seen.insert(label) {
                return Err(OrxError::IntegrationError {
                    label: label.clone(),
                    cause: "listed twice in merge order".into(),
                });
            }
            let Some(url) = report.get(label) else {
                return Err(OrxError::IntegrationError {
                    label: label.clone(),
                    cause: "no artifact".into(),
                });
            };
            steps.push((label, url));
        }

        for (label, url) in report.iter() {
            if !order.contains(label) {
                warn!(target: "orx.merge", %label, %url, "artifact not in merge order; skipped");
            }
        }

        let mut merged = Vec::with_capacity(steps.len());
        for (step, (label, url)) in steps.into_iter().enumerate() {
            info!(target: "orx.merge", step = step + 1, total = order.len(), %label, %url, "merging");
            self.host
                .merge_change(url)
                .await
                .map_err(|e| OrxError::IntegrationError {
                    label: label.clone(),
                    cause: e.to_string(),
                })?;
            merged.push(url.to_string());
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCodeHost;
    use orx_model::ExtractedResult;

    fn url(n: u32) -> String {
        format!("https://github.com/acme/todo/pull/{n}")
    }

    fn labels(ls: &[&str]) -> Vec<Label> {
        ls.iter().map(|l| l.to_string()).collect()
    }

    #[tokio::test]
    async fn merges_in_given_order_regardless_of_completion_order() {
        let completions = [
            vec!["ui", "js", "docs"],
            vec!["docs", "ui", "js"],
            vec!["js", "docs", "ui"],
        ];
        for completed in completions {
            let results: Vec<ExtractedResult> = completed
                .iter()
                .map(|l| match *l {
                    "ui" => ExtractedResult::new("ui", url(1)),
                    "js" => ExtractedResult::new("js", url(2)),
                    _ => ExtractedResult::new("docs", url(3)),
                })
                .collect();
            let report: BatchReport = results.iter().collect();

            let host = Arc::new(FakeCodeHost::default());
            IntegrationSequencer::new(host.clone())
                .apply(&report, &labels(&["js", "ui", "docs"]))
                .await
                .unwrap();

            assert_eq!(host.merged(), vec![url(2), url(1), url(3)]);
        }
    }

    #[tokio::test]
    async fn stops_after_first_failing_merge() {
        let results = [
            ExtractedResult::new("a", url(1)),
            ExtractedResult::new("b", url(2)),
            ExtractedResult::new("c", url(3)),
        ];
        let report: BatchReport = results.iter().collect();
        let host = Arc::new(FakeCodeHost::default().fail_merge(&url(2)));

        let err = IntegrationSequencer::new(host.clone())
            .apply(&report, &labels(&["a", "b", "c"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrxError::IntegrationError { ref label, ref cause } if label == "b" && cause.contains("merge conflict")
        ));
        assert_eq!(host.merged(), vec![url(1)]);
    }

    #[tokio::test]
    async fn missing_artifact_is_rejected_before_merging() {
        let results = [ExtractedResult::new("a", url(1))];
        let report: BatchReport = results.iter().collect();
        let host = Arc::new(FakeCodeHost::default());

        let err = IntegrationSequencer::new(host.clone())
            .apply(&report, &labels(&["a", "b"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrxError::IntegrationError { ref label, ref cause } if label == "b" && cause == "no artifact"
        ));
        assert!(host.merged().is_empty());
    }

    #[tokio::test]
    async fn repeated_label_is_rejected_before_merging() {
        let results = [
            ExtractedResult::new("a", url(1)),
            ExtractedResult::new("b", url(2)),
        ];
        let report: BatchReport = results.iter().collect();
        let host = Arc::new(FakeCodeHost::default());

        let err = IntegrationSequencer::new(host.clone())
            .apply(&report, &labels(&["a", "b", "a"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrxError::IntegrationError { ref label, ref cause } if label == "a" && cause.contains("twice")
        ));
        assert!(host.merged().is_empty());
    }

    #[tokio::test]
    async fn unordered_artifacts_are_skipped() {
        let results = [
            ExtractedResult::new("a", url(1)),
            ExtractedResult::new("extra", url(9)),
        ];
        let report: BatchReport = results.iter().collect();
        let host = Arc::new(FakeCodeHost::default());

        let merged = IntegrationSequencer::new(host.clone())
            .apply(&report, &labels(&["a"]))
            .await
            .unwrap();

        assert_eq!(merged, vec![url(1)]);
        assert_eq!(host.merged(), vec![url(1)]);
    }
}
