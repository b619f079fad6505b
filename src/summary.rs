use crate::pipeline::{FileFailure, FileOutcome, Stage};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Aggregate of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Classes whose interface was extracted (or would be, in a dry run)
    pub processed: Vec<String>,
    /// Classes that already implement their interface, or are ignored
    pub already_extracted: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
    /// Subtrees the walker could not read
    pub unreadable: Vec<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub stage: Stage,
    pub reason: String,
}

impl RunSummary {
    pub fn record(&mut self, path: PathBuf, result: Result<FileOutcome, FileFailure>) {
        match result {
            Ok(FileOutcome::Extracted { class_name, .. })
            | Ok(FileOutcome::WouldExtract { class_name }) => self.processed.push(class_name),
            Ok(FileOutcome::AlreadyExtracted { class_name }) => {
                self.already_extracted.push(class_name)
            }
            Ok(FileOutcome::Ignored { class_name }) => {
                self.skipped.push(SkippedFile {
                    path,
                    reason: format!("class {class_name} is on the ignore list"),
                });
                self.already_extracted.push(class_name);
            }
            Ok(FileOutcome::NoDeclaration) => self.skipped.push(SkippedFile {
                path,
                reason: "no public class declaration".to_string(),
            }),
            Err(failure) => self.failed.push(FailedFile {
                path,
                stage: failure.stage,
                reason: failure.error.to_string(),
            }),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.unreadable.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed Classes: {}", self.processed.join(","))?;
        write!(f, "Already has Interface: {}", self.already_extracted.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineError;

    #[test]
    fn test_summary_message() {
        let mut summary = RunSummary::default();
        summary.record(
            PathBuf::from("Widget.cs"),
            Ok(FileOutcome::Extracted {
                class_name: "Widget".to_string(),
                interface_file: PathBuf::from("IWidget.cs"),
            }),
        );
        summary.record(
            PathBuf::from("Order.cs"),
            Ok(FileOutcome::Extracted {
                class_name: "Order".to_string(),
                interface_file: PathBuf::from("IOrder.cs"),
            }),
        );
        summary.record(
            PathBuf::from("Customer.cs"),
            Ok(FileOutcome::AlreadyExtracted {
                class_name: "Customer".to_string(),
            }),
        );

        assert_eq!(
            summary.to_string(),
            "Processed Classes: Widget,Order\nAlready has Interface: Customer"
        );
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_failures_and_skips_are_kept_apart() {
        let mut summary = RunSummary::default();
        summary.record(PathBuf::from("Enums.cs"), Ok(FileOutcome::NoDeclaration));
        summary.record(
            PathBuf::from("Widget.cs"),
            Err(FileFailure {
                stage: Stage::LocateGeneratedInterfaceFile,
                error: PipelineError::ExpectedOutputMissing {
                    path: PathBuf::from("IWidget.cs"),
                    waited_ms: 100,
                },
            }),
        );

        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].stage, Stage::LocateGeneratedInterfaceFile);
        assert!(summary.has_failures());
        assert_eq!(
            summary.to_string(),
            "Processed Classes: \nAlready has Interface: "
        );
    }

    #[test]
    fn test_ignored_class_reported_as_having_interface() {
        let mut summary = RunSummary::default();
        summary.record(
            PathBuf::from("Startup.cs"),
            Ok(FileOutcome::Ignored {
                class_name: "Startup".to_string(),
            }),
        );

        assert_eq!(summary.already_extracted, vec!["Startup"]);
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.skipped[0].reason.contains("ignore list"));
        assert_eq!(
            summary.to_string(),
            "Processed Classes: \nAlready has Interface: Startup"
        );
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_summary_serializes() {
        let mut summary = RunSummary::default();
        summary.record(
            PathBuf::from("Widget.cs"),
            Ok(FileOutcome::WouldExtract {
                class_name: "Widget".to_string(),
            }),
        );
        summary.dry_run = true;

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["processed"][0], "Widget");
        assert_eq!(json["dry_run"], true);
    }
}
