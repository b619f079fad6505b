//! Per-file extraction pipeline and batch driver.
//!
//! Each class file moves through the stages of [`Stage`] in order. Any
//! stage may end the file early, either with a benign [`FileOutcome`]
//! (nothing to do) or a [`FileFailure`]; neither stops the batch.

use crate::config::RunConfig;
use crate::edit::{EditError, TextBuffer};
use crate::host::{BufferHandle, CommandFailure, ExtractHost};
use crate::interface::{InterfaceRewriter, NamespaceOutcome};
use crate::log::LogSink;
use crate::poll::wait_for_stable_file;
use crate::recognize::{classify, interface_name, ClassStatus};
use crate::relocate::relocate;
use crate::summary::RunSummary;
use crate::walk::{walk_project, WalkError};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    OpenClassFile,
    LocateDeclaration,
    CheckAlreadyExtracted,
    InvokeHostExtract,
    LocateGeneratedInterfaceFile,
    ModifyInterface,
    RelocateInterfaceFile,
    CloseFile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::OpenClassFile => "open class file",
            Stage::LocateDeclaration => "locate declaration",
            Stage::CheckAlreadyExtracted => "check already extracted",
            Stage::InvokeHostExtract => "invoke host extract",
            Stage::LocateGeneratedInterfaceFile => "locate generated interface",
            Stage::ModifyInterface => "modify interface",
            Stage::RelocateInterfaceFile => "relocate interface",
            Stage::CloseFile => "close file",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("expected interface file {} did not appear within {waited_ms} ms", path.display())]
    ExpectedOutputMissing { path: PathBuf, waited_ms: u128 },

    #[error("host command failed: {0}")]
    Command(#[from] CommandFailure),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// A file that could not be processed, and where it stopped.
#[derive(Debug)]
pub struct FileFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for FileFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// How a file left the pipeline without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Extracted {
        class_name: String,
        /// Final location of the interface file
        interface_file: PathBuf,
    },
    /// Dry run: the class would have been extracted
    WouldExtract { class_name: String },
    AlreadyExtracted { class_name: String },
    Ignored { class_name: String },
    NoDeclaration,
}

fn fail<E: Into<PipelineError>>(stage: Stage) -> impl FnOnce(E) -> FileFailure {
    move |error| FileFailure {
        stage,
        error: error.into(),
    }
}

/// Everything one batch run needs, passed explicitly instead of living in
/// process-wide state.
pub struct RunContext<'a> {
    root: PathBuf,
    config: &'a RunConfig,
    host: &'a dyn ExtractHost,
    sink: &'a dyn LogSink,
    dry_run: bool,
    /// Serializes host command emission
    command_lock: Mutex<()>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        config: &'a RunConfig,
        host: &'a dyn ExtractHost,
        sink: &'a dyn LogSink,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            host,
            sink,
            dry_run: false,
            command_lock: Mutex::new(()),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn note(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!("{message}");
        self.sink.record(message);
    }

    /// Walk the project and run every candidate file through the pipeline.
    ///
    /// Only a failure to read the project root aborts the run.
    pub fn run(&self) -> Result<RunSummary, WalkError> {
        self.note("**************************************************");
        self.note(format!("start run in {}", self.root.display()));

        let walk = walk_project(&self.root, &self.config.walk.exclude_folders)?;
        let filter = self.config.candidate_filter();

        let mut summary = RunSummary {
            dry_run: self.dry_run,
            ..RunSummary::default()
        };
        for failure in &walk.failures {
            self.note(format!("walk failure: {failure}"));
        }
        summary.unreadable = walk
            .failures
            .iter()
            .filter_map(|failure| match failure {
                WalkError::Subtree { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect();

        for path in filter.filter(&walk.files) {
            let result = self.process_file(path);
            if let Err(failure) = &result {
                tracing::warn!(file = %path.display(), "{failure}");
                self.note(format!("{}: {failure}", path.display()));
            }
            summary.record(path.clone(), result);
        }

        self.note("writing final summary message");
        self.note(summary.to_string());
        Ok(summary)
    }

    /// Run one class file through the pipeline.
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome, FileFailure> {
        self.note(format!("begin process file: {}", path.display()));

        let buffer = TextBuffer::open(path).map_err(fail(Stage::OpenClassFile))?;

        let decl = match classify(buffer.text(), &self.config.classes.ignore) {
            ClassStatus::NotFound => {
                self.note(format!("find no class: {}", path.display()));
                return Ok(FileOutcome::NoDeclaration);
            }
            ClassStatus::Ignored(decl) => {
                self.note(format!("ignored class: {}", decl.name));
                return Ok(FileOutcome::Ignored {
                    class_name: decl.name,
                });
            }
            ClassStatus::AlreadyExtracted(decl) => {
                self.note(format!("already extract interface: {}", decl.name));
                return Ok(FileOutcome::AlreadyExtracted {
                    class_name: decl.name,
                });
            }
            ClassStatus::Candidate(decl) => decl,
        };
        self.note(format!("find class: {}", decl.name));

        let iface = interface_name(&decl.name);
        let interface_path = self.interface_path_for(path, &iface);
        let relocated_path = match (self.relocation_dir(), interface_path.file_name()) {
            (Some(dir), Some(name)) => Some(dir.join(name)),
            _ => None,
        };
        if interface_path.exists() || relocated_path.as_deref().is_some_and(Path::exists) {
            self.note(format!("interface file already exists: {iface}"));
            return Ok(FileOutcome::AlreadyExtracted {
                class_name: decl.name,
            });
        }

        if self.dry_run {
            return Ok(FileOutcome::WouldExtract {
                class_name: decl.name,
            });
        }

        let handle = BufferHandle {
            path,
            class_name: &decl.name,
            interface_name: &iface,
            interface_path: &interface_path,
            declaration_line: decl.line,
        };
        {
            let _guard = self
                .command_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            self.note("invoke extract command: start");
            self.host
                .invoke_refactor_command(&handle)
                .map_err(fail(Stage::InvokeHostExtract))?;
            self.note("invoke extract command: end");
        }

        let waited = wait_for_stable_file(&interface_path, self.config.poll_policy());
        if !waited.is_ready() {
            self.note("interface file not found!");
            return Err(FileFailure {
                stage: Stage::LocateGeneratedInterfaceFile,
                error: PipelineError::ExpectedOutputMissing {
                    path: interface_path,
                    waited_ms: waited.elapsed().as_millis(),
                },
            });
        }

        self.note("interface modification: start");
        let rewriter =
            InterfaceRewriter::new(&self.config.interface, &self.config.classes.base_exempt);
        let (report, _) = rewriter
            .rewrite_file(&interface_path, &decl.name)
            .map_err(fail(Stage::ModifyInterface))?;
        if report.namespace == NamespaceOutcome::NotFound {
            tracing::warn!(interface = %iface, "namespace to rewrite not found");
            self.note(format!("namespace to rewrite not found in {iface}"));
        }
        self.note("interface modification: end");

        let interface_file = match self.relocation_dir() {
            Some(dir) => match relocate(&interface_path, &dir) {
                Ok(relocation) => relocation.destination().to_path_buf(),
                Err(e) => {
                    // Best effort: the interface exists and is rewritten
                    tracing::warn!(interface = %iface, "{e}");
                    self.note(format!("{}: {e}", Stage::RelocateInterfaceFile));
                    interface_path
                }
            },
            None => interface_path,
        };

        drop(buffer);
        self.note(format!("extract interface successfully: {}", decl.name));

        Ok(FileOutcome::Extracted {
            class_name: decl.name,
            interface_file,
        })
    }

    /// Sibling `I<Name>.<ext>` of the class file.
    fn interface_path_for(&self, class_file: &Path, iface: &str) -> PathBuf {
        let ext = class_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&self.config.walk.extension);
        class_file.with_file_name(format!("{iface}.{ext}"))
    }

    fn relocation_dir(&self) -> Option<PathBuf> {
        self.config
            .interface
            .relocate_to
            .as_ref()
            .map(|dir| self.root.join(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;
    use std::cell::RefCell;
    use std::fs;

    /// Writes `public interface I<Name>` next to the class, like the IDE would.
    #[derive(Default)]
    struct StubHost {
        calls: RefCell<Vec<String>>,
    }

    impl ExtractHost for StubHost {
        fn invoke_refactor_command(&self, buffer: &BufferHandle<'_>) -> Result<(), CommandFailure> {
            self.calls.borrow_mut().push(buffer.class_name.to_string());
            fs::write(
                buffer.interface_path,
                format!(
                    "namespace Shop\n{{\n    public interface {}\n    {{\n    }}\n}}\n",
                    buffer.interface_name
                ),
            )
            .unwrap();
            Ok(())
        }
    }

    /// Accepts the command but never produces anything.
    struct SilentHost;

    impl ExtractHost for SilentHost {
        fn invoke_refactor_command(&self, _buffer: &BufferHandle<'_>) -> Result<(), CommandFailure> {
            Ok(())
        }
    }

    fn fast_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.host.poll_interval_ms = 1;
        config.host.timeout_ms = 50;
        config
    }

    #[test]
    fn test_process_candidate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let class_file = temp_dir.path().join("Widget.cs");
        fs::write(&class_file, "namespace Shop\n{\n    public class Widget\n    {\n    }\n}\n").unwrap();

        let config = fast_config();
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink);

        let outcome = ctx.process_file(&class_file).unwrap();
        assert_eq!(
            outcome,
            FileOutcome::Extracted {
                class_name: "Widget".to_string(),
                interface_file: temp_dir.path().join("IWidget.cs"),
            }
        );
        assert_eq!(*host.calls.borrow(), vec!["Widget"]);
        assert!(sink.contains("find class: Widget"));
        assert!(sink.contains("extract interface successfully: Widget"));
    }

    #[test]
    fn test_no_declaration() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("Enums.cs");
        fs::write(&file, "public enum Color { Red }\n").unwrap();

        let config = fast_config();
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink);

        assert_eq!(ctx.process_file(&file).unwrap(), FileOutcome::NoDeclaration);
        assert!(host.calls.borrow().is_empty());
    }

    #[test]
    fn test_already_extracted_skips_host() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("Order.cs");
        fs::write(&file, "public class Order : Entity, IOrder\n{\n}\n").unwrap();

        let config = fast_config();
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink);

        assert_eq!(
            ctx.process_file(&file).unwrap(),
            FileOutcome::AlreadyExtracted {
                class_name: "Order".to_string()
            }
        );
        assert!(host.calls.borrow().is_empty());
    }

    #[test]
    fn test_existing_interface_file_counts_as_extracted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("Order.cs");
        fs::write(&file, "public class Order\n{\n}\n").unwrap();
        fs::write(temp_dir.path().join("IOrder.cs"), "public interface IOrder {}\n").unwrap();

        let config = fast_config();
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink);

        assert!(matches!(
            ctx.process_file(&file).unwrap(),
            FileOutcome::AlreadyExtracted { .. }
        ));
        assert!(host.calls.borrow().is_empty());
    }

    #[test]
    fn test_ignored_class() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("Startup.cs");
        fs::write(&file, "public class Startup\n{\n}\n").unwrap();

        let mut config = fast_config();
        config.classes.ignore = vec!["Startup".to_string()];
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink);

        assert_eq!(
            ctx.process_file(&file).unwrap(),
            FileOutcome::Ignored {
                class_name: "Startup".to_string()
            }
        );
        assert!(host.calls.borrow().is_empty());
    }

    #[test]
    fn test_run_reports_ignored_class_as_having_interface() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("Startup.cs"),
            "public class Startup\n{\n}\n",
        )
        .unwrap();

        let mut config = fast_config();
        config.classes.ignore = vec!["Startup".to_string()];
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink);

        let summary = ctx.run().unwrap();
        assert_eq!(summary.already_extracted, vec!["Startup"]);
        assert!(summary.processed.is_empty());
        assert!(sink.contains("Already has Interface: Startup"));
    }

    #[test]
    fn test_missing_output_is_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("Widget.cs");
        fs::write(&file, "public class Widget\n{\n}\n").unwrap();

        let config = fast_config();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &SilentHost, &sink);

        let failure = ctx.process_file(&file).unwrap_err();
        assert_eq!(failure.stage, Stage::LocateGeneratedInterfaceFile);
        assert!(matches!(
            failure.error,
            PipelineError::ExpectedOutputMissing { .. }
        ));
        assert!(sink.contains("interface file not found!"));
    }

    #[test]
    fn test_host_failure_is_file_scoped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("Widget.cs");
        fs::write(&file, "public class Widget\n{\n}\n").unwrap();

        let config = fast_config();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &crate::host::NoHost, &sink);

        let failure = ctx.process_file(&file).unwrap_err();
        assert_eq!(failure.stage, Stage::InvokeHostExtract);
        assert!(failure.to_string().contains("invoke host extract failed"));
    }

    #[test]
    fn test_dry_run_does_not_invoke_host() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("Widget.cs");
        fs::write(&file, "public class Widget\n{\n}\n").unwrap();

        let config = fast_config();
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink).dry_run(true);

        assert_eq!(
            ctx.process_file(&file).unwrap(),
            FileOutcome::WouldExtract {
                class_name: "Widget".to_string()
            }
        );
        assert!(host.calls.borrow().is_empty());
        assert!(!temp_dir.path().join("IWidget.cs").exists());
    }

    #[test]
    fn test_relocation_and_rewrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let models = temp_dir.path().join("Models");
        fs::create_dir_all(&models).unwrap();
        let file = models.join("Widget.cs");
        fs::write(&file, "public class Widget\n{\n}\n").unwrap();

        let mut config = fast_config();
        config.interface.base = Some("IAdoEntity".to_string());
        config.interface.relocate_to = Some(PathBuf::from("Interfaces"));
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(temp_dir.path(), &config, &host, &sink);

        let outcome = ctx.process_file(&file).unwrap();
        let expected = temp_dir.path().join("Interfaces").join("IWidget.cs");
        assert_eq!(
            outcome,
            FileOutcome::Extracted {
                class_name: "Widget".to_string(),
                interface_file: expected.clone(),
            }
        );
        assert!(!models.join("IWidget.cs").exists());
        let content = fs::read_to_string(expected).unwrap();
        assert!(content.contains("public interface IWidget : IAdoEntity"));
    }

    #[test]
    fn test_run_summarizes_batch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("Widget.cs"), "public class Widget\n{\n}\n").unwrap();
        fs::write(root.join("Order.cs"), "public class Order : IOrder\n{\n}\n").unwrap();
        fs::write(root.join("Readme.md"), "public class NotCode\n").unwrap();
        fs::create_dir_all(root.join("obj")).unwrap();
        fs::write(root.join("obj").join("Gen.cs"), "public class Gen\n").unwrap();

        let config = fast_config();
        let host = StubHost::default();
        let sink = MemorySink::new();
        let ctx = RunContext::new(root, &config, &host, &sink);

        let summary = ctx.run().unwrap();
        assert_eq!(summary.processed, vec!["Widget"]);
        assert_eq!(summary.already_extracted, vec!["Order"]);
        assert!(summary.failed.is_empty());
        assert!(sink.contains("Processed Classes: Widget"));
    }
}
