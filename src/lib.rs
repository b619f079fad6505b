//! Extract Interface Bulk: batch interface extraction for C# class files
//!
//! Walks a project tree, finds `public class` declarations that do not yet
//! implement their `I<Name>` interface, asks an external host to run its
//! "extract interface" refactoring, and then reshapes the generated
//! interface files with plain line-oriented text rules.
//!
//! # Architecture
//!
//! All text changes compile down to a single primitive: [`SpanEdit`], a
//! byte-span replacement applied in batches to a [`TextBuffer`]. The line
//! transforms in [`transform`] only decide *where* spans go.
//!
//! The host is an [`ExtractHost`]; its output is awaited by polling the
//! filesystem with a bounded [`PollPolicy`] rather than sleeping.
//!
//! # Safety
//!
//! - Atomic file writes (tempfile + fsync + rename)
//! - Files changed on disk since they were read are never overwritten
//! - UTF-8 validation
//! - Idempotent rewrites
//!
//! # Example
//!
//! ```no_run
//! use extract_interface_bulk::{HourlyFileSink, NoHost, RunConfig, RunContext};
//!
//! let config = RunConfig::default();
//! let sink = HourlyFileSink::new(HourlyFileSink::default_dir());
//! let summary = RunContext::new("MyProject", &config, &NoHost, &sink)
//!     .dry_run(true)
//!     .run()?;
//! println!("{summary}");
//! # Ok::<(), extract_interface_bulk::WalkError>(())
//! ```

pub mod config;
pub mod edit;
pub mod host;
pub mod interface;
pub mod log;
pub mod pipeline;
pub mod poll;
pub mod recognize;
pub mod relocate;
pub mod summary;
pub mod transform;
pub mod walk;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, RunConfig};
pub use edit::{EditError, SaveResult, SpanEdit, TextBuffer};
pub use host::{BufferHandle, CommandFailure, CommandHost, ExtractHost, NoHost};
pub use interface::{BaseOutcome, InterfaceRewriter, NamespaceOutcome, RewriteReport};
pub use log::{HourlyFileSink, LogSink, MemorySink};
pub use pipeline::{FileFailure, FileOutcome, PipelineError, RunContext, Stage};
pub use poll::{wait_for_stable_file, wait_until, PollPolicy, WaitOutcome};
pub use recognize::{classify, find_declaration, ClassStatus, Declaration, DeclarationKind};
pub use relocate::{relocate, RelocateError, Relocation};
pub use summary::RunSummary;
pub use transform::{
    delete_exact_lines, delete_lines_by_prefix, insert_after_anchor_line,
    insert_before_anchor_line, replace_first_occurrence_per_line, Insertion, Placement,
    Replacement, RuleSet, TransformReport,
};
pub use walk::{walk_project, CandidateFilter, Walk, WalkError};
