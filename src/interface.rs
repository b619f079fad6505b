//! Reshaping of generated interface files.
//!
//! A freshly extracted interface is cleaned up in a fixed order: configured
//! line deletions and the namespace rewrite, then base-interface injection
//! on the declaration line, then the boilerplate region block.

use crate::config::InterfaceConfig;
use crate::edit::{EditError, SaveResult, SpanEdit, TextBuffer};
use crate::recognize::{find_declaration, interface_name, DeclarationKind};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceOutcome {
    NotConfigured,
    Rewritten,
    /// The configured source namespace does not occur in the file
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseOutcome {
    NotConfigured,
    Injected,
    /// Class is on the base-interface exemption list
    Exempt,
    AlreadyInherits,
    /// No `public interface I<Name>` declaration was found
    DeclarationNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteReport {
    pub deleted_lines: bool,
    pub namespace: NamespaceOutcome,
    pub base: BaseOutcome,
    pub region_inserted: bool,
}

impl RewriteReport {
    pub fn changed(&self) -> bool {
        self.deleted_lines
            || self.namespace == NamespaceOutcome::Rewritten
            || self.base == BaseOutcome::Injected
            || self.region_inserted
    }
}

/// Applies an [`InterfaceConfig`] to interface buffers.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceRewriter<'a> {
    config: &'a InterfaceConfig,
    base_exempt: &'a [String],
}

impl<'a> InterfaceRewriter<'a> {
    pub fn new(config: &'a InterfaceConfig, base_exempt: &'a [String]) -> Self {
        Self {
            config,
            base_exempt,
        }
    }

    /// Rewrite `buffer`, the interface extracted from `class_name`.
    pub fn rewrite(
        &self,
        buffer: &mut TextBuffer,
        class_name: &str,
    ) -> Result<RewriteReport, EditError> {
        let rules = self.config.line_rules();
        let transform = rules.apply(buffer)?;

        let namespace = match &self.config.namespace {
            None => NamespaceOutcome::NotConfigured,
            Some(_) if transform.replacements > 0 => NamespaceOutcome::Rewritten,
            Some(_) => NamespaceOutcome::NotFound,
        };

        let base = self.inject_base(buffer, class_name)?;
        let region_inserted = self.insert_region(buffer)?;

        Ok(RewriteReport {
            deleted_lines: transform.deleted_exact || transform.deleted_prefix,
            namespace,
            base,
            region_inserted,
        })
    }

    /// Open, rewrite and save the interface file at `path`.
    pub fn rewrite_file(
        &self,
        path: &Path,
        class_name: &str,
    ) -> Result<(RewriteReport, SaveResult), EditError> {
        let mut buffer = TextBuffer::open(path)?;
        let report = self.rewrite(&mut buffer, class_name)?;
        let saved = buffer.save()?;
        Ok((report, saved))
    }

    fn inject_base(&self, buffer: &mut TextBuffer, class_name: &str) -> Result<BaseOutcome, EditError> {
        let Some(base) = self.config.base.as_deref() else {
            return Ok(BaseOutcome::NotConfigured);
        };
        if self.base_exempt.iter().any(|name| name == class_name) {
            return Ok(BaseOutcome::Exempt);
        }

        let iface = interface_name(class_name);
        let decl = match find_declaration(buffer.text(), DeclarationKind::Interface) {
            Some(decl) if decl.name == iface => decl,
            _ => return Ok(BaseOutcome::DeclarationNotFound),
        };
        let Some(line) = buffer.line(decl.line) else {
            return Ok(BaseOutcome::DeclarationNotFound);
        };

        if line.text.contains(&format!(": {base}")) || line.text.contains(&format!(", {base}")) {
            return Ok(BaseOutcome::AlreadyInherits);
        }

        // Offset just past the interface name on the declaration line
        let name_end = decl.offset + DeclarationKind::Interface.phrase().len() + 1 + decl.name.len();
        let rest = &buffer.text()[name_end..line.end()];
        let edit = match rest.find(|c: char| !c.is_whitespace()) {
            Some(idx) if rest[idx..].starts_with(':') => {
                SpanEdit::insert(name_end + idx + 1, format!(" {base},"))
            }
            _ => SpanEdit::insert(name_end, format!(" : {base}")),
        };

        buffer.apply_batch(vec![edit])?;
        Ok(BaseOutcome::Injected)
    }

    fn insert_region(&self, buffer: &mut TextBuffer) -> Result<bool, EditError> {
        let Some(region) = self.config.region_insertion(buffer.line_ending()) else {
            return Ok(false);
        };
        // Rewriting an interface twice must not stack region blocks
        if buffer.text().contains(region.text.trim()) {
            return Ok(false);
        }
        region.apply(buffer)
    }
}
