//! Regex-based class and interface declaration detection.
//!
//! Recognition is intentionally shallow: the first `public class <Name>` or
//! `public interface <Name>` in a file wins, where `<Name>` is the run of
//! non-whitespace characters after the keyword phrase. Generic parameters,
//! nested or non-public declarations are not understood.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Class,
    Interface,
}

impl DeclarationKind {
    /// The keyword phrase that introduces this kind of declaration.
    pub fn phrase(self) -> &'static str {
        match self {
            DeclarationKind::Class => "public class",
            DeclarationKind::Interface => "public interface",
        }
    }

    fn regex(self) -> &'static Regex {
        static CLASS: OnceLock<Regex> = OnceLock::new();
        static INTERFACE: OnceLock<Regex> = OnceLock::new();

        let (cell, pattern) = match self {
            DeclarationKind::Class => (&CLASS, r"public class (\S+)"),
            DeclarationKind::Interface => (&INTERFACE, r"public interface (\S+)"),
        };
        cell.get_or_init(|| Regex::new(pattern).expect("declaration pattern is valid"))
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationKind::Class => write!(f, "class"),
            DeclarationKind::Interface => write!(f, "interface"),
        }
    }
}

/// A recognized declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Byte offset of the keyword phrase
    pub offset: usize,
    /// Zero-based line of the keyword phrase
    pub line: usize,
}

/// Find the first declaration of `kind` in `text`.
pub fn find_declaration(text: &str, kind: DeclarationKind) -> Option<Declaration> {
    let captures = kind.regex().captures(text)?;
    let whole = captures.get(0)?;
    let name = captures.get(1)?;

    Some(Declaration {
        kind,
        name: name.as_str().to_string(),
        offset: whole.start(),
        line: text[..whole.start()].matches('\n').count(),
    })
}

/// Name of the interface generated for `class_name`.
pub fn interface_name(class_name: &str) -> String {
    format!("I{class_name}")
}

/// Whether `text` already declares `class_name` as implementing its
/// extracted interface (`": I<Name>"` or `", I<Name>"`).
pub fn has_interface_marker(text: &str, class_name: &str) -> bool {
    let iface = interface_name(class_name);
    text.contains(&format!(": {iface}")) || text.contains(&format!(", {iface}"))
}

/// What the pipeline should do with a class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassStatus {
    /// No `public class` declaration
    NotFound,
    /// Class is on the ignore list
    Ignored(Declaration),
    /// Class already implements its interface
    AlreadyExtracted(Declaration),
    /// Class is ready for extraction
    Candidate(Declaration),
}

impl ClassStatus {
    pub fn declaration(&self) -> Option<&Declaration> {
        match self {
            ClassStatus::NotFound => None,
            ClassStatus::Ignored(decl)
            | ClassStatus::AlreadyExtracted(decl)
            | ClassStatus::Candidate(decl) => Some(decl),
        }
    }
}

/// Classify a class file's text against an ignore list.
pub fn classify<S: AsRef<str>>(text: &str, ignore: &[S]) -> ClassStatus {
    let Some(decl) = find_declaration(text, DeclarationKind::Class) else {
        return ClassStatus::NotFound;
    };

    if ignore.iter().any(|name| name.as_ref() == decl.name) {
        ClassStatus::Ignored(decl)
    } else if has_interface_marker(text, &decl.name) {
        ClassStatus::AlreadyExtracted(decl)
    } else {
        ClassStatus::Candidate(decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_IGNORE: &[&str] = &[];

    #[test]
    fn test_class_name_stops_at_whitespace() {
        let decl = find_declaration("public class Foo : Bar", DeclarationKind::Class).unwrap();
        assert_eq!(decl.name, "Foo");
        assert_eq!(decl.offset, 0);
        assert_eq!(decl.line, 0);
    }

    #[test]
    fn test_no_class_phrase() {
        assert!(find_declaration("internal class Foo", DeclarationKind::Class).is_none());
        assert!(find_declaration("Public Class Foo", DeclarationKind::Class).is_none());
        assert!(find_declaration("", DeclarationKind::Class).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let text = "using System;\n\nnamespace A\n{\n    public class First\n    public class Second\n";
        let decl = find_declaration(text, DeclarationKind::Class).unwrap();
        assert_eq!(decl.name, "First");
        assert_eq!(decl.line, 4);
        assert_eq!(&text[decl.offset..decl.offset + 12], "public class");
    }

    #[test]
    fn test_generic_parameters_are_part_of_token() {
        let decl = find_declaration("public class Repo<T> where T : new()", DeclarationKind::Class)
            .unwrap();
        assert_eq!(decl.name, "Repo<T>");
    }

    #[test]
    fn test_interface_declaration() {
        let text = "namespace A\n{\n    public interface IWidget\n    {\n";
        let decl = find_declaration(text, DeclarationKind::Interface).unwrap();
        assert_eq!(decl.name, "IWidget");
        assert_eq!(decl.kind, DeclarationKind::Interface);
        assert_eq!(decl.line, 2);
    }

    #[test]
    fn test_interface_marker_detection() {
        assert!(has_interface_marker("public class Foo, IFoo", "Foo"));
        assert!(has_interface_marker("public class Foo : IFoo", "Foo"));
        assert!(!has_interface_marker("public class Foo : Bar", "Foo"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("namespace A {}", NO_IGNORE), ClassStatus::NotFound);

        let status = classify("public class Foo, IFoo", NO_IGNORE);
        assert!(matches!(status, ClassStatus::AlreadyExtracted(ref d) if d.name == "Foo"));

        let status = classify("public class Foo : Bar", &["Foo"]);
        assert!(matches!(status, ClassStatus::Ignored(ref d) if d.name == "Foo"));

        let status = classify("public class Widget\n{\n}\n", NO_IGNORE);
        assert!(matches!(status, ClassStatus::Candidate(ref d) if d.name == "Widget"));
        assert_eq!(status.declaration().unwrap().name, "Widget");
    }

    #[test]
    fn test_ignore_takes_precedence_over_marker() {
        let status = classify("public class Foo : IFoo", &["Foo".to_string()]);
        assert!(matches!(status, ClassStatus::Ignored(_)));
    }
}
