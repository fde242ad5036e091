//! Header inspection
//!
//! Parses preprocessed header text with tree-sitter and lists what it
//! declares. A rendered header that fails to parse is not usable by an FFI
//! layer, so `has_errors` is the first thing to check.

use bassmix_core::{Error, Result};
use tree_sitter::{Node, Parser as TSParser};
use tracing::debug;

/// Declarations found in a header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSummary {
    /// Declared function names, in source order
    pub functions: Vec<String>,
    /// Typedef names, in source order
    pub typedefs: Vec<String>,
    /// Whether the parser had to recover from syntax errors
    pub has_errors: bool,
}

impl HeaderSummary {
    /// Parse header text
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = TSParser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .expect("Failed to load C grammar");

        let tree = parser
            .parse(text, None)
            .ok_or_else(|| Error::Parse("Failed to parse header".into()))?;

        let root = tree.root_node();
        let mut summary = HeaderSummary {
            has_errors: root.has_error(),
            ..Default::default()
        };
        summary.visit(root, text);

        debug!(
            "Header declares {} functions and {} typedefs",
            summary.functions.len(),
            summary.typedefs.len()
        );
        Ok(summary)
    }

    /// Whether `name` is declared as a function
    pub fn declares_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f == name)
    }

    /// Whether `name` is declared as a typedef
    pub fn declares_type(&self, name: &str) -> bool {
        self.typedefs.iter().any(|t| t == name)
    }

    fn visit(&mut self, node: Node, source: &str) {
        match node.kind() {
            "declaration" => {
                for declarator in declarators(node) {
                    if let Some((name, true)) = declared_name(declarator, source) {
                        self.functions.push(name);
                    }
                }
                return;
            }
            "type_definition" => {
                for declarator in declarators(node) {
                    if let Some((name, _)) = declared_name(declarator, source) {
                        self.typedefs.push(name);
                    }
                }
                return;
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, source);
        }
    }
}

fn declarators(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let found = node.children_by_field_name("declarator", &mut cursor).collect();
    found
}

/// Innermost name of a declarator, and whether a function declarator was
/// crossed on the way down
fn declared_name(node: Node, source: &str) -> Option<(String, bool)> {
    let mut current = node;
    let mut is_function = false;

    loop {
        match current.kind() {
            "identifier" | "type_identifier" | "primitive_type" => {
                let name = current.utf8_text(source.as_bytes()).ok()?;
                return Some((name.to_string(), is_function));
            }
            "function_declarator" => is_function = true,
            _ => {}
        }

        current = match current.child_by_field_name("declarator") {
            Some(inner) => inner,
            None => current.named_child(0)?,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functions_and_typedefs() {
        let summary = HeaderSummary::parse(
            "typedef unsigned int DWORD;\n\
             typedef DWORD HSTREAM;\n\
             typedef void ( SYNCPROC)(DWORD, DWORD, void*);\n\
             typedef struct {\n  DWORD id;\n} NODE;\n\
             DWORD  BASS_Mixer_GetVersion(void);\n\
             const float *levels(DWORD handle);\n\
             int counter;\n",
        )
        .unwrap();

        assert!(!summary.has_errors);
        assert_eq!(summary.typedefs, vec!["DWORD", "HSTREAM", "SYNCPROC", "NODE"]);
        assert_eq!(summary.functions, vec!["BASS_Mixer_GetVersion", "levels"]);
        assert!(!summary.declares_function("counter"));
    }

    #[test]
    fn test_syntax_errors_flagged() {
        let summary = HeaderSummary::parse("DWORD BASS_Mixer_GetVersion(void);\nint (;\n").unwrap();
        assert!(summary.has_errors);
    }

    #[test]
    fn test_empty_input() {
        let summary = HeaderSummary::parse("").unwrap();
        assert_eq!(summary, HeaderSummary::default());
    }
}
