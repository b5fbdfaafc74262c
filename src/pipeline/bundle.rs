//! Report payload assembly
//!
//! The bundle is plain text, not JSON. Its layout is fixed so that identical
//! inputs always produce byte-identical payloads:
//!
//! ```text
//! _____________________________________
//! Code File under analysis :
//! <file name>
//! <file content>_____________________________________
//! Static Application Security Testing (SAST) report
//! <pretty JSON findings>
//! _____________________________________
//!  Related / Dependant Code files
//! <related name>
//! <related content>
//! _____________________________________
//! ```
//!
//! The SAST block is present only when findings were produced.

use crate::fs::FileSystem;
use crate::inference::ContextEntry;
use crate::sast::Finding;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

pub const BANNER: &str = "_____________________________________";

/// Assembled report payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBundle {
    text: String,
}

impl CodeBundle {
    pub fn builder<'a>(file_name: &'a str, content: &'a str) -> CodeBundleBuilder<'a> {
        CodeBundleBuilder {
            file_name,
            content,
            findings: None,
            related: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

pub struct CodeBundleBuilder<'a> {
    file_name: &'a str,
    content: &'a str,
    findings: Option<&'a [Finding]>,
    related: Vec<RelatedFile>,
}

/// A related file's display name and content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedFile {
    pub name: String,
    pub content: String,
}

impl<'a> CodeBundleBuilder<'a> {
    pub fn static_findings(mut self, findings: &'a [Finding]) -> Self {
        self.findings = Some(findings);
        self
    }

    pub fn related_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.related.push(RelatedFile {
            name: name.into(),
            content: content.into(),
        });
        self
    }

    pub fn related_files(mut self, files: impl IntoIterator<Item = RelatedFile>) -> Self {
        self.related.extend(files);
        self
    }

    pub fn build(self) -> CodeBundle {
        let mut text = String::with_capacity(
            self.content.len() + self.related.iter().map(|r| r.content.len()).sum::<usize>() + 256,
        );

        text.push_str(BANNER);
        text.push('\n');
        text.push_str("Code File under analysis : \n");
        text.push_str(self.file_name);
        text.push('\n');
        text.push_str(self.content);
        text.push_str(BANNER);

        if let Some(findings) = self.findings {
            // Finding serialization cannot fail: plain strings and integers only
            let rendered = serde_json::to_string_pretty(findings).unwrap_or_default();
            text.push_str("\nStatic Application Security Testing (SAST) report \n");
            text.push_str(&rendered);
            text.push('\n');
            text.push_str(BANNER);
        }

        text.push_str("\n Related / Dependant Code files \n");
        for related in &self.related {
            text.push_str(&related.name);
            text.push('\n');
            text.push_str(&related.content);
            text.push('\n');
            text.push_str(BANNER);
            text.push('\n');
        }

        CodeBundle { text }
    }
}

/// Resolves a related-file path from the context stage against the repository root
///
/// Absolute paths are kept. Relative paths that climb above the root return `None`.
pub fn resolve_related_path(root: &Path, raw: &str) -> Option<PathBuf> {
    let path = Path::new(raw.trim());
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }

    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => depth = depth.checked_sub(1)?,
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(path))
}

/// Reads every usable related file, in the order the context stage returned them
///
/// Entries without a name or path, paths outside the repository and unreadable
/// files are logged and left out.
pub fn collect_related(
    file_system: &dyn FileSystem,
    root: &Path,
    entries: &[ContextEntry],
) -> Vec<RelatedFile> {
    let mut related = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some((name, raw_path)) = entry.reference() else {
            warn!(entry = ?entry, "Skipping related file without name or path");
            continue;
        };

        let Some(path) = resolve_related_path(root, raw_path) else {
            warn!(path = %raw_path, "Skipping related file outside the repository");
            continue;
        };

        match file_system.read_to_string_lossy(&path) {
            Ok(content) => related.push(RelatedFile {
                name: name.to_string(),
                content,
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable related file");
            }
        }
    }

    related
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_layout_without_sast() {
        let bundle = CodeBundle::builder("a.py", "import b\n")
            .related_file("b.py", "X = 1")
            .build();

        let expected = format!(
            "{b}\nCode File under analysis : \na.py\nimport b\n{b}\n Related / Dependant Code files \nb.py\nX = 1\n{b}\n",
            b = BANNER
        );
        assert_eq!(bundle.as_str(), expected);
    }

    #[test]
    fn test_layout_with_sast_block() {
        let findings = vec![Finding {
            issue: "[B101:assert_used] Use of assert".to_string(),
            line_number: Some(1),
            ..Default::default()
        }];
        let bundle = CodeBundle::builder("a.py", "assert x\n")
            .static_findings(&findings)
            .build();
        let text = bundle.into_string();

        let sast_at = text
            .find("Static Application Security Testing (SAST) report")
            .unwrap();
        let related_at = text.find("Related / Dependant Code files").unwrap();
        assert!(sast_at < related_at);
        assert!(text.contains("\"issue\": \"[B101:assert_used] Use of assert\""));
    }

    #[test]
    fn test_empty_findings_still_render_block() {
        let bundle = CodeBundle::builder("a.py", "").static_findings(&[]).build();
        assert!(bundle.as_str().contains("SAST) report \n[]\n"));
    }

    #[test]
    fn test_bundle_is_deterministic() {
        let build = || {
            CodeBundle::builder("a.py", "x")
                .related_file("c.py", "c")
                .related_file("b.py", "b")
                .build()
        };
        assert_eq!(build(), build());
        let text = build().into_string();
        assert!(text.find("c.py").unwrap() < text.find("b.py").unwrap());
    }

    #[test]
    fn test_resolve_related_path() {
        let root = Path::new("/repo");
        assert_eq!(
            resolve_related_path(root, "src/b.py"),
            Some(PathBuf::from("/repo/src/b.py"))
        );
        assert_eq!(
            resolve_related_path(root, "./src/../b.py"),
            Some(PathBuf::from("/repo/./src/../b.py"))
        );
        assert_eq!(
            resolve_related_path(root, "/abs/c.py"),
            Some(PathBuf::from("/abs/c.py"))
        );
        assert_eq!(resolve_related_path(root, "../outside.py"), None);
        assert_eq!(resolve_related_path(root, "src/../../outside.py"), None);
    }

    #[test]
    fn test_collect_related_skips_bad_entries() {
        let fs = MockFileSystem::with_root(PathBuf::from("/repo"));
        fs.add_file("src/b.py", "B");
        fs.add_file("src/d.py", "D");

        let entries = vec![
            ContextEntry::new("b.py", "src/b.py", "imported"),
            ContextEntry {
                related_file_name: Some("nameless.py".to_string()),
                ..Default::default()
            },
            ContextEntry::new("missing.py", "src/missing.py", "gone"),
            ContextEntry::new("escape.py", "../escape.py", "outside"),
            ContextEntry::new("d.py", "src/d.py", "called"),
        ];

        let related = collect_related(&fs, Path::new("/repo"), &entries);
        assert_eq!(
            related,
            vec![
                RelatedFile {
                    name: "b.py".to_string(),
                    content: "B".to_string()
                },
                RelatedFile {
                    name: "d.py".to_string(),
                    content: "D".to_string()
                },
            ]
        );
    }
}
