//! Knowledge-base and email loading.
//!
//! The whole knowledge base is concatenated into one grounding string: every
//! `.md`/`.markdown`/`.txt` file under the directory, in lexicographic path
//! order, each preceded by a `### FILE: <path>` header.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use copilot_shared::{CopilotError, Result};

/// Marker that opens each file's section in the context string.
pub const FILE_HEADER_PREFIX: &str = "### FILE: ";

/// Extensions (lowercase) that qualify a file for the knowledge base.
const TEXT_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Concatenated knowledge base used to ground every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeContext {
    text: String,
    file_count: usize,
}

impl KnowledgeContext {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of files that went into the context.
    pub fn file_count(&self) -> usize {
        self.file_count
    }
}

/// Load every qualifying file under `kb_dir` into a [`KnowledgeContext`].
///
/// Undecodable bytes are replaced with U+FFFD. Fails with a config error if
/// the directory is missing or holds no qualifying files.
#[instrument(skip_all, fields(kb_dir = %kb_dir.display()))]
pub fn load_context(kb_dir: &Path) -> Result<KnowledgeContext> {
    if !kb_dir.is_dir() {
        return Err(CopilotError::config(format!(
            "knowledge base directory {} does not exist",
            kb_dir.display()
        )));
    }

    let files = discover_files(kb_dir)?;
    if files.is_empty() {
        return Err(CopilotError::config(format!(
            "No .md/.markdown/.txt files found in {}",
            kb_dir.display()
        )));
    }

    let mut parts = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = std::fs::read(path).map_err(|e| CopilotError::io(path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let label = display_path(kb_dir, path);
        debug!(file = %label, size = bytes.len(), "loaded knowledge base file");
        parts.push(format!("\n\n{FILE_HEADER_PREFIX}{label}\n{text}"));
    }

    let text = parts.join("\n").trim().to_string();
    info!(files = files.len(), chars = text.len(), "knowledge base loaded");

    Ok(KnowledgeContext {
        text,
        file_count: files.len(),
    })
}

/// Read the customer email, tolerating invalid UTF-8, trimmed.
pub fn load_email(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        CopilotError::config(format!("cannot read customer email {}: {e}", path.display()))
    })?;
    let email = String::from_utf8_lossy(&bytes).trim().to_string();
    if email.is_empty() {
        return Err(CopilotError::config(format!(
            "customer email {} is empty",
            path.display()
        )));
    }
    Ok(email)
}

/// All qualifying files below `dir`, sorted by path.
fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            // Dangling symlinks (editor lockfiles and the like) hold no content.
            Err(e) if is_dangling_link(&e) => {
                debug!(path = ?e.path(), "skipping dangling symlink");
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                return Err(match e.into_io_error() {
                    Some(source) => CopilotError::io(path, source),
                    None => CopilotError::config(format!(
                        "filesystem loop detected under {}",
                        dir.display()
                    )),
                });
            }
        };
        if entry.file_type().is_file() && has_text_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_dangling_link(err: &walkdir::Error) -> bool {
    let not_found = err
        .io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
    not_found
        && err
            .path()
            .and_then(|p| p.symlink_metadata().ok())
            .is_some_and(|meta| meta.file_type().is_symlink())
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Path relative to the KB root with `/` separators.
fn display_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sc-context-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, rel: &str, content: &[u8]) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn one_header_per_file() {
        let tmp = temp_dir();
        write(&tmp, "shipping.md", b"Orders ship within 2 business days.");
        write(&tmp, "returns.txt", b"Returns accepted for 30 days.");
        write(&tmp, "policies/allergens.MD", b"Our oils contain no nuts.");
        write(&tmp, "logo.png", b"\x89PNG");
        write(&tmp, "notes.json", b"{}");

        let ctx = load_context(&tmp).unwrap();
        assert_eq!(ctx.file_count(), 3);
        assert_eq!(ctx.as_str().matches(FILE_HEADER_PREFIX).count(), 3);
        assert!(ctx.as_str().contains("### FILE: policies/allergens.MD"));
        assert!(!ctx.as_str().contains("PNG"));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn files_in_lexicographic_order() {
        let tmp = temp_dir();
        write(&tmp, "b.md", b"second");
        write(&tmp, "a.md", b"first");
        write(&tmp, "c/z.txt", b"third");

        let ctx = load_context(&tmp).unwrap();
        assert_eq!(
            ctx.as_str(),
            "### FILE: a.md\nfirst\n\n\n### FILE: b.md\nsecond\n\n\n### FILE: c/z.txt\nthird"
        );

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn reload_is_byte_identical() {
        let tmp = temp_dir();
        write(&tmp, "faq.md", b"# FAQ\n\nShipping is free over 50 EUR.\n");
        write(&tmp, "nested/deep/terms.txt", b"Terms apply.");

        let first = load_context(&tmp).unwrap();
        let second = load_context(&tmp).unwrap();
        assert_eq!(first, second);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn undecodable_bytes_are_replaced() {
        let tmp = temp_dir();
        write(&tmp, "latin1.txt", b"caf\xe9 ouvert");

        let ctx = load_context(&tmp).unwrap();
        assert!(ctx.as_str().contains("caf\u{FFFD} ouvert"));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn empty_directory_is_config_error() {
        let tmp = temp_dir();
        write(&tmp, "image.jpg", b"binary");

        let err = load_context(&tmp).unwrap_err();
        assert!(matches!(err, CopilotError::Config { .. }), "got {err:?}");

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped() {
        let tmp = temp_dir();
        write(&tmp, "shipping.md", b"Orders ship within 2 business days.");
        std::os::unix::fs::symlink("user@host.1234:1700000000", tmp.join(".#shipping.md"))
            .unwrap();

        let ctx = load_context(&tmp).unwrap();
        assert_eq!(ctx.file_count(), 1);
        assert_eq!(
            ctx.as_str(),
            "### FILE: shipping.md\nOrders ship within 2 business days."
        );

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn empty_directory_error_names_every_extension() {
        let tmp = temp_dir();
        let err = load_context(&tmp).unwrap_err();
        assert!(err.to_string().contains(".md/.markdown/.txt"), "got {err}");

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn missing_directory_is_config_error() {
        let missing = std::env::temp_dir().join(format!("sc-missing-{}", uuid::Uuid::now_v7()));
        let err = load_context(&missing).unwrap_err();
        assert!(matches!(err, CopilotError::Config { .. }), "got {err:?}");
    }

    #[test]
    fn email_is_trimmed() {
        let tmp = temp_dir();
        write(&tmp, "email.txt", b"\n  Where is my order?  \n\n");
        assert_eq!(load_email(&tmp.join("email.txt")).unwrap(), "Where is my order?");

        write(&tmp, "blank.txt", b"   \n");
        assert!(matches!(
            load_email(&tmp.join("blank.txt")).unwrap_err(),
            CopilotError::Config { .. }
        ));
        assert!(matches!(
            load_email(&tmp.join("absent.txt")).unwrap_err(),
            CopilotError::Config { .. }
        ));

        std::fs::remove_dir_all(&tmp).ok();
    }
}
