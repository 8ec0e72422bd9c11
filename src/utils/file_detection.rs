use anyhow::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "adoc",
    "rs", "py", "js", "ts", "jsx", "tsx", "java", "c", "cpp", "cxx", "cc", "h", "hpp", "hxx",
    "go", "rb", "php", "swift", "kt", "kts", "scala", "clj", "hs", "ml", "fs", "cs",
    "html", "htm", "xml", "css", "scss", "sass", "less", "svg", "vue", "svelte",
    "json", "jsonc", "yaml", "yml", "toml", "ini", "cfg", "conf", "properties", "env",
    "sql", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd", "cmake", "gradle",
    "tex", "r", "lua", "vim", "el", "dart", "elm", "ex", "exs", "erl", "nim", "zig",
    "csv", "tsv", "graphql", "gql", "prisma", "proto", "diff", "patch", "lock",
    "gitignore", "promptignore", "dockerignore", "editorconfig", "mjs", "cjs",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "deb", "rpm", "msi",
    "zip", "tar", "gz", "bz2", "7z", "rar", "jar", "war",
    "mp3", "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm",
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "bin", "dat", "db", "sqlite", "sqlite3",
    "rlib", "rmeta", "pdb", "lib", "a", "obj", "o", "class", "pyc", "wasm",
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "webp", "tiff", "tif", "heic", "avif",
];

/// Size above which unknown files are assumed binary without sniffing.
const CONTENT_CHECK_LIMIT: u64 = 20 * 1024 * 1024;

/// Determines if a file is likely to be a text file
pub fn is_text_file(path: &Path) -> Result<bool> {
    // First check by extension
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        let ext_lower = extension.to_lowercase();

        if TEXT_EXTENSIONS.contains(&ext_lower.as_str()) {
            return Ok(true);
        }

        if BINARY_EXTENSIONS.contains(&ext_lower.as_str()) {
            return Ok(false);
        }
    }

    if let Ok(metadata) = std::fs::metadata(path) {
        if metadata.len() > CONTENT_CHECK_LIMIT {
            return Ok(false);
        }
    }

    // Unknown extension and small enough: sniff the first bytes.
    check_file_content(path)
}

/// Checks file content to determine if it's text or binary
fn check_file_content(path: &Path) -> Result<bool> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buffer = [0; 1024];
    let bytes_read = reader.read(&mut buffer)?;

    if bytes_read == 0 {
        return Ok(true);
    }

    if buffer[..bytes_read].contains(&0) {
        tracing::debug!("Binary (null bytes) detected in {}", path.display());
        return Ok(false);
    }

    // A multi-byte sequence may be cut at the buffer edge.
    match std::str::from_utf8(&buffer[..bytes_read]) {
        Ok(_) => Ok(true),
        Err(e) => Ok(e.error_len().is_none()),
    }
}
