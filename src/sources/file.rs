//! URL lists read from a local text file, one URL per line.

use super::SourceError;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Read a URL list from `path`.
///
/// Lines are trimmed and blank lines dropped; order and duplicates are kept.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_url_file(path: &Path) -> Result<Vec<String>, SourceError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let urls = parse_url_list(&text);
    info!(count = urls.len(), "Loaded URLs from file");
    debug!(urls = ?urls, "File URLs");
    Ok(urls)
}

/// Split `text` into trimmed, non-empty lines.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_url_list_trims_and_drops_blanks() {
        let text = "http://a.com\n\n  http://b.com  \nhttp://a.com\n";
        assert_eq!(
            parse_url_list(text),
            vec!["http://a.com", "http://b.com", "http://a.com"]
        );
    }

    #[test]
    fn test_parse_url_list_crlf_and_whitespace_only() {
        let text = "http://a.com\r\n \t \r\nhttp://b.com";
        assert_eq!(parse_url_list(text), vec!["http://a.com", "http://b.com"]);
    }

    #[test]
    fn test_parse_url_list_empty() {
        assert!(parse_url_list("").is_empty());
        assert!(parse_url_list("\n\n   \n").is_empty());
    }

    #[tokio::test]
    async fn test_read_url_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "https://example.com/one\n\nhttps://example.com/two\n").unwrap();

        let urls = read_url_file(file.path()).await.unwrap();
        assert_eq!(urls, vec!["https://example.com/one", "https://example.com/two"]);
    }

    #[tokio::test]
    async fn test_read_url_file_missing() {
        let err = read_url_file(Path::new("/nonexistent/urls.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
