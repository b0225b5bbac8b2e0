use anyhow::{Result, anyhow};

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Replaces spaces with underscores and drops anything outside `[0-9a-zA-Z._-]`.
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Checks a file record URL before it is turned into a path under the site directory.
pub fn validate_local_file_url(file_url: &str) -> Result<()> {
    if !file_url.starts_with('/') {
        return Err(anyhow!(ValidationError {
            code: "INVALID_FILE_URL",
            message: format!("File URL '{}' is not a site-relative path", file_url),
        }));
    }

    if file_url.split('/').any(|segment| segment == "..") {
        return Err(anyhow!(ValidationError {
            code: "PATH_TRAVERSAL",
            message: format!("File URL '{}' escapes the site directory", file_url),
        }));
    }

    Ok(())
}

/// Table and column names taken from `doctype_meta` end up in generated SQL.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ');

    if !valid {
        return Err(anyhow!(ValidationError {
            code: "INVALID_IDENTIFIER",
            message: format!("'{}' is not a valid table or column name", identifier),
        }));
    }
    Ok(())
}
