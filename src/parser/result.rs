//! Acknowledgement summary lines (`<status>;<file name>`).

use super::error::ParseError;

/// Number of header lines at the top of every result file.
pub const RESULT_HEADER_LINES: usize = 2;

/// A file acknowledged by the client with its processing status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknowledgedFile {
    pub status_code: i64,
    pub file_name: String,
}

/// Parse an acknowledgement line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the line has fewer than two columns or the status is
/// not an integer.
pub fn parse_acknowledgement(line: &str) -> Result<Option<AcknowledgedFile>, ParseError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let words: Vec<&str> = line.split(';').collect();
    let Some(file_name) = words.get(1) else {
        return Err(ParseError::MissingColumn {
            index: 1,
            found: words.len(),
        });
    };

    let status_code = words[0]
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidNumber {
            column: "status_code".to_string(),
            value: words[0].to_string(),
        })?;

    Ok(Some(AcknowledgedFile {
        status_code,
        file_name: (*file_name).to_string(),
    }))
}
