use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFileName {
    #[error("file name is empty")]
    Empty,
    #[error("file name contains a forbidden character {0:?}")]
    ForbiddenChar(char),
    #[error("file name is a relative path component")]
    Relative,
    #[error("file name {0} is reserved")]
    Reserved(String),
}

/// Accept a client-supplied file name only if it names a single file inside
/// the storage directory. The name is never rewritten.
pub fn validate_upload_name(name: &str) -> Result<&str, InvalidFileName> {
    if name.trim().is_empty() {
        return Err(InvalidFileName::Empty);
    }
    if let Some(c) = name.chars().find(|&c| is_forbidden(c)) {
        return Err(InvalidFileName::ForbiddenChar(c));
    }
    if name == "." || name == ".." {
        return Err(InvalidFileName::Relative);
    }
    if is_reserved_windows_name(name) {
        return Err(InvalidFileName::Reserved(name.to_string()));
    }
    Ok(name)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}'
    )
}

/// Device names are reserved with or without an extension (`NUL.txt`).
fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}
