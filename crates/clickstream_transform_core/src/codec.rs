use std::io::Read;

use flate2::read::MultiGzDecoder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to decompress gzip payload: {0}")]
    Decompression(#[source] std::io::Error),
    #[error("decompressed payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),
}

/// Inflates a gzip object body into text. Concatenated gzip members are read
/// through to the end, and an empty body decodes to empty text.
pub fn decompress_gzip(body: &[u8]) -> Result<String, TransformError> {
    if body.is_empty() {
        return Ok(String::new());
    }

    let mut decoder = MultiGzDecoder::new(body);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(TransformError::Decompression)?;

    String::from_utf8(inflated).map_err(TransformError::InvalidUtf8)
}

/// Newline-joined output body, without a trailing newline.
pub fn encode_json_lines(lines: &[String]) -> Vec<u8> {
    lines.join("\n").into_bytes()
}
