use crate::error::{CompressionError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Encodes bytes as `data:<mime>;base64,<payload>`.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("{}{}{},{}", DATA_PREFIX, mime_type, BASE64_MARKER, STANDARD.encode(bytes))
}

/// Splits a Base64 data URL into its media type and decoded bytes.
/// Percent-encoded (non-Base64) data URLs are rejected.
pub fn parse_data_url(data_url: &str) -> Result<(String, Bytes)> {
    let rest = data_url
        .strip_prefix(DATA_PREFIX)
        .ok_or_else(|| CompressionError::InvalidInput("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CompressionError::InvalidInput("missing data URL payload".to_string()))?;
    let mime_type = header.strip_suffix(BASE64_MARKER).ok_or_else(|| {
        CompressionError::InvalidInput("only base64 data URLs are supported".to_string())
    })?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| CompressionError::InvalidInput(format!("invalid base64 payload: {}", e)))?;

    Ok((mime_type.to_string(), Bytes::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url("image/jpeg", b"hi"), "data:image/jpeg;base64,aGk=");
        assert_eq!(encode_data_url("image/png", b""), "data:image/png;base64,");
    }

    #[test]
    fn test_parse_data_url() {
        let (mime, bytes) = parse_data_url("data:image/webp;base64,aGk=").unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(bytes.as_ref(), b"hi");
    }

    #[test]
    fn test_parse_rejects_non_base64_and_garbage() {
        assert!(parse_data_url("data:text/plain,hello").is_err());
        assert!(parse_data_url("http://example.com/a.png").is_err());
        assert!(parse_data_url("data:image/png;base64").is_err());
        assert!(parse_data_url("data:image/png;base64,@@@").is_err());
    }
}
