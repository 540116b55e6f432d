//! Reply token: the fixed-size file name announcing a spoken response.
//!
//! Short, digit-free responses map to a stable name so the client can keep a
//! local copy and answer `CACHED` next time. Anything else shares one
//! throwaway name.

/// Size of the token on the wire.
pub const REPLY_TOKEN_LEN: usize = 29;

/// Longest stripped text that still gets its own name.
pub const MAX_NAME_LEN: usize = 24;

/// Name used for long or numeric responses.
pub const FALLBACK_NAME: &str = "mp3respond";

/// Derive the file stem for `text`.
pub fn token_name(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    if stripped.len() > MAX_NAME_LEN || stripped.chars().any(|c| c.is_ascii_digit()) {
        tracing::debug!(text, "response not cacheable on the client, using fallback name");
        return FALLBACK_NAME.to_string();
    }
    stripped.to_ascii_lowercase()
}

/// Build the zero-padded `/<name>.mp3` token for `text`.
pub fn reply_token(text: &str) -> [u8; REPLY_TOKEN_LEN] {
    // 1 + MAX_NAME_LEN + 4 == REPLY_TOKEN_LEN, so the path always fits.
    let path = format!("/{}.mp3", token_name(text));
    let mut token = [0u8; REPLY_TOKEN_LEN];
    token[..path.len()].copy_from_slice(path.as_bytes());
    token
}
