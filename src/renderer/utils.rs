use anyhow::{Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose};
use image::DynamicImage;

/// Sanitize a node id into a WGSL / file-name friendly identifier.
pub fn sanitize_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn percent_decode_to_bytes(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_value),
                bytes.get(i + 2).copied().and_then(hex_value),
            ) else {
                bail!("invalid percent escape in data URL");
            };
            out.push(hi * 16 + lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

pub fn is_data_url(s: &str) -> bool {
    s.trim_start().starts_with("data:")
}

/// Decode a `data:` URL (base64 or percent-encoded) to raw bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let s = data_url.trim();
    let Some(rest) = s.strip_prefix("data:") else {
        bail!("not a data URL");
    };
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid data URL: missing comma"))?;

    let is_base64 = meta
        .split(';')
        .any(|t| t.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        general_purpose::STANDARD
            .decode(data.trim())
            .or_else(|_| general_purpose::URL_SAFE.decode(data.trim()))
            .map_err(|e| anyhow!("invalid base64 in data URL: {e}"))
    } else {
        percent_decode_to_bytes(data)
    }
}

pub fn load_image_from_data_url(data_url: &str) -> Result<DynamicImage> {
    let bytes = decode_data_url(data_url)?;
    image::load_from_memory(&bytes).map_err(|e| anyhow!("failed to decode image bytes: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents_are_sanitized() {
        assert_eq!(sanitize_ident("hero-prism"), "hero_prism");
        assert_eq!(sanitize_ident("products/p1"), "products_p1");
        assert_eq!(sanitize_ident("3d"), "_3d");
    }

    #[test]
    fn data_urls_decode_both_encodings() {
        assert_eq!(decode_data_url("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_data_url("data:text/plain,a%20b").unwrap(), b"a b");
        assert!(decode_data_url("https://x").is_err());
        assert!(decode_data_url("data:text/plain,%zz").is_err());
    }
}
