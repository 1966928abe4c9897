use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::ParseError;

/// Text encodings accepted for delimited input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    /// UTF-8 (with or without BOM)
    Utf8,
    /// UTF-16 little endian
    Utf16Le,
    /// UTF-16 big endian
    Utf16Be,
    /// ISO-8859-1; only used when declared
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Latin1 => "ISO-8859-1",
        };
        f.write_str(name)
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16le" | "utf16le" => Ok(TextEncoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(TextEncoding::Utf16Be),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(format!("unsupported encoding '{}'", other)),
        }
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

fn sniff_bom(bytes: &[u8]) -> Option<(TextEncoding, usize)> {
    if bytes.starts_with(UTF8_BOM) {
        Some((TextEncoding::Utf8, UTF8_BOM.len()))
    } else if bytes.starts_with(UTF16LE_BOM) {
        Some((TextEncoding::Utf16Le, UTF16LE_BOM.len()))
    } else if bytes.starts_with(UTF16BE_BOM) {
        Some((TextEncoding::Utf16Be, UTF16BE_BOM.len()))
    } else {
        None
    }
}

/// Decode raw bytes into text.
///
/// A declared encoding always wins; a matching BOM is stripped. Without a
/// declaration the BOM decides, and BOM-less input must be strict UTF-8.
pub(crate) fn decode(
    bytes: &[u8],
    declared: Option<TextEncoding>,
) -> Result<(String, TextEncoding), ParseError> {
    let bom = sniff_bom(bytes);
    let encoding = declared
        .or(bom.map(|(encoding, _)| encoding))
        .unwrap_or(TextEncoding::Utf8);
    let skip = match bom {
        Some((bom_encoding, len)) if bom_encoding == encoding => len,
        _ => 0,
    };
    let body = &bytes[skip..];

    let text = match encoding {
        TextEncoding::Utf8 => std::str::from_utf8(body)
            .map(str::to_string)
            .map_err(|e| ParseError::EncodingError {
                encoding,
                offset: skip + e.valid_up_to(),
            })?,
        TextEncoding::Utf16Le => decode_utf16(body, skip, encoding, u16::from_le_bytes)?,
        TextEncoding::Utf16Be => decode_utf16(body, skip, encoding, u16::from_be_bytes)?,
        TextEncoding::Latin1 => body.iter().map(|&b| b as char).collect(),
    };

    Ok((text, encoding))
}

fn decode_utf16(
    body: &[u8],
    skip: usize,
    encoding: TextEncoding,
    to_unit: fn([u8; 2]) -> u16,
) -> Result<String, ParseError> {
    if body.len() % 2 != 0 {
        return Err(ParseError::EncodingError {
            encoding,
            offset: skip + body.len() - 1,
        });
    }

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();

    let mut text = String::with_capacity(units.len());
    let mut unit_index = 0usize;
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(c) => {
                unit_index += c.len_utf16();
                text.push(c);
            }
            Err(_) => {
                return Err(ParseError::EncodingError {
                    encoding,
                    offset: skip + unit_index * 2,
                });
            }
        }
    }
    Ok(text)
}

/// Normalize line endings to `\n` and compose text to Unicode NFC.
pub(crate) fn normalize_text(text: &str) -> String {
    let unified = if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    };
    let unified = unified.strip_prefix('\u{FEFF}').unwrap_or(&unified);
    unified.nfc().collect()
}
