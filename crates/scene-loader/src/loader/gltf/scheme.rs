use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use base64::{engine::general_purpose::STANDARD, Engine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    Unsupported(String),
    BadDataUri,
}

impl Display for SchemeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SchemeError::Unsupported(scheme) => write!(f, "Unsupported scheme {}", scheme),
            SchemeError::BadDataUri => write!(f, "Bad data URI"),
        }
    }
}

impl Error for SchemeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Scheme {
    // Data uri with optional mime type
    Data(Option<String>, Vec<u8>),
    // Relative path, percent-decoded
    Relative(String),
    // Absolute path
    Absolute(String),
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

/// Decodes `%XX` escapes. Malformed escapes are kept as they are.
pub(crate) fn percent_decode(value: &str) -> String {
    fn hex(byte: u8) -> Option<u8> {
        match byte {
            b'0'..=b'9' => Some(byte - b'0'),
            b'a'..=b'f' => Some(byte - b'a' + 10),
            b'A'..=b'F' => Some(byte - b'A' + 10),
            _ => None,
        }
    }

    let bytes = value.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex(bytes[index + 1]), hex(bytes[index + 2])) {
                result.push(high << 4 | low);
                index += 3;
                continue;
            }
        }
        result.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

impl TryFrom<&str> for Scheme {
    type Error = SchemeError;

    fn try_from(uri: &str) -> Result<Self, Self::Error> {
        if let Some(content) = strip_prefix_ignore_case(uri, "data:") {
            // Data URI: rfc2397
            let Some((param, value)) = content.split_once(',') else {
                return Err(SchemeError::BadDataUri);
            };
            let mut params = param.split(';');
            let mime = params
                .next()
                .filter(|mime| !mime.is_empty())
                .map(str::to_string);
            if params.any(|param| param.eq_ignore_ascii_case("base64")) {
                let data = STANDARD
                    .decode(value.trim())
                    .map_err(|_| SchemeError::BadDataUri)?;
                Ok(Scheme::Data(mime, data))
            } else {
                Ok(Scheme::Data(mime, percent_decode(value).into_bytes()))
            }
        } else if let Some(path) = strip_prefix_ignore_case(uri, "file://") {
            Ok(Scheme::Absolute(percent_decode(path)))
        } else if let Some(path) = strip_prefix_ignore_case(uri, "file:") {
            Ok(Scheme::Absolute(percent_decode(path)))
        } else if let Some((scheme, _)) = uri.split_once(':') {
            // A colon before any slash starts a scheme; later ones are part of the path.
            if scheme.contains('/') {
                Ok(Scheme::Relative(percent_decode(uri)))
            } else {
                Err(SchemeError::Unsupported(scheme.to_string()))
            }
        } else {
            Ok(Scheme::Relative(percent_decode(uri)))
        }
    }
}
