//! `application/x-www-form-urlencoded` decoding.

use alloc::string::String;
use alloc::vec::Vec;

use crate::domain::error::WebAdminError;
use crate::domain::ports::FieldVisitor;

/// Call `visit` for each `name[=value]` pair of `raw`, in order.
///
/// `+` decodes to a space and `%XX` to its byte; malformed escapes are kept
/// literally. Empty segments are skipped.
pub fn parse_urlencoded(raw: &[u8], visit: &mut FieldVisitor<'_>) -> Result<(), WebAdminError> {
    for pair in raw.split(|&b| b == b'&').filter(|p| !p.is_empty()) {
        let (name, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], Some(&pair[eq + 1..])),
            None => (pair, None),
        };
        let name = decode(name);
        let value = value.map(decode);
        visit(&name, value.as_deref())?;
    }
    Ok(())
}

fn decode(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let escaped = match raw.get(i..i + 3) {
            Some([b'%', hi, lo]) => hex(*hi).zip(hex(*lo)),
            _ => None,
        };
        match (raw[i], escaped) {
            (_, Some((hi, lo))) => {
                out.push(hi << 4 | lo);
                i += 3;
            }
            (b'+', None) => {
                out.push(b' ');
                i += 1;
            }
            (b, None) => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn collect(raw: &[u8]) -> Vec<(String, Option<String>)> {
        let mut fields = Vec::new();
        parse_urlencoded(raw, &mut |name: &str, value: Option<&str>| {
            fields.push((name.to_string(), value.map(str::to_string)));
            Ok(())
        })
        .unwrap();
        fields
    }

    #[test]
    fn test_pairs_in_order() {
        let fields = collect(b"zone=lab&name=bench&psk");
        assert_eq!(
            fields,
            [
                ("zone".to_string(), Some("lab".to_string())),
                ("name".to_string(), Some("bench".to_string())),
                ("psk".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_decoding() {
        let fields = collect(b"ssid=my+net%21&x=%zz%4");
        assert_eq!(fields[0].1.as_deref(), Some("my net!"));
        assert_eq!(fields[1].1.as_deref(), Some("%zz%4"));
    }

    #[test]
    fn test_visitor_error_stops() {
        let mut seen = 0;
        let err = parse_urlencoded(b"a=1&b=2&c=3", &mut |name: &str, _: Option<&str>| {
            seen += 1;
            if name == "b" {
                Err(WebAdminError::UnknownField(name.to_string()))
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert_eq!(err, WebAdminError::UnknownField("b".into()));
        assert_eq!(seen, 2);
    }
}
