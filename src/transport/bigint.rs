//! Lexical protection of large integers in JSON text.
//!
//! `serde_json` without `arbitrary_precision` stores integers beyond `u64` as
//! `f64`, and JSON consumers in general round anything past 2^53. Integer
//! literals of [`LARGE_INTEGER_DIGITS`] or more digits that sit in an object
//! field position are turned into strings before the text is parsed.

use std::borrow::Cow;

pub const LARGE_INTEGER_DIGITS: usize = 15;

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Quote every `"key": <integer of 15+ digits>` value. Strings, floats,
/// exponents and array elements are left untouched. Returns the input
/// unchanged (borrowed) when nothing needed quoting.
pub fn protect_large_integers(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut in_string = false;
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        match b {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b':' => {
                let mut j = i + 1;
                while j < len && is_json_whitespace(bytes[j]) {
                    j += 1;
                }
                let start = j;
                if j < len && bytes[j] == b'-' {
                    j += 1;
                }
                let digits_start = j;
                while j < len && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                let digits = j - digits_start;
                let integral = j == len || !matches!(bytes[j], b'.' | b'e' | b'E');

                if digits >= LARGE_INTEGER_DIGITS && integral {
                    let buf = out.get_or_insert_with(|| String::with_capacity(len + 16));
                    buf.push_str(&text[copied..start]);
                    buf.push('"');
                    buf.push_str(&text[start..j]);
                    buf.push('"');
                    copied = j;
                    i = j;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&text[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(text),
    }
}
