//! A minimal hand-rolled scanner over a [`BufRead`] that understands just
//! enough raw JSON syntax (`{`, `}`, `[`, `]`, `,`, `:`, quoted keys,
//! whitespace) to walk the envelope structurally, handing off to
//! `serde_json` to parse each self-contained value (a field, or one
//! `eventList` element) without ever buffering the whole document.

use crate::error::{EpcisError, EpcisResult};
use serde::de::Deserialize;
use std::io::{BufRead, Read};

pub struct JsonCursor<R: BufRead> {
    inner: R,
    peeked: Option<u8>,
}

impl<R: BufRead> JsonCursor<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    fn fill_peek(&mut self) -> EpcisResult<Option<u8>> {
        if self.peeked.is_none() {
            let mut byte = [0u8; 1];
            let n = self.inner.read(&mut byte)?;
            self.peeked = if n == 0 { None } else { Some(byte[0]) };
        }
        Ok(self.peeked)
    }

    pub fn peek(&mut self) -> EpcisResult<Option<u8>> {
        self.fill_peek()
    }

    fn next_byte(&mut self) -> EpcisResult<Option<u8>> {
        if let Some(b) = self.peeked.take() {
            return Ok(Some(b));
        }
        let mut byte = [0u8; 1];
        let n = self.inner.read(&mut byte)?;
        Ok(if n == 0 { None } else { Some(byte[0]) })
    }

    pub fn skip_ws(&mut self) -> EpcisResult<()> {
        while let Some(b) = self.fill_peek()? {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                self.peeked = None;
            } else {
                break;
            }
        }
        Ok(())
    }

    pub fn expect(&mut self, ch: u8) -> EpcisResult<()> {
        self.skip_ws()?;
        match self.next_byte()? {
            Some(b) if b == ch => Ok(()),
            Some(b) => Err(EpcisError::MalformedInput(format!(
                "expected '{}', found '{}'",
                ch as char, b as char
            ))),
            None => Err(EpcisError::MalformedInput(format!(
                "expected '{}', found end of input",
                ch as char
            ))),
        }
    }

    /// Reads a JSON string literal (assumes the opening quote has already
    /// been consumed via [`Self::expect`]) and returns its unescaped content.
    pub fn read_string_body(&mut self) -> EpcisResult<String> {
        let mut raw = vec![b'"'];
        loop {
            let b = self
                .next_byte()?
                .ok_or_else(|| EpcisError::MalformedInput("unterminated string".into()))?;
            raw.push(b);
            if b == b'"' {
                break;
            }
            if b == b'\\' {
                if let Some(escaped) = self.next_byte()? {
                    raw.push(escaped);
                }
            }
        }
        let s: String = serde_json::from_slice(&raw)?;
        Ok(s)
    }

    /// Reads one key (a quoted string) followed by its `:`.
    pub fn read_key(&mut self) -> EpcisResult<String> {
        self.skip_ws()?;
        self.expect(b'"')?;
        let key = self.read_string_body()?;
        self.skip_ws()?;
        self.expect(b':')?;
        Ok(key)
    }

    /// Parses one complete JSON value starting at the current position:
    /// scans exactly the bytes making up that value (honouring string
    /// escapes and nested `{}`/`[]`) so the cursor stops precisely at the
    /// value's last byte, then hands the isolated slice to `serde_json`.
    ///
    /// A prior version fed the cursor's stream directly into
    /// `serde_json::Deserializer::from_reader`, which over-reads one byte
    /// of lookahead past a bare scalar (number/bool/null) to confirm where
    /// it ends; that byte was buffered inside the deserializer's own
    /// reader and lost once it dropped, silently eating the following
    /// `,`/`}`/`]`.
    pub fn read_value<T: for<'de> Deserialize<'de>>(&mut self) -> EpcisResult<T> {
        self.skip_ws()?;
        let raw = self.scan_value()?;
        let value = serde_json::from_slice(&raw)?;
        Ok(value)
    }

    /// Scans one JSON value (object, array, string, or bare literal) into
    /// `raw` bytes without consuming anything past it.
    fn scan_value(&mut self) -> EpcisResult<Vec<u8>> {
        self.skip_ws()?;
        let mut out = Vec::new();
        match self
            .peek()?
            .ok_or_else(|| EpcisError::MalformedInput("unexpected end of input".into()))?
        {
            b'"' => self.scan_string_into(&mut out)?,
            b'{' | b'[' => self.scan_container_into(&mut out)?,
            _ => self.scan_literal_into(&mut out)?,
        }
        Ok(out)
    }

    /// Scans a quoted string (including its escapes) into `out`.
    fn scan_string_into(&mut self, out: &mut Vec<u8>) -> EpcisResult<()> {
        let open = self
            .next_byte()?
            .expect("scan_string_into called after peek confirmed a byte");
        out.push(open);
        loop {
            let b = self
                .next_byte()?
                .ok_or_else(|| EpcisError::MalformedInput("unterminated string".into()))?;
            out.push(b);
            if b == b'\\' {
                if let Some(escaped) = self.next_byte()? {
                    out.push(escaped);
                }
            } else if b == b'"' {
                break;
            }
        }
        Ok(())
    }

    /// Scans a balanced `{...}`/`[...]` value into `out`, treating string
    /// contents as opaque so embedded `{}`/`[]`/`,` don't affect nesting.
    fn scan_container_into(&mut self, out: &mut Vec<u8>) -> EpcisResult<()> {
        let mut depth = 0i32;
        loop {
            let b = self
                .next_byte()?
                .ok_or_else(|| EpcisError::MalformedInput("unterminated value".into()))?;
            out.push(b);
            match b {
                b'"' => {
                    loop {
                        let c = self.next_byte()?.ok_or_else(|| {
                            EpcisError::MalformedInput("unterminated string".into())
                        })?;
                        out.push(c);
                        if c == b'\\' {
                            if let Some(escaped) = self.next_byte()? {
                                out.push(escaped);
                            }
                        } else if c == b'"' {
                            break;
                        }
                    }
                }
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Scans a bare literal (number, `true`, `false`, `null`) up to (but
    /// not including) the next structural delimiter or whitespace.
    fn scan_literal_into(&mut self, out: &mut Vec<u8>) -> EpcisResult<()> {
        loop {
            match self.peek()? {
                Some(b) if b == b',' || b == b'}' || b == b']' || b.is_ascii_whitespace() => break,
                Some(b) => {
                    out.push(b);
                    self.next_byte()?;
                }
                None => break,
            }
        }
        Ok(())
    }

    /// True if the next non-whitespace byte is `b']'` or `b'}'` without
    /// consuming it.
    pub fn peek_is(&mut self, ch: u8) -> EpcisResult<bool> {
        self.skip_ws()?;
        Ok(self.fill_peek()? == Some(ch))
    }

    pub fn consume(&mut self) -> EpcisResult<u8> {
        self.skip_ws()?;
        self.next_byte()?
            .ok_or_else(|| EpcisError::MalformedInput("unexpected end of input".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_keys_and_values_across_an_object() {
        let input = br#"{"a":1,"b":"two","c":[1,2,3]}"#;
        let mut cur = JsonCursor::new(Cursor::new(input.to_vec()));
        cur.expect(b'{').unwrap();
        assert_eq!(cur.read_key().unwrap(), "a");
        let a: i64 = cur.read_value().unwrap();
        assert_eq!(a, 1);
        assert!(!cur.peek_is(b'}').unwrap());
        cur.consume().unwrap(); // comma
        assert_eq!(cur.read_key().unwrap(), "b");
        let b: String = cur.read_value().unwrap();
        assert_eq!(b, "two");
        cur.consume().unwrap(); // comma
        assert_eq!(cur.read_key().unwrap(), "c");
        let c: Vec<i64> = cur.read_value().unwrap();
        assert_eq!(c, vec![1, 2, 3]);
        assert!(cur.peek_is(b'}').unwrap());
    }
}
