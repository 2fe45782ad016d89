use super::json_path::extract;
use serde_json::Value;
use std::io::{self, Read};

/// Lookahead capacity. Tokens longer than this pass through untouched.
pub const LOOKAHEAD: usize = 32;

/// Byte stream that substitutes `{.path}` tokens with values from a JSON document.
///
/// A token may be followed by one of `* / + -` and a second token, in which
/// case both values are combined as floating point and the result is written
/// with no fractional digits. Only tokens fully present in the lookahead
/// window are recognized, so output does not depend on how the source splits
/// its reads.
pub struct TemplateStream<'a, R> {
    source: R,
    doc: &'a Value,
    buffer: Vec<u8>,
    /// Leading buffer bytes that came from a substitution and must not be rescanned
    protected: usize,
    exhausted: bool,
}

impl<'a, R: Read> TemplateStream<'a, R> {
    pub fn new(source: R, doc: &'a Value) -> Self {
        Self {
            source,
            doc,
            buffer: Vec::with_capacity(LOOKAHEAD * 2),
            protected: 0,
            exhausted: false,
        }
    }

    /// Next output byte without consuming it
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        self.find_and_replace()?;
        Ok(self.buffer.first().copied())
    }

    /// Consume the next output byte
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.find_and_replace()?;
        if self.buffer.is_empty() {
            return Ok(None);
        }
        self.protected = self.protected.saturating_sub(1);
        Ok(Some(self.buffer.remove(0)))
    }

    /// Bytes buffered and ready to read
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; LOOKAHEAD];
        while !self.exhausted && self.buffer.len() < LOOKAHEAD {
            let want = LOOKAHEAD - self.buffer.len();
            match self.source.read(&mut chunk[..want]) {
                Ok(0) => self.exhausted = true,
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn find_and_replace(&mut self) -> io::Result<()> {
        self.fill()?;

        // The shortest token is `{.x}`
        if self.protected > 0 || self.buffer.len() < 4 {
            return Ok(());
        }

        let mut end = match find_token(&self.buffer, 0) {
            Some(end) => end,
            None => return Ok(()),
        };

        let path = String::from_utf8_lossy(&self.buffer[2..end - 1]).into_owned();
        let mut replacement = extract(self.doc, &path);

        if let Some(&op) = self.buffer.get(end) {
            if matches!(op, b'*' | b'/' | b'+' | b'-') {
                if let Some(end2) = find_token(&self.buffer, end + 1) {
                    let path2 = String::from_utf8_lossy(&self.buffer[end + 3..end2 - 1]);
                    let lhs = to_float(&replacement);
                    let rhs = to_float(&extract(self.doc, &path2));
                    replacement = combine(op, lhs, rhs);
                    end = end2;
                }
            }
        }

        self.protected = replacement.len();
        self.buffer.splice(..end, replacement.into_bytes());
        Ok(())
    }
}

impl<R: Read> Read for TemplateStream<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            match self.read_byte()? {
                Some(b) => {
                    buf[written] = b;
                    written += 1;
                }
                None => break,
            }
        }
        Ok(written)
    }
}

/// End index (exclusive) of a complete `{.path}` token starting at `start`
fn find_token(buffer: &[u8], start: usize) -> Option<usize> {
    if buffer.get(start) != Some(&b'{') || buffer.get(start + 1) != Some(&b'.') {
        return None;
    }
    buffer[start + 2..]
        .iter()
        .position(|&b| b == b'}')
        .map(|pos| start + 2 + pos + 1)
}

/// Leading numeric prefix as float; anything unparsable is 0
fn to_float(s: &str) -> f64 {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| {
            !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0))
        })
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse::<f64>().unwrap_or(0.0)
}

fn combine(op: u8, lhs: f64, rhs: f64) -> String {
    let result = match op {
        b'*' => lhs * rhs,
        b'/' if rhs.abs() > 0.0 => lhs / rhs,
        b'/' => return "0".to_string(),
        b'+' => lhs + rhs,
        _ => lhs - rhs,
    };
    format!("{:.0}", result)
}
