use crate::render::{color, Align, Color};
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, BufRead};
use tracing::warn;

/// A text draw instruction
#[derive(Clone, Debug, PartialEq)]
pub struct TextElement {
    pub x: i32,
    pub y: i32,
    pub content: String,
    pub font: String,
    pub color: Color,
    pub align: Align,
    pub size: u16,
    pub bg: Color,
}

impl TextElement {
    /// Black, left-aligned text on white
    pub fn new(x: i32, y: i32, content: impl Into<String>, font: impl Into<String>) -> Self {
        Self {
            x,
            y,
            content: content.into(),
            font: font.into(),
            color: color::BLACK,
            align: Align::Left,
            size: 0,
            bg: color::WHITE,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn size(mut self, size: u16) -> Self {
        self.size = size;
        self
    }

    pub fn bg(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }
}

/// One entry of a draw-element array
#[derive(Clone, Debug, PartialEq)]
pub enum DrawElement {
    /// `{"text": [x, y, content, font, color, align, size, bgcolor]}`
    Text(TextElement),
    /// `{"box": [x, y, w, h, color]}`
    Box {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
    },
    /// `{"line": [x1, y1, x2, y2, color]}`
    Line {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
    },
    /// `{"triangle": [x1, y1, x2, y2, x3, y3, color]}`
    Triangle {
        points: [(i32, i32); 3],
        color: Color,
    },
}

impl DrawElement {
    /// Interpret a JSON element; unknown shapes yield `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        if let Some(Value::Array(a)) = obj.get("text") {
            let bg = str_at(a, 7);
            return Some(DrawElement::Text(TextElement {
                x: int_at(a, 0),
                y: int_at(a, 1),
                content: str_at(a, 2),
                font: str_at(a, 3),
                color: parse_color(&str_at(a, 4)),
                align: Align::from_datum(int_at(a, 5)),
                size: int_at(a, 6).max(0) as u16,
                bg: if bg.is_empty() {
                    color::WHITE
                } else {
                    parse_color(&bg)
                },
            }));
        }
        if let Some(Value::Array(a)) = obj.get("box") {
            return Some(DrawElement::Box {
                x: int_at(a, 0),
                y: int_at(a, 1),
                w: int_at(a, 2),
                h: int_at(a, 3),
                color: parse_color(&str_at(a, 4)),
            });
        }
        if let Some(Value::Array(a)) = obj.get("line") {
            return Some(DrawElement::Line {
                x1: int_at(a, 0),
                y1: int_at(a, 1),
                x2: int_at(a, 2),
                y2: int_at(a, 3),
                color: parse_color(&str_at(a, 4)),
            });
        }
        if let Some(Value::Array(a)) = obj.get("triangle") {
            return Some(DrawElement::Triangle {
                points: [
                    (int_at(a, 0), int_at(a, 1)),
                    (int_at(a, 2), int_at(a, 3)),
                    (int_at(a, 4), int_at(a, 5)),
                ],
                color: parse_color(&str_at(a, 6)),
            });
        }
        None
    }
}

/// Color names and `#rrggbb` to RGB565; unknown values are white
pub fn parse_color(s: &str) -> Color {
    match s {
        "0" | "white" => color::WHITE,
        "1" | "" | "black" => color::BLACK,
        "2" | "red" => color::RED,
        hex if hex.len() == 7 && hex.starts_with('#') => {
            let channel = |i: usize| {
                hex.get(i..i + 2)
                    .and_then(|pair| u16::from_str_radix(pair, 16).ok())
            };
            match (channel(1), channel(3), channel(5)) {
                (Some(r), Some(g), Some(b)) => ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3),
                _ => color::WHITE,
            }
        }
        _ => color::WHITE,
    }
}

/// Decode a JSON array of draw elements one element at a time.
///
/// Each decoded element is handed to `sink` before the next one is read, so
/// memory stays bounded by the largest single element. A malformed element
/// ends decoding; elements already delivered stay delivered. Returns the
/// number of elements delivered.
pub fn decode_elements<R: BufRead>(mut reader: R, mut sink: impl FnMut(DrawElement)) -> io::Result<usize> {
    let mut skipped = Vec::new();
    reader.read_until(b'[', &mut skipped)?;
    if skipped.last() != Some(&b'[') {
        return Ok(0);
    }

    let mut count = 0;
    loop {
        skip_whitespace(&mut reader)?;
        match reader.fill_buf()?.first() {
            None | Some(b']') => break,
            Some(_) => {}
        }

        let parsed = {
            let mut de = serde_json::Deserializer::from_reader(&mut reader);
            Value::deserialize(&mut de)
        };
        let value = match parsed {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "json error in draw element stream");
                break;
            }
        };

        if let Some(element) = DrawElement::from_value(&value) {
            sink(element);
            count += 1;
        }

        if !find_until(&mut reader, b',', b']')? {
            break;
        }
    }

    Ok(count)
}

fn skip_whitespace<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (skip, done) = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            (skip, skip < buf.len())
        };
        reader.consume(skip);
        if done {
            return Ok(());
        }
    }
}

/// Consume through `target`, returning false if `terminator` or EOF comes first
fn find_until<R: BufRead>(reader: &mut R, target: u8, terminator: u8) -> io::Result<bool> {
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            return Ok(false);
        }
        if byte[0] == target {
            return Ok(true);
        }
        if byte[0] == terminator {
            return Ok(false);
        }
    }
}

fn int_at(a: &[Value], i: usize) -> i32 {
    match a.get(i) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0) as i32,
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as i32).unwrap_or(0),
        _ => 0,
    }
}

fn str_at(a: &[Value], i: usize) -> String {
    match a.get(i) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
