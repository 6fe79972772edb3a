// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Render u64 values through printf-style format specifications.
// Author: Lukas Bower

//! printf-style rendering for a single `u64` argument.
//!
//! A specification holds literal text and exactly one integer conversion,
//! e.g. `"addr=%#018llx\n"`. Supported conversions are `u`, `d`, `i`, `x`,
//! `X` and `o` with optional `l`/`ll`/`z`/`j` length modifiers, the `#`, `0`
//! and `-` flags, a field width and a precision. `%%` is a literal percent.

use std::fmt::{self, Write};

use synthfs::FsError;
use thiserror::Error;

/// Reasons a format specification is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The specification has no conversion.
    #[error("format '{0}' has no integer conversion")]
    NoConversion(String),
    /// The specification has more than one conversion.
    #[error("format '{0}' has more than one conversion")]
    MultipleConversions(String),
    /// A conversion is malformed or unsupported.
    #[error("format '{spec}' has an unsupported conversion at byte {at}")]
    Unsupported {
        /// The offending specification.
        spec: String,
        /// Byte offset of the conversion.
        at: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Unsigned,
    Signed,
    Hex { upper: bool },
    Octal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Conversion {
    radix: Radix,
    alternate: bool,
    zero_pad: bool,
    left: bool,
    width: usize,
    precision: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Value(Conversion),
}

/// Parsed printf-style specification for one `u64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct U64Format {
    pieces: Vec<Piece>,
}

impl U64Format {
    /// Parse `spec`.
    pub fn parse(spec: &str) -> Result<Self, FormatError> {
        let bytes = spec.as_bytes();
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut conversions = 0usize;
        let mut i = 0usize;
        let mut run_start = 0usize;
        while i < bytes.len() {
            if bytes[i] != b'%' {
                i += 1;
                continue;
            }
            literal.push_str(&spec[run_start..i]);
            let at = i;
            i += 1;
            if bytes.get(i) == Some(&b'%') {
                literal.push('%');
                i += 1;
                run_start = i;
                continue;
            }
            let unsupported = || FormatError::Unsupported {
                spec: spec.to_owned(),
                at,
            };
            let mut conv = Conversion {
                radix: Radix::Unsigned,
                alternate: false,
                zero_pad: false,
                left: false,
                width: 0,
                precision: None,
            };
            while let Some(flag) = bytes.get(i) {
                match flag {
                    b'#' => conv.alternate = true,
                    b'0' => conv.zero_pad = true,
                    b'-' => conv.left = true,
                    _ => break,
                }
                i += 1;
            }
            conv.width = parse_number(bytes, &mut i).ok_or_else(unsupported)?;
            if bytes.get(i) == Some(&b'.') {
                i += 1;
                conv.precision = Some(parse_number(bytes, &mut i).ok_or_else(unsupported)?);
            }
            match bytes.get(i) {
                Some(b'l') => {
                    i += 1;
                    if bytes.get(i) == Some(&b'l') {
                        i += 1;
                    }
                }
                Some(b'z') | Some(b'j') => i += 1,
                _ => {}
            }
            conv.radix = match bytes.get(i) {
                Some(b'u') => Radix::Unsigned,
                Some(b'd') | Some(b'i') => Radix::Signed,
                Some(b'x') => Radix::Hex { upper: false },
                Some(b'X') => Radix::Hex { upper: true },
                Some(b'o') => Radix::Octal,
                _ => return Err(unsupported()),
            };
            i += 1;
            run_start = i;
            conversions += 1;
            if conversions > 1 {
                return Err(FormatError::MultipleConversions(spec.to_owned()));
            }
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Value(conv));
        }
        literal.push_str(&spec[run_start..]);
        if conversions == 0 {
            return Err(FormatError::NoConversion(spec.to_owned()));
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(Self { pieces })
    }

    /// Write the rendering of `value` into `out`.
    pub fn render_into<W: Write>(&self, value: u64, out: &mut W) -> fmt::Result {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.write_str(text)?,
                Piece::Value(conv) => render_value(conv, value, out)?,
            }
        }
        Ok(())
    }

    /// Measure the rendering of `value` without allocating.
    #[must_use]
    pub fn measure(&self, value: u64) -> usize {
        let mut probe = Probe(0);
        // Probe never fails.
        let _ = self.render_into(value, &mut probe);
        probe.0
    }

    /// Render `value` into a scratch string sized exactly by a first
    /// measuring pass.
    pub fn render(&self, value: u64) -> Result<String, FsError> {
        let len = self.measure(value);
        let mut scratch = String::new();
        scratch
            .try_reserve_exact(len)
            .map_err(|_| FsError::OutOfMemory)?;
        self.render_into(value, &mut scratch)
            .map_err(|_| FsError::OutOfMemory)?;
        Ok(scratch)
    }
}

struct Probe(usize);

impl Write for Probe {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

fn parse_number(bytes: &[u8], i: &mut usize) -> Option<usize> {
    let mut value = 0usize;
    while let Some(digit) = bytes.get(*i).filter(|b| b.is_ascii_digit()) {
        value = value
            .checked_mul(10)?
            .checked_add(usize::from(digit - b'0'))?;
        *i += 1;
    }
    Some(value)
}

/// Digits of `value` in `radix`, most significant first.
fn digits(mut value: u64, base: u64, upper: bool, buf: &mut [u8; 24]) -> &[u8] {
    let table: &[u8; 16] = if upper {
        b"0123456789ABCDEF"
    } else {
        b"0123456789abcdef"
    };
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = table[(value % base) as usize];
        value /= base;
        if value == 0 {
            break;
        }
    }
    &buf[start..]
}

fn pad<W: Write>(out: &mut W, ch: char, count: usize) -> fmt::Result {
    for _ in 0..count {
        out.write_char(ch)?;
    }
    Ok(())
}

fn render_value<W: Write>(conv: &Conversion, value: u64, out: &mut W) -> fmt::Result {
    let (negative, magnitude) = match conv.radix {
        Radix::Signed => {
            let signed = value as i64;
            (signed < 0, signed.unsigned_abs())
        }
        _ => (false, value),
    };
    let (base, upper) = match conv.radix {
        Radix::Unsigned | Radix::Signed => (10, false),
        Radix::Hex { upper } => (16, upper),
        Radix::Octal => (8, false),
    };
    let mut buf = [0u8; 24];
    let mut body: &[u8] = digits(magnitude, base, upper, &mut buf);
    // printf prints nothing for a zero value with an explicit zero precision.
    if conv.precision == Some(0) && magnitude == 0 {
        body = &[];
    }
    let mut leading_zeros = conv
        .precision
        .map(|p| p.saturating_sub(body.len()))
        .unwrap_or(0);
    let prefix: &str = match conv.radix {
        Radix::Hex { upper } if conv.alternate && magnitude != 0 => {
            if upper {
                "0X"
            } else {
                "0x"
            }
        }
        Radix::Octal if conv.alternate && leading_zeros == 0 && body.first() != Some(&b'0') => {
            leading_zeros = 1;
            ""
        }
        _ => "",
    };
    let sign = if negative { "-" } else { "" };
    let used = sign.len() + prefix.len() + leading_zeros + body.len();
    let fill = conv.width.saturating_sub(used);

    if conv.left {
        out.write_str(sign)?;
        out.write_str(prefix)?;
        pad(out, '0', leading_zeros)?;
        out.write_str(std::str::from_utf8(body).map_err(|_| fmt::Error)?)?;
        return pad(out, ' ', fill);
    }
    if conv.zero_pad && conv.precision.is_none() {
        out.write_str(sign)?;
        out.write_str(prefix)?;
        pad(out, '0', fill + leading_zeros)?;
    } else {
        pad(out, ' ', fill)?;
        out.write_str(sign)?;
        out.write_str(prefix)?;
        pad(out, '0', leading_zeros)?;
    }
    out.write_str(std::str::from_utf8(body).map_err(|_| fmt::Error)?)
}
