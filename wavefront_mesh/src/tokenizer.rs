//! Splits OBJ/MTL lines into a directive and its argument tokens.

use crate::{IoError, ParseError, ParseErrorKind, ReferenceError, Result};

use std::io::{prelude::*, BufReader};

use log::trace;

/// A directive keyword family, tested against each line in `PRIORITY` order.
pub(crate) trait Directive: Copy + 'static {
    /// Directives in matching order; the first match wins.
    const PRIORITY: &'static [Self];

    /// The keyword which starts the line.
    fn keyword(self) -> &'static str;
}

/// Directives understood in an OBJ file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjDirective {
    /// `g`
    Group,

    /// `vt`
    VertexTexcoord,

    /// `vn`
    VertexNormal,

    /// `v`
    Vertex,

    /// `f`
    Face,

    /// `mtllib`
    MaterialLib,

    /// `usemtl`
    UseMaterial,
}

impl Directive for ObjDirective {
    const PRIORITY: &'static [ObjDirective] = &[
        ObjDirective::Group,
        ObjDirective::VertexTexcoord,
        ObjDirective::VertexNormal,
        ObjDirective::Vertex,
        ObjDirective::Face,
        ObjDirective::MaterialLib,
        ObjDirective::UseMaterial,
    ];

    fn keyword(self) -> &'static str {
        match self {
            ObjDirective::Group => "g",
            ObjDirective::VertexTexcoord => "vt",
            ObjDirective::VertexNormal => "vn",
            ObjDirective::Vertex => "v",
            ObjDirective::Face => "f",
            ObjDirective::MaterialLib => "mtllib",
            ObjDirective::UseMaterial => "usemtl",
        }
    }
}

/// Directives understood in an MTL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MtlDirective {
    /// `newmtl`
    NewMaterial,

    /// `Ka`
    Ambient,

    /// `Kd`
    Diffuse,

    /// `Ks`
    Specular,

    /// `Ns`
    SpecularPower,
}

impl Directive for MtlDirective {
    const PRIORITY: &'static [MtlDirective] = &[
        MtlDirective::NewMaterial,
        MtlDirective::Ambient,
        MtlDirective::Diffuse,
        MtlDirective::Specular,
        MtlDirective::SpecularPower,
    ];

    fn keyword(self) -> &'static str {
        match self {
            MtlDirective::NewMaterial => "newmtl",
            MtlDirective::Ambient => "Ka",
            MtlDirective::Diffuse => "Kd",
            MtlDirective::Specular => "Ks",
            MtlDirective::SpecularPower => "Ns",
        }
    }
}

/// Finds the directive of a line and returns it with the remaining tokens.
///
/// A keyword only matches when it is followed by whitespace or the end of
/// the line, so `v` never swallows `vn`/`vt` and `g` never matches `gx`.
/// Lines matching nothing (comments, blanks, unsupported keywords) yield `None`.
pub(crate) fn tokenize<D: Directive>(line: &str) -> Option<(D, Vec<&str>)> {
    let line = line.trim();
    for &directive in D::PRIORITY {
        let rest = match line.strip_prefix(directive.keyword()) {
            Some(rest) => rest,
            None => continue,
        };
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Some((directive, rest.split_whitespace().collect()));
        }
    }

    None
}

/// Position of a line being processed, used to build errors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub location: &'a str,
    pub number: usize,
    pub content: &'a str,
}

impl<'a> Line<'a> {
    pub fn parse_error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            location: self.location.to_owned(),
            line: self.number,
            content: self.content.trim().to_owned(),
            kind,
        }
    }

    pub fn reference_error(&self, name: &str) -> ReferenceError {
        ReferenceError {
            location: self.location.to_owned(),
            line: self.number,
            name: name.to_owned(),
        }
    }
}

/// Reads the stream line by line and feeds every recognized directive to `handler`.
/// The reader will be wrapped with `BufReader`, so you don't have to do so.
pub(crate) fn read_directives<D: Directive>(
    location: &str,
    reader: impl Read,
    mut handler: impl FnMut(D, &Line, &[&str]) -> Result<()>,
) -> Result<()> {
    let mut reader = BufReader::new(reader);

    let mut line_buffer = Vec::with_capacity(1024);
    let mut number = 0;
    loop {
        line_buffer.clear();
        let read_size = reader
            .read_until(b'\n', &mut line_buffer)
            .map_err(|source| IoError {
                location: location.to_owned(),
                source,
            })?;
        if read_size == 0 {
            break;
        }
        number += 1;

        // Malformed UTF-8 becomes U+FFFD.
        let content = String::from_utf8_lossy(&line_buffer);
        let line = Line {
            location,
            number,
            content: &content,
        };
        match tokenize::<D>(&content) {
            Some((directive, tokens)) => handler(directive, &line, &tokens)?,
            None => trace!("Ignored {}:{}: {}", location, number, content.trim()),
        }
    }

    Ok(())
}

/// Parses the first `N` tokens as floats.
pub(crate) fn take_floats<const N: usize>(line: &Line, tokens: &[&str]) -> Result<[f32; N], ParseError> {
    if tokens.len() < N {
        return Err(line.parse_error(ParseErrorKind::NotEnoughData {
            found: tokens.len(),
            expected: N,
        }));
    }

    let mut values = [0.0; N];
    for (value, token) in values.iter_mut().zip(tokens) {
        *value = token
            .parse()
            .map_err(|_| line.parse_error(ParseErrorKind::InvalidNumber((*token).to_owned())))?;
    }
    Ok(values)
}

/// Takes the first token, which names something (a material, a group, a file).
pub(crate) fn take_name<'t>(line: &Line, tokens: &[&'t str]) -> Result<&'t str, ParseError> {
    tokens.first().copied().ok_or_else(|| {
        line.parse_error(ParseErrorKind::NotEnoughData {
            found: 0,
            expected: 1,
        })
    })
}
