//! Small `nom` parsers for the XML subset written by ANT-MOC
//!
//! ANT-MOC writes its `.vtu` reaction rate files by hand, with non-standard
//! attributes on the `Piece` element. Only the handful of constructs those
//! files use are supported: start tags with double or single quoted
//! attributes, self-closing tags, and element bodies without nesting of the
//! same element name.

// crate modules
use crate::utils::f;

// external crates
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_until, take_while1};
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::{map, value};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, separated_pair, terminated, tuple};
use nom::IResult;

/// Attributes of a tag, in the order written
pub type Attributes<'a> = Vec<(&'a str, &'a str)>;

/// One XML element found by [find_element]
#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    pub attributes: Attributes<'a>,
    /// Raw text between the start and end tags, empty if self-closing
    pub body: &'a str,
}

impl<'a> Element<'a> {
    /// Value of an attribute by exact name
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

/// Name of a tag or attribute, e.g. `NumberOfCellsXY`
pub fn xml_name(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))(i)
}

/// A quoted attribute value, either `"..."` or `'...'`
pub fn quoted(i: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
    ))(i)
}

/// A single `name="value"` pair preceded by whitespace
pub fn attribute(i: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        multispace1,
        separated_pair(xml_name, tuple((multispace0, char('='), multispace0)), quoted),
    )(i)
}

/// A start tag, returns the attributes and whether the tag self-closes
pub fn start_tag<'a>(name: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, (Attributes<'a>, bool)> {
    move |i| {
        let (i, _) = char('<')(i)?;
        let (i, _) = tag(name)(i)?;
        let (i, attributes) = many0(attribute)(i)?;
        let (i, closed) = preceded(
            multispace0,
            alt((value(true, tag("/>")), value(false, char('>')))),
        )(i)?;
        Ok((i, (attributes, closed)))
    }
}

/// An entire element at the start of the input
pub fn element<'a>(name: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, Element<'a>> {
    move |i| {
        let (i, (attributes, closed)) = start_tag(name)(i)?;
        if closed {
            return Ok((i, Element { attributes, body: "" }));
        }

        let end_tag = f!("</{name}>");
        let (i, body) = terminated(take_until(end_tag.as_str()), tag(end_tag.as_str()))(i)?;
        Ok((i, Element { attributes, body }))
    }
}

/// Next element of the given name anywhere in the input
///
/// Returns the element and the remaining input after it, or `None` if there
/// is no complete element left.
pub fn find_element<'a>(input: &'a str, name: &'a str) -> Option<(Element<'a>, &'a str)> {
    let opening = f!("<{name}");
    let mut search = input;

    while let Some(offset) = search.find(opening.as_str()) {
        let candidate = &search[offset..];
        match element(name)(candidate) {
            Ok((rest, element)) => return Some((element, rest)),
            // a longer tag name sharing the prefix, e.g. <PieceData
            Err(_) => search = &candidate[opening.len()..],
        }
    }
    None
}

/// Every element of the given name in the input, in document order
pub fn find_elements<'a>(input: &'a str, name: &'a str) -> Vec<Element<'a>> {
    let mut elements = Vec::new();
    let mut rest = input;
    while let Some((element, remaining)) = find_element(rest, name) {
        elements.push(element);
        rest = remaining;
    }
    elements
}

/// Whitespace separated extent, e.g. `51 51 45`
pub fn extent(i: &str) -> IResult<&str, [usize; 3]> {
    map(
        tuple((
            preceded(multispace0, nom::character::complete::u64),
            preceded(multispace1, nom::character::complete::u64),
            preceded(multispace1, nom::character::complete::u64),
        )),
        |(x, y, z)| [x as usize, y as usize, z as usize],
    )(i)
}
