//! Java tokenizer using nom
//!
//! Produces a flat token list. Whitespace and comments are not tokens, but
//! every token keeps the trivia slice in front of it so the parser can
//! recover blank-line layout and attach leading comments.
//!
//! ```ebnf
//! tokens     = {trivia, token}, trivia;
//! trivia     = {whitespace | line_comment | block_comment};
//! token      = identifier | number | string | char | punctuation;
//! identifier = (letter | "_" | "$"), {letter | digit | "_" | "$"};
//! number     = digit, {letter | digit | "_" | "."};
//! string     = '"', {char_except_quote | escape}, '"';
//! char       = "'", {char_except_quote | escape}, "'";
//! ```
//!
//! `>>` and `>>>` are never produced: the parser joins adjacent `>` tokens
//! when it reads a shift operator, which keeps `List<List<String>>` simple.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{digit1, multispace1, not_line_ending, satisfy},
    combinator::{map, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{pair, tuple},
};

use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the token in the source
    pub offset: usize,
    /// Line breaks between the previous token and this one
    pub newlines_before: usize,
    /// Whitespace and comments between the previous token and this one
    pub trivia: &'a str,
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Comments in front of this token, in source order
    pub fn comments(&self) -> Vec<&'a str> {
        comments_in(self.trivia)
            .into_iter()
            .map(|(_, comment)| comment)
            .collect()
    }

    /// Empty lines in front of this token, or in front of its first comment
    pub fn blank_lines_before(&self) -> usize {
        let leading = match comments_in(self.trivia).first() {
            Some((start, _)) => &self.trivia[..*start],
            None => self.trivia,
        };
        leading.matches('\n').count().saturating_sub(1)
    }
}

const PUNCTUATION: &[&str] = &[
    ">>>=", "<<=", ">>=", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=", ">=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", "(", ")", "{", "}", "[", "]", ";",
    ",", ".", "@", "=", ">", "<", "!", "~", "?", ":", "+", "-", "*", "/", "&", "|", "^", "%",
];

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), not_line_ending))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn trivia(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((multispace1, line_comment, block_comment))))(input)
}

/// Comments of a trivia slice with their offsets, trailing blanks trimmed
fn comments_in(trivia: &str) -> Vec<(usize, &str)> {
    let mut comments = Vec::new();
    let mut rest = trivia;
    while !rest.is_empty() {
        if let Ok((next, comment)) = alt((line_comment, block_comment))(rest) {
            comments.push((trivia.len() - rest.len(), comment.trim_end()));
            rest = next;
        } else if let Ok((next, _)) = multispace1::<&str, Error<&str>>(rest) {
            rest = next;
        } else {
            break;
        }
    }
    comments
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        digit1,
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    ))(input)
}

/// Quoted literal with backslash escapes, kept verbatim including quotes
fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let mut chars = input.char_indices();
        match chars.next() {
            Some((_, c)) if c == quote => {}
            _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
        }
        let mut escaped = false;
        for (i, c) in chars {
            match c {
                '\\' if !escaped => escaped = true,
                '\n' => break,
                c if c == quote && !escaped => {
                    let end = i + c.len_utf8();
                    return Ok((&input[end..], &input[..end]));
                }
                _ => escaped = false,
            }
        }
        Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
    }
}

fn punctuation(input: &str) -> IResult<&str, &str> {
    for punct in PUNCTUATION {
        if input.starts_with(punct) {
            return Ok((&input[punct.len()..], &input[..punct.len()]));
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}

fn token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(identifier, |text| (TokenKind::Ident, text)),
        map(number, |text| (TokenKind::Number, text)),
        map(quoted('"'), |text| (TokenKind::Str, text)),
        map(quoted('\''), |text| (TokenKind::Char, text)),
        map(punctuation, |text| (TokenKind::Punct, text)),
    ))(input)
}

/// Tokenize a complete source text; the last token is always `Eof`
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    loop {
        let (after_trivia, skipped) = match trivia(rest) {
            Ok(parsed) => parsed,
            Err(_) => (rest, ""),
        };
        rest = after_trivia;
        let offset = source.len() - rest.len();
        let newlines_before = skipped.matches('\n').count();

        if rest.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: "",
                offset,
                newlines_before,
                trivia: skipped,
            });
            return Ok(tokens);
        }

        if rest.starts_with("/*") {
            return Err(ParseError::lex(source, offset, "unterminated block comment"));
        }

        match token(rest) {
            Ok((next, (kind, text))) => {
                tokens.push(Token {
                    kind,
                    text,
                    offset,
                    newlines_before,
                    trivia: skipped,
                });
                rest = next;
            }
            Err(_) => {
                let found = rest.chars().next().unwrap_or_default();
                return Err(ParseError::lex(
                    source,
                    offset,
                    format!("unexpected character {found:?}"),
                ));
            }
        }
    }
}
