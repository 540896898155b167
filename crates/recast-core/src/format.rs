/*!
# Layout Formatting

Blank-line normalization run after a rewrite. Only the spacing between
members and imports is decided here; indentation and spacing inside a line
are fixed by the printer, and leading comments stay with their node.
*/

use crate::ast::{ClassDecl, Import, Member};
use crate::imports::ImportGroup;

pub trait Formatter: Send + Sync {
    fn format_class(&self, class: ClassDecl) -> ClassDecl;

    fn format_imports(&self, imports: Vec<Import>) -> Vec<Import>;
}

/// Default layout rules:
/// no blank line before the first member or between consecutive fields,
/// one blank line before every other member, one between import groups
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoFormat;

impl AutoFormat {
    fn blank_lines_before(previous: Option<&Member>, member: &Member) -> u8 {
        match previous {
            None => 0,
            Some(prev) if prev.is_field() && member.is_field() => 0,
            Some(_) => 1,
        }
    }
}

impl Formatter for AutoFormat {
    fn format_class(&self, class: ClassDecl) -> ClassDecl {
        let ClassDecl { body, .. } = class;
        let mut formatted: Vec<Member> = Vec::with_capacity(body.len());

        for member in body {
            let member = match member {
                Member::Class(inner) => Member::Class(self.format_class(inner)),
                other => other,
            };
            let blank_lines = Self::blank_lines_before(formatted.last(), &member);
            formatted.push(member.with_blank_lines(blank_lines));
        }

        ClassDecl {
            body: formatted,
            ..class
        }
    }

    fn format_imports(&self, imports: Vec<Import>) -> Vec<Import> {
        let mut previous: Option<ImportGroup> = None;
        imports
            .into_iter()
            .map(|import| {
                let group = ImportGroup::of(&import);
                let blank_lines = match previous {
                    Some(prev) if prev != group => 1,
                    _ => 0,
                };
                previous = Some(group);
                import.with_blank_lines(blank_lines)
            })
            .collect()
    }
}
