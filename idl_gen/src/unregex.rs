/* Regex inversion: manufacture one concrete string matching a pattern.
 *
 * The IDL constrains string fields with regular expressions; the test
 * synthesizer needs witness values for them. This is not a general solver:
 * alternations always take the first branch, classes emit their first
 * allowed character, and lookaround is approximated by emitting nothing.
 * Anything outside the supported subset fails loudly rather than silently
 * producing a string that may not match.
 *
 * The pattern parser is hand-rolled because the patterns use back-references,
 * which the regex-syntax HIR rejects by design.
 */

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnregexError {
    #[error("unsupported regex construct at byte {pos}: {what}")]
    Unsupported { pos: usize, what: String },

    #[error("unbalanced {what} at byte {pos}")]
    Unbalanced { pos: usize, what: &'static str },

    #[error("invalid repetition bounds at byte {pos}")]
    BadRepeat { pos: usize },

    #[error("back-reference to undefined group {0}")]
    UnknownGroupRef(u32),

    #[error("negated class rejects every printable character")]
    EmptyNegatedClass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// `.` — emitted as a fixed placeholder character.
    Any,
    /// `^`, `$`, `\b`, `\B` — contribute nothing to the witness.
    Anchor,
    Class { negated: bool, items: Vec<ClassItem> },
    Category(Category),
    Group {
        index: Option<u32>,
        tokens: Vec<Token>,
    },
    Backref(u32),
    Alternation(Vec<Vec<Token>>),
    Repeat {
        min: u32,
        max: Option<u32>,
        token: Box<Token>,
    },
    /// `(?=...)`, `(?!...)`, `(?<=...)`, `(?<!...)` — best-effort: emit nothing.
    Lookaround,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
    Category(Category),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Word,
    Digit,
    Space,
}

impl Category {
    fn representative(self) -> char {
        match self {
            Category::Word => 'A',
            Category::Digit => '0',
            Category::Space => ' ',
        }
    }

    fn contains(self, c: char) -> bool {
        match self {
            Category::Word => c.is_ascii_alphanumeric() || c == '_',
            Category::Digit => c.is_ascii_digit(),
            Category::Space => c.is_whitespace(),
        }
    }
}

/// Generates a minimal string matching a regex, optionally padding repeated
/// subpatterns toward a requested minimum length (best effort: repetitions
/// are expanded up to their maximum allowed count, never beyond).
pub struct Unregex {
    tokens: Vec<Token>,
    min_len: Option<usize>,
}

impl Unregex {
    pub fn new(pattern: &str, min_len: Option<usize>) -> Result<Self, UnregexError> {
        let tokens = Parser::new(pattern).parse()?;
        Ok(Self { tokens, min_len })
    }

    pub fn generate(&self) -> Result<String, UnregexError> {
        let mut groups = HashMap::new();
        generate_tokens(&self.tokens, &mut groups, self.min_len)
    }
}

fn generate_tokens(
    tokens: &[Token],
    groups: &mut HashMap<u32, String>,
    min_len: Option<usize>,
) -> Result<String, UnregexError> {
    let mut result = String::new();
    for token in tokens {
        match token {
            Token::Literal(c) => result.push(*c),
            Token::Any => result.push('*'),
            Token::Anchor | Token::Lookaround => {}
            Token::Class { negated, items } => {
                result.push(class_representative(*negated, items)?);
            }
            Token::Category(cat) => result.push(cat.representative()),
            Token::Group { index, tokens } => {
                let sub = generate_tokens(tokens, groups, min_len)?;
                if let Some(i) = index {
                    groups.insert(*i, sub.clone());
                }
                result.push_str(&sub);
            }
            Token::Backref(i) => {
                let sub = groups.get(i).ok_or(UnregexError::UnknownGroupRef(*i))?;
                result.push_str(sub);
            }
            Token::Alternation(branches) => {
                // Always the first branch; the parser guarantees at least one.
                result.push_str(&generate_tokens(&branches[0], groups, min_len)?);
            }
            Token::Repeat { min, max, token } => {
                let n = match min_len {
                    Some(requested) => {
                        let requested = u32::try_from(requested).unwrap_or(u32::MAX);
                        (*min).max(requested.min(max.unwrap_or(requested)))
                    }
                    None => *min,
                };
                if n > 0 {
                    let sub = generate_tokens(std::slice::from_ref(token), groups, min_len)?;
                    for _ in 0..n {
                        result.push_str(&sub);
                    }
                }
            }
        }
    }
    Ok(result)
}

fn class_representative(negated: bool, items: &[ClassItem]) -> Result<char, UnregexError> {
    if !negated {
        return match items.first() {
            Some(ClassItem::Char(c)) => Ok(*c),
            Some(ClassItem::Range(lo, _)) => Ok(*lo),
            Some(ClassItem::Category(cat)) => Ok(cat.representative()),
            None => Err(UnregexError::EmptyNegatedClass),
        };
    }
    // First printable, non-whitespace character outside the rejection set,
    // in a fixed candidate order so output is deterministic.
    let rejected = |c: char| {
        items.iter().any(|item| match item {
            ClassItem::Char(r) => *r == c,
            ClassItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
            ClassItem::Category(cat) => cat.contains(c),
        })
    };
    ('0'..='9')
        .chain('a'..='z')
        .chain('A'..='Z')
        .chain("!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".chars())
        .find(|&c| !rejected(c))
        .ok_or(UnregexError::EmptyNegatedClass)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    next_group: u32,
}

impl Parser {
    fn new(pattern: &str) -> Self {
        Self {
            chars: pattern.chars().collect(),
            pos: 0,
            next_group: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unsupported(&self, what: impl Into<String>) -> UnregexError {
        UnregexError::Unsupported {
            pos: self.pos,
            what: what.into(),
        }
    }

    fn parse(mut self) -> Result<Vec<Token>, UnregexError> {
        let tokens = self.parse_alternation()?;
        if self.pos != self.chars.len() {
            // A stray ')' is the only way to stop early.
            return Err(UnregexError::Unbalanced {
                pos: self.pos,
                what: "group",
            });
        }
        Ok(tokens)
    }

    /// alternation := concat ('|' concat)*
    fn parse_alternation(&mut self) -> Result<Vec<Token>, UnregexError> {
        let first = self.parse_concat()?;
        if self.peek() != Some('|') {
            return Ok(first);
        }
        let mut branches = vec![first];
        while self.eat('|') {
            branches.push(self.parse_concat()?);
        }
        Ok(vec![Token::Alternation(branches)])
    }

    fn parse_concat(&mut self) -> Result<Vec<Token>, UnregexError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            self.pos += 1;
            let atom = self.parse_atom(c)?;
            tokens.push(self.parse_quantifier(atom)?);
        }
        Ok(tokens)
    }

    /// Parse one atom whose first character `c` has already been consumed.
    fn parse_atom(&mut self, c: char) -> Result<Token, UnregexError> {
        let start = self.pos - 1;
        match c {
            '.' => Ok(Token::Any),
            '^' | '$' => Ok(Token::Anchor),
            '[' => self.parse_class(),
            '(' => self.parse_group(),
            '\\' => self.parse_escape(),
            '*' | '+' | '?' => Err(UnregexError::BadRepeat { pos: start }),
            _ => Ok(Token::Literal(c)),
        }
    }

    fn parse_quantifier(&mut self, atom: Token) -> Result<Token, UnregexError> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, None)
            }
            Some('+') => {
                self.pos += 1;
                (1, None)
            }
            Some('?') => {
                self.pos += 1;
                (0, Some(1))
            }
            Some('{') => {
                let save = self.pos;
                self.pos += 1;
                match self.parse_braced_bounds() {
                    Some(bounds) => bounds,
                    None => {
                        // Not a repetition; '{' is a literal and the atom
                        // stands on its own.
                        self.pos = save;
                        return Ok(atom);
                    }
                }
            }
            _ => return Ok(atom),
        };
        // Lazy quantifiers generate the same witness as greedy ones.
        self.eat('?');
        if let Some(max) = max {
            if max < min {
                return Err(UnregexError::BadRepeat { pos: self.pos });
            }
        }
        Ok(Token::Repeat {
            min,
            max,
            token: Box::new(atom),
        })
    }

    /// Bounds inside `{...}`: `{m}`, `{m,}`, `{m,n}`. Returns None if the
    /// brace content is not a valid repetition (then `{` is a literal).
    fn parse_braced_bounds(&mut self) -> Option<(u32, Option<u32>)> {
        let min = self.parse_number()?;
        if self.eat('}') {
            return Some((min, Some(min)));
        }
        if !self.eat(',') {
            return None;
        }
        if self.eat('}') {
            return Some((min, None));
        }
        let max = self.parse_number()?;
        if self.eat('}') {
            Some((min, Some(max)))
        } else {
            None
        }
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }

    fn parse_group(&mut self) -> Result<Token, UnregexError> {
        let mut index = None;
        let mut lookaround = false;
        if self.eat('?') {
            match self.peek() {
                Some(':') => {
                    self.pos += 1;
                }
                Some('=') | Some('!') => {
                    self.pos += 1;
                    lookaround = true;
                }
                Some('<') if matches!(self.chars.get(self.pos + 1), Some('=') | Some('!')) => {
                    self.pos += 2;
                    lookaround = true;
                }
                _ => return Err(self.unsupported("extended group syntax")),
            }
        } else {
            index = Some(self.next_group);
            self.next_group += 1;
        }
        let tokens = self.parse_alternation()?;
        if !self.eat(')') {
            return Err(UnregexError::Unbalanced {
                pos: self.pos,
                what: "group",
            });
        }
        if lookaround {
            Ok(Token::Lookaround)
        } else {
            Ok(Token::Group { index, tokens })
        }
    }

    fn parse_escape(&mut self) -> Result<Token, UnregexError> {
        let c = self
            .bump()
            .ok_or(UnregexError::Unbalanced {
                pos: self.pos,
                what: "escape",
            })?;
        match c {
            'd' => Ok(Token::Category(Category::Digit)),
            'w' => Ok(Token::Category(Category::Word)),
            's' => Ok(Token::Category(Category::Space)),
            'b' | 'B' | 'A' | 'Z' | 'z' => Ok(Token::Anchor),
            'n' => Ok(Token::Literal('\n')),
            'r' => Ok(Token::Literal('\r')),
            't' => Ok(Token::Literal('\t')),
            '1'..='9' => Ok(Token::Backref(c as u32 - '0' as u32)),
            'D' | 'W' | 'S' => Err(self.unsupported(format!("negated category \\{}", c))),
            _ if c.is_ascii_alphanumeric() => {
                Err(self.unsupported(format!("escape \\{}", c)))
            }
            _ => Ok(Token::Literal(c)),
        }
    }

    fn parse_class(&mut self) -> Result<Token, UnregexError> {
        let negated = self.eat('^');
        let mut items = Vec::new();
        // ']' right after the opener (or '^') is a literal.
        if self.eat(']') {
            items.push(ClassItem::Char(']'));
        }
        loop {
            let c = self.bump().ok_or(UnregexError::Unbalanced {
                pos: self.pos,
                what: "character class",
            })?;
            if c == ']' {
                break;
            }
            let lo = if c == '\\' {
                match self.parse_escape()? {
                    Token::Literal(l) => l,
                    Token::Category(cat) => {
                        items.push(ClassItem::Category(cat));
                        continue;
                    }
                    _ => return Err(self.unsupported("escape inside character class")),
                }
            } else {
                c
            };
            if self.peek() == Some('-') && self.chars.get(self.pos + 1) != Some(&']') {
                self.pos += 1; // consume '-'
                let hi = self.bump().ok_or(UnregexError::Unbalanced {
                    pos: self.pos,
                    what: "character class",
                })?;
                let hi = if hi == '\\' {
                    match self.parse_escape()? {
                        Token::Literal(l) => l,
                        _ => return Err(self.unsupported("range bound escape")),
                    }
                } else {
                    hi
                };
                items.push(ClassItem::Range(lo, hi));
            } else {
                items.push(ClassItem::Char(lo));
            }
        }
        Ok(Token::Class { negated, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invert(pattern: &str, min_len: Option<usize>) -> String {
        Unregex::new(pattern, min_len).unwrap().generate().unwrap()
    }

    #[test]
    fn literals_and_anchors() {
        assert_eq!(invert("^abc$", None), "abc");
        assert_eq!(invert(r"a\.b", None), "a.b");
    }

    #[test]
    fn class_range_with_min_length() {
        // Three characters drawn from a-c only.
        assert_eq!(invert("[a-c]{3}", Some(3)), "aaa");
    }

    #[test]
    fn repetition_counts() {
        assert_eq!(invert("a*", None), "");
        assert_eq!(invert("a+", None), "a");
        assert_eq!(invert("a?", None), "");
        assert_eq!(invert("a{2,4}", None), "aa");
        // Padding toward a requested length is capped at the max repeat.
        assert_eq!(invert("a{2,4}", Some(10)), "aaaa");
        assert_eq!(invert("a*", Some(3)), "aaa");
    }

    #[test]
    fn alternation_takes_first_branch() {
        assert_eq!(invert("foo|bar|baz", None), "foo");
        assert_eq!(invert("(cat|dog)s", None), "cats");
    }

    #[test]
    fn groups_and_backrefs() {
        assert_eq!(invert(r"(ab)-\1", None), "ab-ab");
        assert_eq!(invert(r"(a(b))\2\1", None), "abbab");
        assert_eq!(invert("(?:xy)z", None), "xyz");
    }

    #[test]
    fn categories() {
        assert_eq!(invert(r"\d\w", None), "0A");
        assert_eq!(invert(r"id_\d{4}", None), "id_0000");
    }

    #[test]
    fn negated_class_picks_printable_outside_set() {
        assert_eq!(invert("[^a-z]", None), "0");
        assert_eq!(invert("[^0-9]", None), "a");
        assert_eq!(invert(r"[^\w]", None), "!");
    }

    #[test]
    fn lookaround_emits_nothing() {
        assert_eq!(invert("(?=x)ab", None), "ab");
        assert_eq!(invert("a(?!z)b", None), "ab");
        assert_eq!(invert("(?<=a)b", None), "b");
    }

    #[test]
    fn alternated_path_pattern() {
        let out = invert(r"(/(.|[\r\n])*)?|id:.*|(ns:[0-9]+(/.*)?)", None);
        // First branch, zero repeats of the optional tail.
        assert_eq!(out, "");
    }

    #[test]
    fn unsupported_constructs_fail_loudly() {
        assert!(Unregex::new(r"(?P<name>x)", None).is_err());
        assert!(Unregex::new(r"a\q", None).is_err());
        assert!(Unregex::new("(unclosed", None).is_err());
        assert!(matches!(
            Unregex::new("*oops", None),
            Err(UnregexError::BadRepeat { pos: 0 })
        ));
    }

    #[test]
    fn atoms_ending_at_the_input_boundary() {
        // Empty branches and empty groups leave no atom to parse.
        assert_eq!(invert("a|", None), "a");
        assert_eq!(invert("|a", None), "");
        assert_eq!(invert("()b", None), "b");
    }

    #[test]
    fn backref_to_undefined_group_fails() {
        let err = Unregex::new(r"\3", None).unwrap().generate();
        assert!(matches!(err, Err(UnregexError::UnknownGroupRef(3))));
    }
}
