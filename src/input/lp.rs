//! Reader for problems in the LP text format.
//!
//! The supported subset is the one the experiment files actually use:
//! an objective section (`minimize`/`maximize` and their synonyms), `subject
//! to`, `bounds`, `general`, `binary` and `end`, with `\` comments. Section
//! keywords must appear on their own line; expressions may span lines within
//! a section. Constraint senses are `<=`, `>=` and `=` (single-character and
//! `=<`/`=>` spellings included).
use crate::problem::{ObjectiveSense, Problem};
use indexmap::IndexMap;
use std::io::BufRead;
use thiserror::Error;

/// An error raised while reading an LP file.
#[derive(Debug, Error)]
pub enum LpError {
    /// The underlying reader failed
    #[error("failed to read input")]
    Io(#[from] std::io::Error),
    /// A character outside the format's alphabet was found
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar {
        /// Line on which the character appears
        line: usize,
        /// The offending character
        ch: char,
    },
    /// A numeric literal could not be parsed
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber {
        /// Line on which the literal appears
        line: usize,
        /// The offending literal
        token: String,
    },
    /// A token appeared somewhere the grammar does not allow it
    #[error("line {line}: unexpected '{token}'")]
    UnexpectedToken {
        /// Line on which the token appears
        line: usize,
        /// Text of the offending token
        token: String,
    },
    /// The input ended in the middle of a statement
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// A statement appeared before the objective section
    #[error("line {line}: expected an objective section first")]
    ExpectedObjective {
        /// Line on which the statement appears
        line: usize,
    },
    /// The file contained no objective section
    #[error("no objective section found")]
    MissingObjective,
    /// A line in the bounds section was not a recognised bound form
    #[error("line {line}: malformed bound")]
    MalformedBound {
        /// Line on which the bound appears
        line: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Name(String),
    Number(f64),
    Plus,
    Minus,
    Le,
    Ge,
    Eq,
    Colon,
}

#[derive(Clone, Debug)]
struct Token {
    line: usize,
    kind: TokenKind,
}

impl Token {
    fn text(&self) -> String {
        match &self.kind {
            TokenKind::Name(name) => name.clone(),
            TokenKind::Number(value) => value.to_string(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Le => "<=".into(),
            TokenKind::Ge => ">=".into(),
            TokenKind::Eq => "=".into(),
            TokenKind::Colon => ":".into(),
        }
    }

    fn unexpected(&self) -> LpError {
        LpError::UnexpectedToken {
            line: self.line,
            token: self.text(),
        }
    }
}

/// The sections of an LP file.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Objective,
    Constraints,
    Bounds,
    General,
    Binary,
}

/// A recognised section keyword line.
enum Keyword {
    Objective(ObjectiveSense),
    Constraints,
    Bounds,
    General,
    Binary,
    End,
}

/// Read an LP-format problem from `reader`.
pub fn read_lp(reader: impl BufRead) -> Result<Problem, LpError> {
    let mut problem = Problem::default();
    let mut section = None;
    let mut objective_tokens = Vec::new();
    let mut constraint_tokens = Vec::new();
    let mut bound_lines: Vec<Vec<Token>> = Vec::new();
    let mut general_tokens = Vec::new();
    let mut binary_tokens = Vec::new();
    let mut seen_objective = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;

        // Strip comments before looking at the line at all
        let content = line.split('\\').next().unwrap_or_default();

        if let Some(keyword) = section_keyword(content) {
            section = match keyword {
                Keyword::Objective(sense) => {
                    problem.sense = sense;
                    seen_objective = true;
                    Some(Section::Objective)
                }
                Keyword::Constraints => Some(Section::Constraints),
                Keyword::Bounds => Some(Section::Bounds),
                Keyword::General => Some(Section::General),
                Keyword::Binary => Some(Section::Binary),
                Keyword::End => break,
            };
            continue;
        }

        let tokens = tokenize_line(content, line_no)?;
        if tokens.is_empty() {
            continue;
        }

        match section {
            None => return Err(LpError::ExpectedObjective { line: line_no }),
            Some(Section::Objective) => objective_tokens.extend(tokens),
            Some(Section::Constraints) => constraint_tokens.extend(tokens),
            // Bounds are line-oriented; integrality sections are name lists
            Some(Section::Bounds) => bound_lines.push(tokens),
            Some(Section::General) => general_tokens.extend(tokens),
            Some(Section::Binary) => binary_tokens.extend(tokens),
        }
    }

    if !seen_objective {
        return Err(LpError::MissingObjective);
    }

    // Parse the expressions first so that column order follows the objective
    // and constraints, as it would in the file's own declaration order
    parse_objective(&mut problem, &objective_tokens)?;
    parse_constraints(&mut problem, &constraint_tokens)?;

    for tokens in &bound_lines {
        apply_bound(&mut problem, tokens)?;
    }
    for token in &general_tokens {
        let name = expect_name(token)?;
        let column = problem.column_entry(name);
        problem.column_mut(column).is_integer = true;
    }
    for token in &binary_tokens {
        let name = expect_name(token)?;
        let column = problem.column_entry(name);
        let column = problem.column_mut(column);
        column.is_integer = true;
        (column.lower, column.upper) = (0.0, 1.0);
    }

    Ok(problem)
}

/// Recognise a section keyword on its own line
fn section_keyword(line: &str) -> Option<Keyword> {
    let lowered = line.trim().to_ascii_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");

    let keyword = match collapsed.as_str() {
        "minimize" | "minimum" | "min" => Keyword::Objective(ObjectiveSense::Minimise),
        "maximize" | "maximum" | "max" => Keyword::Objective(ObjectiveSense::Maximise),
        "subject to" | "such that" | "st" | "s.t." | "st." => Keyword::Constraints,
        "bounds" | "bound" => Keyword::Bounds,
        "general" | "generals" | "gen" => Keyword::General,
        "binary" | "binaries" | "bin" => Keyword::Binary,
        "end" => Keyword::End,
        _ => return None,
    };

    Some(keyword)
}

fn tokenize_line(content: &str, line: usize) -> Result<Vec<Token>, LpError> {
    let mut tokens = Vec::new();
    let mut chars = content.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match ch {
            '+' => {
                chars.next();
                TokenKind::Plus
            }
            '-' => {
                chars.next();
                TokenKind::Minus
            }
            ':' => {
                chars.next();
                TokenKind::Colon
            }
            '<' => {
                chars.next();
                chars.next_if(|&(_, c)| c == '=');
                TokenKind::Le
            }
            '>' => {
                chars.next();
                chars.next_if(|&(_, c)| c == '=');
                TokenKind::Ge
            }
            '=' => {
                chars.next();
                match chars.next_if(|&(_, c)| c == '<' || c == '>') {
                    Some((_, '<')) => TokenKind::Le,
                    Some(_) => TokenKind::Ge,
                    None => TokenKind::Eq,
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let end = scan_number(&mut chars);
                let token = &content[start..end];
                let value = token.parse().map_err(|_| LpError::InvalidNumber {
                    line,
                    token: token.to_string(),
                })?;
                TokenKind::Number(value)
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = start;
                while let Some(&(pos, c)) = chars.peek() {
                    if c.is_whitespace() || "+-<>=:\\".contains(c) {
                        break;
                    }
                    end = pos + c.len_utf8();
                    chars.next();
                }
                TokenKind::Name(content[start..end].to_string())
            }
            c => return Err(LpError::UnexpectedChar { line, ch: c }),
        };

        tokens.push(Token { line, kind });
    }

    Ok(tokens)
}

/// Consume a numeric literal, returning the byte offset one past its end
fn scan_number(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> usize {
    let mut end = 0;
    while let Some(&(pos, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            end = pos + 1;
            chars.next();
        } else if c == 'e' || c == 'E' {
            // Exponent: only consume if followed by a digit or sign
            let mut lookahead = chars.clone();
            lookahead.next();
            match lookahead.peek() {
                Some(&(_, next)) if next.is_ascii_digit() || next == '+' || next == '-' => {
                    chars.next();
                    end = pos + 1;
                    if let Some((sign_pos, _)) =
                        chars.next_if(|&(_, c)| c == '+' || c == '-')
                    {
                        end = sign_pos + 1;
                    }
                }
                _ => break,
            }
        } else {
            break;
        }
    }
    end
}

fn expect_name(token: &Token) -> Result<&str, LpError> {
    match &token.kind {
        TokenKind::Name(name) => Ok(name),
        _ => Err(token.unexpected()),
    }
}

fn is_infinity(name: &str) -> bool {
    name.eq_ignore_ascii_case("inf") || name.eq_ignore_ascii_case("infinity")
}

/// A linear expression: merged per-variable coefficients plus a constant term
struct Expression {
    terms: IndexMap<String, f64>,
    constant: f64,
}

/// Parse a linear expression, stopping at a comparison operator or the end of
/// the token stream.
fn parse_expression(tokens: &[Token], pos: &mut usize) -> Result<Expression, LpError> {
    let mut terms: IndexMap<String, f64> = IndexMap::new();
    let mut constant = 0.0;

    loop {
        match tokens.get(*pos).map(|t| &t.kind) {
            None | Some(TokenKind::Le | TokenKind::Ge | TokenKind::Eq) => break,
            _ => {}
        }

        let mut sign = 1.0;
        while let Some(token) = tokens.get(*pos) {
            match token.kind {
                TokenKind::Plus => {}
                TokenKind::Minus => sign = -sign,
                _ => break,
            }
            *pos += 1;
        }

        match tokens.get(*pos) {
            Some(Token {
                kind: TokenKind::Number(value),
                ..
            }) => {
                *pos += 1;
                if let Some(Token {
                    kind: TokenKind::Name(name),
                    ..
                }) = tokens.get(*pos)
                {
                    *terms.entry(name.clone()).or_insert(0.0) += sign * value;
                    *pos += 1;
                } else {
                    constant += sign * value;
                }
            }
            Some(Token {
                kind: TokenKind::Name(name),
                ..
            }) => {
                *terms.entry(name.clone()).or_insert(0.0) += sign;
                *pos += 1;
            }
            Some(token) => return Err(token.unexpected()),
            None => return Err(LpError::UnexpectedEnd),
        }
    }

    Ok(Expression { terms, constant })
}

/// Strip a leading `label:` if present
fn skip_label(tokens: &[Token], pos: &mut usize) -> Option<String> {
    if let (
        Some(Token {
            kind: TokenKind::Name(name),
            ..
        }),
        Some(Token {
            kind: TokenKind::Colon,
            ..
        }),
    ) = (tokens.get(*pos), tokens.get(*pos + 1))
    {
        let label = name.clone();
        *pos += 2;
        return Some(label);
    }

    None
}

fn parse_objective(problem: &mut Problem, tokens: &[Token]) -> Result<(), LpError> {
    let mut pos = 0;
    skip_label(tokens, &mut pos);

    let expression = parse_expression(tokens, &mut pos)?;
    if let Some(token) = tokens.get(pos) {
        // A comparison operator has no business in the objective
        return Err(token.unexpected());
    }

    for (name, coefficient) in expression.terms {
        let column = problem.column_entry(&name);
        problem.column_mut(column).cost += coefficient;
    }
    problem.objective_offset += expression.constant;

    Ok(())
}

fn parse_constraints(problem: &mut Problem, tokens: &[Token]) -> Result<(), LpError> {
    let mut pos = 0;

    while pos < tokens.len() {
        let label = skip_label(tokens, &mut pos);
        let expression = parse_expression(tokens, &mut pos)?;

        let operator = tokens.get(pos).ok_or(LpError::UnexpectedEnd)?;
        pos += 1;

        let rhs = parse_signed_number(tokens, &mut pos)? - expression.constant;
        let (lower, upper) = match operator.kind {
            TokenKind::Le => (f64::NEG_INFINITY, rhs),
            TokenKind::Ge => (rhs, f64::INFINITY),
            TokenKind::Eq => (rhs, rhs),
            _ => return Err(operator.unexpected()),
        };

        let name = label.unwrap_or_else(|| format!("c{}", problem.num_rows() + 1));
        let row = problem.add_row(name, lower, upper);
        for (name, coefficient) in expression.terms {
            let column = problem.column_entry(&name);
            problem.row_mut(row).terms.push((column, coefficient));
        }
    }

    Ok(())
}

fn parse_signed_number(tokens: &[Token], pos: &mut usize) -> Result<f64, LpError> {
    let mut sign = 1.0;
    while let Some(token) = tokens.get(*pos) {
        match token.kind {
            TokenKind::Plus => {}
            TokenKind::Minus => sign = -sign,
            _ => break,
        }
        *pos += 1;
    }

    match tokens.get(*pos) {
        Some(Token {
            kind: TokenKind::Number(value),
            ..
        }) => {
            *pos += 1;
            Ok(sign * value)
        }
        Some(token) => Err(token.unexpected()),
        None => Err(LpError::UnexpectedEnd),
    }
}

/// Parse a bound value: an optionally signed number, or an infinity keyword
fn parse_bound_value(tokens: &[Token], pos: &mut usize, line: usize) -> Result<f64, LpError> {
    let mut sign = 1.0;
    while let Some(token) = tokens.get(*pos) {
        match token.kind {
            TokenKind::Plus => {}
            TokenKind::Minus => sign = -sign,
            _ => break,
        }
        *pos += 1;
    }

    match tokens.get(*pos) {
        Some(Token {
            kind: TokenKind::Number(value),
            ..
        }) => {
            *pos += 1;
            Ok(sign * value)
        }
        Some(Token {
            kind: TokenKind::Name(name),
            ..
        }) if is_infinity(name) => {
            *pos += 1;
            Ok(sign * f64::INFINITY)
        }
        _ => Err(LpError::MalformedBound { line }),
    }
}

/// Apply one line from the bounds section.
///
/// Recognised forms: `x free`, `x <= u`, `x >= l`, `x = v`, `l <= x`,
/// `l <= x <= u`, and the `>=`-mirrored variants.
fn apply_bound(problem: &mut Problem, tokens: &[Token]) -> Result<(), LpError> {
    let line = tokens[0].line;
    let malformed = || LpError::MalformedBound { line };

    // Variable-first forms
    if let Some(Token {
        kind: TokenKind::Name(name),
        ..
    }) = tokens.first()
    {
        if !is_infinity(name) {
            let column = problem.column_entry(name);

            if let [_, Token {
                kind: TokenKind::Name(keyword),
                ..
            }] = tokens
            {
                if keyword.eq_ignore_ascii_case("free") {
                    let column = problem.column_mut(column);
                    (column.lower, column.upper) = (f64::NEG_INFINITY, f64::INFINITY);
                    return Ok(());
                }
                return Err(malformed());
            }

            let operator = tokens.get(1).ok_or_else(malformed)?;
            let mut pos = 2;
            let value = parse_bound_value(tokens, &mut pos, line)?;
            if pos != tokens.len() {
                return Err(malformed());
            }

            let column = problem.column_mut(column);
            match operator.kind {
                TokenKind::Le => column.upper = value,
                TokenKind::Ge => column.lower = value,
                TokenKind::Eq => (column.lower, column.upper) = (value, value),
                _ => return Err(malformed()),
            }
            return Ok(());
        }
    }

    // Value-first forms
    let mut pos = 0;
    let first = parse_bound_value(tokens, &mut pos, line)?;
    let operator = tokens.get(pos).ok_or_else(malformed)?;
    pos += 1;
    let name = tokens.get(pos).ok_or_else(malformed)?;
    let name = expect_name(name)?.to_string();
    pos += 1;

    let column = problem.column_entry(&name);
    match operator.kind {
        TokenKind::Le => problem.column_mut(column).lower = first,
        TokenKind::Ge => problem.column_mut(column).upper = first,
        _ => return Err(malformed()),
    }

    // Optional second half of a two-sided bound
    if pos < tokens.len() {
        let second_op = tokens.get(pos).ok_or_else(malformed)?;
        if second_op.kind != operator.kind {
            return Err(malformed());
        }
        pos += 1;
        let second = parse_bound_value(tokens, &mut pos, line)?;
        if pos != tokens.len() {
            return Err(malformed());
        }

        let column = problem.column_mut(column);
        match operator.kind {
            TokenKind::Le => column.upper = second,
            TokenKind::Ge => column.lower = second,
            _ => return Err(malformed()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(source: &str) -> Result<Problem, LpError> {
        read_lp(Cursor::new(source))
    }

    const PRODUCTION: &str = "\
\\ A production planning example
Maximize
 obj: 3 x + 5 y
Subject To
 c1: x <= 4
 c2: 2 y <= 12
 c3: 3 x + 2 y <= 18
Bounds
 0 <= x
 0 <= y
End
";

    #[test]
    fn test_read_production_problem() {
        let problem = parse(PRODUCTION).unwrap();

        assert_eq!(problem.sense, ObjectiveSense::Maximise);
        assert_eq!(problem.num_columns(), 2);
        assert_eq!(problem.num_rows(), 3);

        let columns: Vec<_> = problem.columns().collect();
        assert_eq!(columns[0].0, "x");
        assert_eq!(columns[0].1.cost, 3.0);
        assert_eq!(columns[1].0, "y");
        assert_eq!(columns[1].1.cost, 5.0);

        let c3 = &problem.rows()[2];
        assert_eq!(c3.name, "c3");
        assert_eq!((c3.lower, c3.upper), (f64::NEG_INFINITY, 18.0));
        assert_eq!(c3.terms, [(0, 3.0), (1, 2.0)]);
    }

    #[test]
    fn test_expressions_span_lines() {
        let problem = parse(
            "\
minimize
 2 x +
 3 y
subject to
 c1: x +
   y >= 10
end
",
        )
        .unwrap();

        assert_eq!(problem.num_rows(), 1);
        let c1 = &problem.rows()[0];
        assert_eq!((c1.lower, c1.upper), (10.0, f64::INFINITY));
        assert_eq!(c1.terms.len(), 2);
    }

    #[test]
    fn test_objective_constant_becomes_offset() {
        let problem = parse("min\n x + 7\nsubject to\n c1: x >= 1\nend\n").unwrap();
        assert_eq!(problem.objective_offset, 7.0);
    }

    #[test]
    fn test_repeated_terms_are_merged() {
        let problem = parse("min\n x + 2 x\nsubject to\n c1: x >= 1\nend\n").unwrap();
        let (_, column) = problem.columns().next().unwrap();
        assert_eq!(column.cost, 3.0);
    }

    #[test]
    fn test_bound_forms() {
        let problem = parse(
            "\
min
 a + b + c + d
subject to
 c1: a >= 0
bounds
 -1 <= a <= 4
 b free
 c >= -infinity
 d = 2.5
end
",
        )
        .unwrap();

        let columns: Vec<_> = problem.columns().map(|(_, col)| col.clone()).collect();
        assert_eq!((columns[0].lower, columns[0].upper), (-1.0, 4.0));
        assert_eq!(
            (columns[1].lower, columns[1].upper),
            (f64::NEG_INFINITY, f64::INFINITY)
        );
        assert_eq!(columns[2].lower, f64::NEG_INFINITY);
        assert_eq!((columns[3].lower, columns[3].upper), (2.5, 2.5));
    }

    #[test]
    fn test_binary_and_general_sections() {
        let problem = parse(
            "\
max
 x + y
subject to
 c1: x + y <= 5
general
 x
binary
 y
end
",
        )
        .unwrap();

        let columns: Vec<_> = problem.columns().map(|(_, col)| col.clone()).collect();
        assert!(columns[0].is_integer);
        assert_eq!(columns[0].upper, f64::INFINITY);
        assert!(columns[1].is_integer);
        assert_eq!((columns[1].lower, columns[1].upper), (0.0, 1.0));
    }

    #[test]
    fn test_unnamed_constraints_get_generated_names() {
        let problem = parse("min\n x\nsubject to\n x >= 1\n x <= 9\nend\n").unwrap();
        let names: Vec<_> = problem.rows().iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["c1", "c2"]);
    }

    #[test]
    fn test_statement_before_objective_is_rejected() {
        let err = parse("x + y\nmin\n x\nend\n").unwrap_err();
        assert!(matches!(err, LpError::ExpectedObjective { line: 1 }));
    }

    #[test]
    fn test_missing_objective_is_rejected() {
        let err = parse("\\ nothing here\n").unwrap_err();
        assert!(matches!(err, LpError::MissingObjective));
    }

    #[test]
    fn test_unexpected_character_is_reported() {
        let err = parse("min\n x * y\nend\n").unwrap_err();
        assert!(matches!(err, LpError::UnexpectedChar { line: 2, ch: '*' }));
    }

    #[test]
    fn test_malformed_bound_is_reported() {
        let err = parse("min\n x\nsubject to\n c1: x >= 1\nbounds\n x <=\nend\n").unwrap_err();
        assert!(matches!(err, LpError::MalformedBound { line: 6 }));
    }
}
