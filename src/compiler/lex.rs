use std::rc::Rc;

use crate::common::{
    diag::Reporter,
    source::Source,
    span::{Loc, Span},
};
use crate::compiler::{
    syntax::Syntax,
    token::{Token, TokenKind},
};

/// Characters that end the longest-match run used to classify
/// numeric and boolean literals.
const RUN_TERMINATORS: [char; 4] = [' ', '\n', ';', ')'];

/// The pull-based tokenizer. Call `next_token` repeatedly; the
/// stream ends with one `TokenKind::End` token and never
/// restarts. Characters are consumed monotonically — the only
/// lookahead is inspection without consumption.
///
/// Recoverable lexical problems (bad escapes, unterminated
/// strings, stray `&`) are reported to the diagnostics sink
/// and produce an `Error` token; the single fatal condition,
/// an unterminated block comment, is the only `Err` this type
/// returns.
#[derive(Debug)]
pub struct Lexer {
    source: Rc<Source>,
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    /// Location of the most recently consumed character;
    /// token spans end here, inclusive.
    prev: Loc,
    reporter: Reporter,
}

impl Lexer {
    pub fn new(source: Rc<Source>, reporter: Reporter) -> Lexer {
        let chars = source.contents.chars().collect();
        Lexer {
            source,
            chars,
            index: 0,
            line: 1,
            column: 1,
            prev: Loc::new(1, 1),
            reporter,
        }
    }

    /// Drains the lexer into a vector, for debugging dumps and
    /// tests. The `End` token is included.
    pub fn tokenize(source: Rc<Source>, reporter: Reporter) -> Result<Vec<Token>, Syntax> {
        let mut lexer = Lexer::new(source, reporter);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::End;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn here(&self) -> Loc {
        Loc::new(self.line, self.column)
    }

    /// The character about to be consumed, if any.
    fn current(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    /// The nth character after the current one, without
    /// consuming anything.
    fn inspect(&self, nth: usize) -> Option<char> {
        self.chars.get(self.index + nth).copied()
    }

    /// Consumes one character, maintaining the line and column
    /// counters. Tabs advance the column to one past the next
    /// multiple-of-8 stop; newlines reset it to 1.
    fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.prev = self.here();
        self.index += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\t' => self.column += 8 - (self.column - 1) % 8,
            _ => self.column += 1,
        }
        Some(c)
    }

    fn spanned(&self, kind: TokenKind, spelling: &str, start: Loc) -> Token {
        Token::new(kind, spelling, Span::new(start, self.prev))
    }

    /// Skips whitespace and both comment forms. An unterminated
    /// block comment has no resynchronization point, so it is
    /// reported and tokenization halts.
    fn strip(&mut self) -> Result<(), Syntax> {
        loop {
            match self.current() {
                Some(' ' | '\t' | '\n' | '\r') => {
                    self.bump();
                }
                Some('/') => match self.inspect(1) {
                    Some('/') => {
                        self.bump();
                        self.bump();
                        while let Some(c) = self.bump() {
                            if c == '\n' {
                                break;
                            }
                        }
                    }
                    Some('*') => {
                        let open = self.here();
                        self.bump();
                        self.bump();
                        loop {
                            match (self.current(), self.inspect(1)) {
                                (Some('*'), Some('/')) => {
                                    self.bump();
                                    self.bump();
                                    break;
                                }
                                (None, _) => {
                                    let span = Span::new(open, self.here());
                                    self.reporter.report(": unterminated comment", "", span);
                                    return Err(Syntax::error("unterminated comment", span));
                                }
                                _ => {
                                    self.bump();
                                }
                            }
                        }
                    }
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    /// The longest run of characters from the current position
    /// up to (not including) a terminator or end of input.
    /// Numeric and boolean classification both start from this
    /// run and work backwards.
    fn longest_run(&self) -> String {
        let mut run = String::new();
        let mut nth = 0;
        while let Some(c) = self.inspect(nth) {
            if RUN_TERMINATORS.contains(&c) {
                break;
            }
            run.push(c);
            nth += 1;
        }
        run
    }

    /// Classifies a numeric literal by longest-match-then-
    /// backtrack: shrink the run from the right until a prefix
    /// matches the integer or float grammar; the first (longest)
    /// match wins. A run with no valid prefix consumes a single
    /// character and yields an error token.
    fn number(&mut self, start: Loc) -> Token {
        let run: Vec<char> = self.longest_run().chars().collect();
        for len in (1..=run.len()).rev() {
            let candidate: String = run[..len].iter().collect();
            if let Some(kind) = classify_number(&candidate) {
                for _ in 0..len {
                    self.bump();
                }
                return self.spanned(kind, &candidate, start);
            }
        }

        let stray = self.bump().unwrap_or_default();
        self.spanned(TokenKind::Error, &stray.to_string(), start)
    }

    /// `true` and `false` are literals only when they equal the
    /// whole longest run; `truex` is one identifier, and in
    /// `true+1` the run is `true+1`, so `true` scans as an
    /// identifier there too.
    fn boolean_or_identifier(&mut self, start: Loc) -> Token {
        let run = self.longest_run();
        if run == "true" || run == "false" {
            for _ in 0..run.len() {
                self.bump();
            }
            return self.spanned(TokenKind::BoolLit, &run, start);
        }
        self.identifier(start)
    }

    fn identifier(&mut self, start: Loc) -> Token {
        let mut spelling = String::new();
        while let Some(c) = self.current() {
            if !is_letter(c) && !c.is_ascii_digit() {
                break;
            }
            spelling.push(c);
            self.bump();
        }
        // Token::new folds reserved words into keyword kinds
        self.spanned(TokenKind::Ident, &spelling, start)
    }

    /// Scans a string literal; the opening quote is current.
    /// The token's spelling is the translated contents, quotes
    /// excluded. Bad escapes and unterminated literals are
    /// reported and reject the literal, but scanning recovers.
    fn string(&mut self, start: Loc) -> Token {
        self.bump(); // opening quote
        let mut spelling = String::new();
        let mut rejected = false;

        loop {
            match self.current() {
                None | Some('\n') => {
                    // leave the newline for strip(); the next
                    // line still tokenizes normally
                    self.reporter.report(
                        "%: unterminated string",
                        &spelling,
                        Span::new(start, start),
                    );
                    return self.spanned(TokenKind::Error, &spelling, start);
                }
                Some('\\') => match self.inspect(1).and_then(translate_escape) {
                    Some(translated) => {
                        spelling.push(translated);
                        self.bump();
                        self.bump();
                    }
                    None => {
                        let quoted = match self.inspect(1) {
                            Some(c) => format!("\\{}", c),
                            None => "\\".to_string(),
                        };
                        self.reporter.report(
                            "%: illegal escape character",
                            &quoted,
                            Span::new(start, self.here()),
                        );
                        rejected = true;
                        self.bump(); // just the backslash
                    }
                },
                Some('"') => {
                    self.bump();
                    let kind = if rejected {
                        TokenKind::Error
                    } else {
                        TokenKind::StrLit
                    };
                    return self.spanned(kind, &spelling, start);
                }
                Some(c) => {
                    spelling.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Resolves a one-or-two-character operator with a single
    /// character of lookahead; the first character is already
    /// consumed.
    fn follow(&mut self, expected: char, long: TokenKind, short: TokenKind, start: Loc) -> Token {
        if self.current() == Some(expected) {
            self.bump();
            self.spanned(long, long.spelling(), start)
        } else {
            self.spanned(short, short.spelling(), start)
        }
    }

    /// Produces the next token. Returns `Err` only for the
    /// fatal unterminated-block-comment condition.
    pub fn next_token(&mut self) -> Result<Token, Syntax> {
        use TokenKind::*;

        self.strip()?;
        let start = self.here();

        let c = match self.current() {
            Some(c) => c,
            None => return Ok(self.spanned_at_end(start)),
        };

        let token = match c {
            '(' | ')' | '{' | '}' | '[' | ']' | ';' | ',' | '+' | '-' | '*' | '/' => {
                let kind = match c {
                    '(' => OpenParen,
                    ')' => CloseParen,
                    '{' => OpenCurly,
                    '}' => CloseCurly,
                    '[' => OpenBracket,
                    ']' => CloseBracket,
                    ';' => Semicolon,
                    ',' => Comma,
                    '+' => Plus,
                    '-' => Minus,
                    '*' => Star,
                    _ => Slash,
                };
                self.bump();
                self.spanned(kind, kind.spelling(), start)
            }

            '<' => {
                self.bump();
                self.follow('=', LtEq, Lt, start)
            }
            '>' => {
                self.bump();
                self.follow('=', GtEq, Gt, start)
            }
            '=' => {
                self.bump();
                self.follow('=', EqEq, Eq, start)
            }
            '!' => {
                self.bump();
                self.follow('=', NotEq, Not, start)
            }

            // `&&` and `||` need both characters present
            '&' => {
                self.bump();
                if self.current() == Some('&') {
                    self.bump();
                    self.spanned(AndAnd, "&&", start)
                } else {
                    self.spanned(Error, "&", start)
                }
            }
            '|' => {
                self.bump();
                if self.current() == Some('|') {
                    self.bump();
                    self.spanned(OrOr, "||", start)
                } else {
                    self.spanned(Error, "|", start)
                }
            }

            '0'..='9' | '.' => self.number(start),
            '"' => self.string(start),
            't' | 'f' => self.boolean_or_identifier(start),
            c if is_letter(c) => self.identifier(start),

            unknown => {
                self.bump();
                self.spanned(Error, &unknown.to_string(), start)
            }
        };

        Ok(token)
    }

    fn spanned_at_end(&self, start: Loc) -> Token {
        Token::new(TokenKind::End, "$", Span::new(start, start))
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn translate_escape(c: char) -> Option<char> {
    let translated = match c {
        'b' => '\u{0008}',
        'f' => '\u{000C}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '\'' => '\'',
        '"' => '"',
        '\\' => '\\',
        _ => return None,
    };
    Some(translated)
}

/// Matches a whole candidate against the literal grammars:
/// integer is `digit+`; float is `digit+ '.' digit*`,
/// `'.' digit+`, or `digit+`, each with an optional exponent
/// `('e'|'E') ('+'|'-')? digit+` — and must actually contain a
/// point or an exponent. Anything else is neither.
fn classify_number(candidate: &str) -> Option<TokenKind> {
    let chars: Vec<char> = candidate.chars().collect();
    let len = chars.len();
    let mut i = 0;

    let mut digits = |i: &mut usize| {
        let before = *i;
        while *i < len && chars[*i].is_ascii_digit() {
            *i += 1;
        }
        *i > before
    };

    let whole = digits(&mut i);
    let mut is_float = false;

    if i < len && chars[i] == '.' {
        i += 1;
        let fraction = digits(&mut i);
        // `.` needs digits on at least one side
        if !whole && !fraction {
            return None;
        }
        is_float = true;
    }

    if i < len && (chars[i] == 'e' || chars[i] == 'E') {
        if !whole && !is_float {
            return None;
        }
        i += 1;
        if i < len && (chars[i] == '+' || chars[i] == '-') {
            i += 1;
        }
        if !digits(&mut i) {
            return None;
        }
        is_float = true;
    }

    if i != len {
        return None;
    }
    if is_float {
        Some(TokenKind::FloatLit)
    } else if whole {
        Some(TokenKind::IntLit)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Reporter) {
        let reporter = Reporter::new();
        let tokens = Lexer::tokenize(Source::snippet(source), reporter.clone())
            .expect("lexing should not hit a fatal error");
        (tokens, reporter)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_is_just_end() {
        let (tokens, reporter) = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::End);
        assert_eq!(tokens[0].spelling, "$");
        assert!(reporter.is_clean());
    }

    #[test]
    fn integer_literal() {
        let (tokens, _) = lex("123");
        assert_eq!(tokens[0].kind, TokenKind::IntLit);
        assert_eq!(tokens[0].spelling, "123");
    }

    #[test]
    fn float_with_exponent() {
        let (tokens, _) = lex("12.5e-3");
        assert_eq!(tokens[0].kind, TokenKind::FloatLit);
        assert_eq!(tokens[0].spelling, "12.5e-3");
    }

    #[test]
    fn backtracking_splits_double_dot() {
        // `1.2.3` is the float `1.2`, then scanning resumes at `.3`
        let (tokens, _) = lex("1.2.3");
        assert_eq!(tokens[0].kind, TokenKind::FloatLit);
        assert_eq!(tokens[0].spelling, "1.2");
        assert_eq!(tokens[1].kind, TokenKind::FloatLit);
        assert_eq!(tokens[1].spelling, ".3");
    }

    #[test]
    fn trailing_dot_float_and_exponent_forms() {
        assert_eq!(classify_number("1."), Some(TokenKind::FloatLit));
        assert_eq!(classify_number("1.e3"), Some(TokenKind::FloatLit));
        assert_eq!(classify_number("2e8"), Some(TokenKind::FloatLit));
        assert_eq!(classify_number(".5"), Some(TokenKind::FloatLit));
        assert_eq!(classify_number("007"), Some(TokenKind::IntLit));
        assert_eq!(classify_number("2e"), None);
        assert_eq!(classify_number("."), None);
        assert_eq!(classify_number(".e3"), None);
    }

    #[test]
    fn number_then_operator() {
        // the run is `12+3`; backtracking settles on `12`
        assert_eq!(
            kinds("12+3"),
            vec![
                TokenKind::IntLit,
                TokenKind::Plus,
                TokenKind::IntLit,
                TokenKind::End
            ]
        );
    }

    #[test]
    fn lone_dot_is_an_error_token() {
        let (tokens, _) = lex(". 5");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].spelling, ".");
        assert_eq!(tokens[1].kind, TokenKind::IntLit);
    }

    #[test]
    fn booleans_need_the_whole_run() {
        let (tokens, _) = lex("true");
        assert_eq!(tokens[0].kind, TokenKind::BoolLit);

        let (tokens, _) = lex("truex");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].spelling, "truex");

        // `;` terminates the run, so this one is a literal
        let (tokens, _) = lex("false;");
        assert_eq!(tokens[0].kind, TokenKind::BoolLit);

        // `+` does not, so `true` degrades to an identifier
        let (tokens, _) = lex("true+1");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].spelling, "true");
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("while for_ _x int1 int"),
            vec![
                TokenKind::While,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Int,
                TokenKind::End
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("< <= > >= = == ! != && ||"),
            vec![
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Eq,
                TokenKind::EqEq,
                TokenKind::Not,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::End
            ]
        );
    }

    #[test]
    fn half_of_a_double_operator() {
        let (tokens, _) = lex("a & b");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].spelling, "&");
    }

    #[test]
    fn string_escapes_translate() {
        let (tokens, reporter) = lex("\"a\\tb\\nc\"");
        assert_eq!(tokens[0].kind, TokenKind::StrLit);
        assert_eq!(tokens[0].spelling, "a\tb\nc");
        assert!(reporter.is_clean());
    }

    #[test]
    fn illegal_escape_rejects_but_recovers() {
        let (tokens, reporter) = lex("\"a\\xb\" 7");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::IntLit);
        let diags = reporter.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message(), "\\x: illegal escape character");
    }

    #[test]
    fn unterminated_string_recovers_on_next_line() {
        let (tokens, reporter) = lex("\"\nint x");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::Int);
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        let diags = reporter.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message(), ": unterminated string");
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(
            kinds("// one\n1 /* two \n three */ 2"),
            vec![TokenKind::IntLit, TokenKind::IntLit, TokenKind::End]
        );
    }

    #[test]
    fn unterminated_comment_is_fatal() {
        let reporter = Reporter::new();
        let result = Lexer::tokenize(Source::snippet("1 /* oops"), reporter.clone());
        assert!(result.is_err());
        assert_eq!(reporter.count(), 1);
        assert_eq!(reporter.diagnostics()[0].message(), ": unterminated comment");
    }

    #[test]
    fn tab_advances_to_the_next_stop() {
        let (tokens, _) = lex("\tx\n12345678\ty");
        // col 1 tabs to col 9
        assert_eq!(tokens[0].span.start, Loc::new(1, 9));
        // col 9 tabs to col 17
        assert_eq!(tokens[2].span.start, Loc::new(2, 17));
    }

    #[test]
    fn spans_are_inclusive() {
        let (tokens, _) = lex("ab cd");
        assert_eq!(tokens[0].span, Span::new(Loc::new(1, 1), Loc::new(1, 2)));
        assert_eq!(tokens[1].span, Span::new(Loc::new(1, 4), Loc::new(1, 5)));
    }

    proptest! {
        #[test]
        fn arbitrary_input_never_panics(s in "\\PC*") {
            let reporter = Reporter::new();
            let result = Lexer::tokenize(Source::snippet(&s), reporter);
            format!("{:?}", result);
        }

        #[test]
        fn digit_runs_lex_to_one_integer(s in "[0-9]{1,9}") {
            let (tokens, _) = lex(&s);
            prop_assert_eq!(tokens.len(), 2);
            prop_assert_eq!(tokens[0].kind, TokenKind::IntLit);
            prop_assert_eq!(&tokens[0].spelling, &s);
        }

        #[test]
        fn identifiers_round_trip(s in "[a-eg-su-z_][a-zA-Z0-9_]{0,10}") {
            // (skipping t/f starts keeps true/false out of the pattern)
            let (tokens, _) = lex(&s);
            prop_assert_eq!(tokens.len(), 2);
            if TokenKind::keyword(&s).is_none() {
                prop_assert_eq!(tokens[0].kind, TokenKind::Ident);
            }
            prop_assert_eq!(&tokens[0].spelling, &s);
        }
    }
}
