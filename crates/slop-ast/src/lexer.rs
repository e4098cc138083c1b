#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // structural
    Dot,          // .
    At,           // @
    TaskOpen,     // {
    TaskClose,    // }
    OpenBracket,  // [
    CloseBracket, // ]
    DoubleColon,  // ::

    // content
    Identifier,
    String,
    Interpolation, // $name or $env.NAME
    Newline,

    // always emitted at end
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dot => write!(f, "'.'"),
            Self::At => write!(f, "'@'"),
            Self::TaskOpen => write!(f, "'{{'"),
            Self::TaskClose => write!(f, "'}}'"),
            Self::OpenBracket => write!(f, "'['"),
            Self::CloseBracket => write!(f, "']'"),
            Self::DoubleColon => write!(f, "'::'"),
            Self::Identifier => write!(f, "identifier"),
            Self::String => write!(f, "string"),
            Self::Interpolation => write!(f, "interpolation"),
            Self::Newline => write!(f, "newline"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text: the identifier, the string content without quotes,
    /// or the reference name without the `$`
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }
}

/// A character the lexer could not place in any token. It is dropped and
/// scanning carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub character: char,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unexpected character '{}' on line {}",
            self.character.escape_default(),
            self.line
        )
    }
}

/// Tokenize a whole Slopfile
pub fn scan(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).tokenize()
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    /// Diagnostics collected so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Produce the next token. Once the input is exhausted this keeps
    /// returning `Eof`.
    pub fn next_token(&mut self) -> Token {
        loop {
            while let Some(' ' | '\t' | '\r') = self.peek() {
                self.pos += 1;
            }

            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, "", self.line);
            };

            match ch {
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                '.' => return Token::new(TokenKind::Dot, ".", self.line),
                '@' => return Token::new(TokenKind::At, "@", self.line),
                '{' => return Token::new(TokenKind::TaskOpen, "{", self.line),
                '}' => return Token::new(TokenKind::TaskClose, "}", self.line),
                '[' => return Token::new(TokenKind::OpenBracket, "[", self.line),
                ']' => return Token::new(TokenKind::CloseBracket, "]", self.line),
                ':' if self.peek() == Some(':') => {
                    self.pos += 1;
                    return Token::new(TokenKind::DoubleColon, "::", self.line);
                }
                '\n' => {
                    let tok = Token::new(TokenKind::Newline, "\n", self.line);
                    self.line += 1;
                    return tok;
                }
                '"' => return self.read_string(),
                '$' => {
                    let line = self.line;
                    let text = self.read_while(is_reference_char);
                    return Token::new(TokenKind::Interpolation, text, line);
                }
                _ if is_ident_char(ch) => {
                    let start = self.pos - ch.len_utf8();
                    self.read_while(is_ident_char);
                    return Token::new(
                        TokenKind::Identifier,
                        &self.source[start..self.pos],
                        self.line,
                    );
                }
                _ => self.diagnostics.push(Diagnostic {
                    line: self.line,
                    character: ch,
                }),
            }
        }
    }

    fn read_string(&mut self) -> Token {
        let source = self.source;
        let line = self.line;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.pos += c.len_utf8();
        }
        let text = &source[start..self.pos];
        // closing quote, if the literal was terminated
        self.advance();
        Token::new(TokenKind::String, text, line)
    }

    fn read_while(&mut self, accept: fn(char) -> bool) -> &'a str {
        let source = self.source;
        let start = self.pos;
        while self.peek().is_some_and(accept) {
            self.advance();
        }
        &source[start..self.pos]
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-'
}

fn is_reference_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}
