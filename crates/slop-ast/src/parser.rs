use std::collections::HashSet;

use crate::env::Environment;
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Diagnostic, Token, TokenKind, scan};
use crate::program::{Action, ActionKind, Directive, MAX_KEY_SEGMENTS, Program, Value};

/// A program together with the lexical diagnostics of its source
#[derive(Debug, Clone)]
pub struct Parsed {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan and parse a Slopfile
pub fn parse_source(source: &str, env: &mut dyn Environment) -> Result<Parsed, ParseError> {
    let (tokens, diagnostics) = scan(source);
    let program = parse(&tokens, env)?;
    Ok(Parsed {
        program,
        diagnostics,
    })
}

/// Build a program from a token sequence. The first error aborts the parse.
///
/// Values are resolved as soon as their declaration is read: `$env.NAME`
/// against `env`, `$name` against the variables declared so far and then
/// against task names. Task names may be referenced before their block,
/// variables may not.
pub fn parse(tokens: &[Token], env: &mut dyn Environment) -> Result<Program, ParseError> {
    Parser::new(tokens, env).parse_program()
}

static EOF: Token = Token {
    kind: TokenKind::Eof,
    text: String::new(),
    line: 0,
};

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    env: &'a mut dyn Environment,
    /// every `@name {` in the file, collected up front
    declared_tasks: HashSet<String>,
    current_task: Option<String>,
    program: Program,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], env: &'a mut dyn Environment) -> Self {
        Self {
            tokens,
            pos: 0,
            env,
            declared_tasks: declared_task_names(tokens),
            current_task: None,
            program: Program::new(),
        }
    }

    fn parse_program(mut self) -> Result<Program, ParseError> {
        loop {
            self.skip_newlines();
            if self.at_end() {
                break;
            }
            self.parse_declaration()?;
        }

        if let Some(name) = &self.current_task {
            return Err(ParseError::syntax(
                self.peek().line,
                format!("task block '@{}' is never closed", name),
            ));
        }

        Ok(self.program)
    }

    fn parse_declaration(&mut self) -> Result<(), ParseError> {
        let tok = self.advance();
        let line = tok.line;

        match directive(tok)? {
            Directive::TaskBegin => self.begin_task(),
            Directive::TaskEnd => self.end_task(line),
            directive => {
                self.expect(TokenKind::DoubleColon, "after directive")?;
                let key = self.parse_key()?;
                let value = self.parse_value(&key)?;
                let value = self.resolve(value, line)?;
                self.apply(directive, key, value, line)
            }
        }
    }

    /// `segment ("." segment){0,2}` - dots past the third segment are left
    /// for the bracket check to reject
    fn parse_key(&mut self) -> Result<String, ParseError> {
        let mut key = self.expect(TokenKind::Identifier, "key")?.text.clone();
        let mut segments = 1;

        while segments < MAX_KEY_SEGMENTS && self.check(TokenKind::Dot) {
            self.advance();
            let segment = self.expect(TokenKind::Identifier, "key segment after '.'")?;
            key.push('.');
            key.push_str(&segment.text);
            segments += 1;
        }

        Ok(key)
    }

    fn parse_value(&mut self, key: &str) -> Result<Value, ParseError> {
        self.expect(TokenKind::OpenBracket, &format!("after key '{}'", key))?;

        let tok = self.advance();
        let value = match tok.kind {
            TokenKind::String => Value::Literal(tok.text.clone()),
            TokenKind::Interpolation => Value::Reference(tok.text.clone()),
            _ => {
                return Err(ParseError::syntax(
                    tok.line,
                    format!("expected string or $reference inside '[', found {}", tok.kind),
                ));
            }
        };

        self.expect(TokenKind::CloseBracket, "after value")?;
        Ok(value)
    }

    fn resolve(&self, value: Value, line: usize) -> Result<String, ParseError> {
        let name = match value {
            Value::Literal(text) => return Ok(text),
            Value::Reference(name) => name,
        };

        if name.is_empty() {
            return Err(ParseError::syntax(line, "expected a name after '$'"));
        }

        if let Some(var) = name.strip_prefix("env.") {
            if var.is_empty() {
                return Err(ParseError::syntax(line, "expected a name after '$env.'"));
            }
            return self
                .env
                .non_empty(var)
                .ok_or_else(|| ParseError::new(ParseErrorKind::EnvNotSet, line, var));
        }

        if let Some(value) = self.program.vars.get(&name) {
            return Ok(value.clone());
        }

        if self.declared_tasks.contains(&name) {
            return Ok(name);
        }

        Err(ParseError::new(
            ParseErrorKind::UndefinedReference,
            line,
            format!("${}", name),
        ))
    }

    fn apply(
        &mut self,
        directive: Directive,
        key: String,
        value: String,
        line: usize,
    ) -> Result<(), ParseError> {
        match directive {
            Directive::Config => {
                self.program.config.insert(key, value);
            }
            Directive::Var => {
                self.program.vars.insert(key, value);
            }
            Directive::Source => {
                if key != ActionKind::Env.as_str() {
                    return Err(ParseError::syntax(
                        line,
                        format!("source only supports 'env', found '{}'", key),
                    ));
                }
                self.env
                    .load_file(&value)
                    .map_err(|e| ParseError::new(ParseErrorKind::Source, line, e.to_string()))?;
                self.program.sourced.push(value);
            }
            Directive::Run => {
                let kind: ActionKind = key.parse().map_err(|e| ParseError::syntax(line, e))?;
                if !ActionKind::RUNNABLE.contains(&kind) {
                    return Err(ParseError::syntax(
                        line,
                        format!("'{}' cannot be run, use source::{}[...]", kind, kind),
                    ));
                }
                let action = Action::new(kind, value, line);
                match &self.current_task {
                    Some(task) => self
                        .program
                        .tasks
                        .entry(task.clone())
                        .or_default()
                        .push(action),
                    None => self.program.default_queue.push(action),
                }
            }
            Directive::TaskBegin | Directive::TaskEnd => {
                return Err(ParseError::syntax(line, "task blocks take no key or value"));
            }
        }
        Ok(())
    }

    fn begin_task(&mut self) -> Result<(), ParseError> {
        let name_tok = self.expect(TokenKind::Identifier, "task name after '@'")?;
        let line = name_tok.line;
        let name = name_tok.text.clone();

        if let Some(open) = &self.current_task {
            return Err(ParseError::syntax(
                line,
                format!("task '{}' is declared inside task '{}'", name, open),
            ));
        }

        self.expect(TokenKind::TaskOpen, "after task name")?;

        if self.program.tasks.contains_key(&name) {
            return Err(ParseError::syntax(
                line,
                format!("task '{}' is already declared", name),
            ));
        }

        self.program.tasks.insert(name.clone(), Vec::new());
        self.current_task = Some(name);
        Ok(())
    }

    fn end_task(&mut self, line: usize) -> Result<(), ParseError> {
        match self.current_task.take() {
            Some(_) => Ok(()),
            None => Err(ParseError::syntax(line, "'}' without an open task block")),
        }
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn peek(&self) -> &'a Token {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    /// Consume the current token. `Eof` is never consumed.
    fn advance(&mut self) -> &'a Token {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<&'a Token, ParseError> {
        let tok = self.peek();
        if tok.kind == kind {
            return Ok(self.advance());
        }
        Err(ParseError::syntax(
            tok.line,
            format!("expected {} {}, found {}", kind, context, tok.kind),
        ))
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }
}

fn directive(tok: &Token) -> Result<Directive, ParseError> {
    match tok.kind {
        TokenKind::At => Ok(Directive::TaskBegin),
        TokenKind::TaskClose => Ok(Directive::TaskEnd),
        TokenKind::Identifier => Directive::from_keyword(&tok.text).ok_or_else(|| {
            ParseError::syntax(
                tok.line,
                format!(
                    "unknown directive '{}', expected one of: {}",
                    tok.text,
                    Directive::KEYWORDS.join(", ")
                ),
            )
        }),
        _ => Err(ParseError::syntax(
            tok.line,
            format!("expected a declaration, found {}", tok.kind),
        )),
    }
}

fn declared_task_names(tokens: &[Token]) -> HashSet<String> {
    tokens
        .windows(3)
        .filter_map(|w| match w {
            [at, name, open]
                if at.kind == TokenKind::At
                    && name.kind == TokenKind::Identifier
                    && open.kind == TokenKind::TaskOpen =>
            {
                Some(name.text.clone())
            }
            _ => None,
        })
        .collect()
}
