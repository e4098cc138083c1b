//! Front end for Slopfiles: lexer, parser and the program model the
//! engine executes.
//!
//! # Example
//!
//! ```
//! use slop_ast::{MapEnv, parse_source};
//!
//! let source = r#"
//! config::db.user["admin"]
//! @migrations {
//! run::seed["./seeds/a.sql"]
//! }
//! run::task[$migrations]
//! "#;
//!
//! let parsed = parse_source(source, &mut MapEnv::new()).unwrap();
//! for action in &parsed.program.default_queue {
//!     println!("line {}: {}", action.line, action);
//! }
//! ```

pub mod env;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod validation;

pub use env::{EnvLoadError, Environment, MapEnv};
pub use error::{ParseError, ParseErrorKind};
pub use lexer::{Diagnostic, Lexer, Token, TokenKind, scan};
pub use parser::{Parsed, parse, parse_source};
pub use program::{Action, ActionKind, Directive, Program, Value};
pub use validation::{PreconditionError, check_preconditions};
