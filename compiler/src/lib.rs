//! Compiles pattern text into programs for the `relin-runtime` evaluator.
//!
//! Compilation runs in three passes: [`parser::parse`] builds a syntax
//! tree, [`simplify`] normalizes it and bounds its expanded size, and
//! [`emit`] lowers it to instructions. [`compile`] chains all three.
//!
//! The grammar is the linear-time subset: no backreferences and no
//! lookaround, rejected at parse time. Everything a compiled program does
//! runs in time proportional to the input.
//!
//! # Example
//!
//! ```
//! use relin_compiler::{compile, Options};
//!
//! let program = compile("(\\d+)-(\\d+)", Options::default()).expect("should compile");
//!
//! let m = program.search(b"range 10-25", 0).expect("should match");
//! assert_eq!(6..11, m.full_range());
//! assert_eq!(Some(6..8), m.group(1));
//! assert_eq!(Some(9..11), m.group(2));
//! ```
//!
//! Recompiling hot patterns can be avoided with a [`ProgramCache`]:
//!
//! ```
//! use relin_compiler::{Options, ProgramCache};
//!
//! let mut cache = ProgramCache::default();
//! let program = cache
//!     .get_or_compile("[0-9a-f]+", Options::default())
//!     .expect("should compile");
//!
//! assert!(program.is_match(b"deadbeef"));
//! ```

pub mod ast;
mod cache;
mod compiler;
mod error;
pub mod parser;
mod simplify;

pub use cache::ProgramCache;
pub use compiler::{compile, emit, Options};
pub use error::{CompileError, Error, ParseError, ParseErrorKind};
pub use parser::parse;
pub use simplify::simplify;
