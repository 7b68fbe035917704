//! Expression-based policy engine.
//!
//! Rule logic is compiled once (lexer → recursive-descent parser → typed
//! AST) when a rule is added or updated; evaluation against a per-query
//! context is side-effect free and never fails the pipeline: a runtime
//! type error makes that rule a non-match.

pub mod ast;
pub mod context;
pub mod engine;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod token;

pub use ast::Expr;
pub use context::EvalContext;
pub use engine::{PolicyEngine, PolicyMatch};
