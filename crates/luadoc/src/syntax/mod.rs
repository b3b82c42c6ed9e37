//
// syntax/mod.rs
//
// Syntax tree model for Lua sources and their doc annotations
//

pub mod doc;
pub mod kind;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use kind::NodeKind;
pub use parser::parse;
pub use tree::{NodeId, SyntaxTree, TextRange};
