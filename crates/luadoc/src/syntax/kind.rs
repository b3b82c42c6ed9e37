//
// syntax/kind.rs
//
// Closed set of node kinds produced by the parser
//

use serde::Serialize;

/// Kind of a syntax tree node.
///
/// Lua statements the resolver does not care about are not materialized;
/// only function bodies, doc comments and the doc annotation grammar get nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// Root of a parsed file or fragment
    File,
    /// `function a.b:c(...) ... end`
    FuncDecl,
    /// `local function f(...) ... end`
    LocalFuncDecl,
    /// `function(...) ... end` in expression position
    ClosureExpr,
    /// Run of `---` lines
    DocComment,
    TagClass,
    TagAlias,
    TagType,
    TagParam,
    TagReturn,
    TagField,
    TagGeneric,
    TagOverload,
    TagOther,
    /// One `T [: Parent]` entry of a `@generic` tag
    GenericDef,
    /// Declared name inside a tag (class name, param name, generic name)
    Name,
    /// Bare type name used as a type
    ClassNameRef,
    UnionTy,
    ArrayTy,
    FunctionTy,
    FunctionParam,
    GenericTy,
}

impl NodeKind {
    /// Functions and closures: the nodes a generic parameter can be scoped to.
    pub fn is_func_body_owner(self) -> bool {
        matches!(
            self,
            NodeKind::FuncDecl | NodeKind::LocalFuncDecl | NodeKind::ClosureExpr
        )
    }

    /// Nodes that may own a doc comment as their first child. A closure
    /// never does: the comment above `local f = function()` belongs to the
    /// statement, not the expression.
    pub fn is_comment_owner(self) -> bool {
        matches!(self, NodeKind::FuncDecl | NodeKind::LocalFuncDecl)
    }

    pub fn is_tag(self) -> bool {
        matches!(
            self,
            NodeKind::TagClass
                | NodeKind::TagAlias
                | NodeKind::TagType
                | NodeKind::TagParam
                | NodeKind::TagReturn
                | NodeKind::TagField
                | NodeKind::TagGeneric
                | NodeKind::TagOverload
                | NodeKind::TagOther
        )
    }

    /// Leaves carry their own text.
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Name | NodeKind::ClassNameRef)
    }

    /// Tags that register a global type name.
    pub fn is_type_declaration(self) -> bool {
        matches!(self, NodeKind::TagClass | NodeKind::TagAlias)
    }
}
