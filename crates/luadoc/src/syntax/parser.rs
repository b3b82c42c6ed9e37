//
// syntax/parser.rs
//
// Builds a SyntaxTree from Lua source: function nesting, doc comments and
// the doc annotation grammar. Everything else in the source is skipped.
//

use super::kind::NodeKind;
use super::lexer::{tokenize, Token, TokenKind};
use super::tree::{NodeId, SyntaxTree, TextRange};

const DOC_PREFIX_LEN: usize = 3;

/// Parse a file or an isolated fragment. Never fails; unbalanced blocks are
/// closed at end of input and stray closers are ignored.
pub fn parse(text: &str) -> SyntaxTree {
    let tokens = tokenize(text);
    let mut tree = SyntaxTree::with_text(text);
    build(&mut tree, &tokens, text.len());
    tree
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    Eof,
    End,
    Until,
}

#[derive(Debug)]
struct Frame {
    /// Node that receives children while this frame is open
    owner: NodeId,
    closer: Closer,
    /// Set when the frame is a function body
    function: Option<NodeId>,
}

/// Doc comment waiting for a function on the following line.
struct PendingDoc {
    comment: NodeId,
    last_line: u32,
}

fn build(tree: &mut SyntaxTree, tokens: &[Token<'_>], text_len: usize) {
    let mut frames = vec![Frame {
        owner: tree.root(),
        closer: Closer::Eof,
        function: None,
    }];
    let mut pending: Option<PendingDoc> = None;
    let mut i = 0;

    while i < tokens.len() {
        let tok = tokens[i];
        let owner = frames.last().map_or(tree.root(), |f| f.owner);

        if let Some(p) = &pending {
            if tok.line > p.last_line + 1 {
                pending = None;
            }
        }

        match tok.kind {
            TokenKind::DocLine => {
                let mut end = i + 1;
                while end < tokens.len()
                    && tokens[end].kind == TokenKind::DocLine
                    && tokens[end].line == tokens[end - 1].line + 1
                {
                    end += 1;
                }
                let lines = &tokens[i..end];
                let comment = build_doc_comment(tree, owner, lines);
                pending = Some(PendingDoc {
                    comment,
                    last_line: lines[lines.len() - 1].line,
                });
                i = end;
                continue;
            }
            TokenKind::Keyword => match tok.text {
                "local" if tokens.get(i + 1).is_some_and(|t| t.is_keyword("function")) => {
                    let func_kw = tokens[i + 1];
                    let func = open_function(
                        tree,
                        owner,
                        NodeKind::LocalFuncDecl,
                        tok.range.start,
                        func_kw.line,
                        pending.take(),
                    );
                    frames.push(Frame {
                        owner: func,
                        closer: Closer::End,
                        function: Some(func),
                    });
                    i += 2;
                    continue;
                }
                "function" => {
                    let kind = if tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::Name) {
                        NodeKind::FuncDecl
                    } else {
                        NodeKind::ClosureExpr
                    };
                    let func = open_function(tree, owner, kind, tok.range.start, tok.line, pending.take());
                    frames.push(Frame {
                        owner: func,
                        closer: Closer::End,
                        function: Some(func),
                    });
                }
                "do" | "if" => frames.push(Frame {
                    owner,
                    closer: Closer::End,
                    function: None,
                }),
                "repeat" => frames.push(Frame {
                    owner,
                    closer: Closer::Until,
                    function: None,
                }),
                "end" => close_frame(tree, &mut frames, Closer::End, tok.range.end),
                "until" => close_frame(tree, &mut frames, Closer::Until, tok.range.end),
                _ => {}
            },
            _ => {}
        }
        i += 1;
    }

    while frames.len() > 1 {
        if let Some(Frame {
            function: Some(func),
            ..
        }) = frames.pop()
        {
            tree.set_end(func, text_len);
        }
    }
}

fn open_function(
    tree: &mut SyntaxTree,
    owner: NodeId,
    kind: NodeKind,
    start: usize,
    keyword_line: u32,
    pending: Option<PendingDoc>,
) -> NodeId {
    let func = tree.add_node(owner, kind, TextRange::new(start, start));
    if let Some(doc) = pending {
        if kind.is_comment_owner() && doc.last_line + 1 == keyword_line {
            tree.adopt_first(func, doc.comment);
        }
    }
    func
}

fn close_frame(tree: &mut SyntaxTree, frames: &mut Vec<Frame>, closer: Closer, end: usize) {
    let matches = frames.len() > 1 && frames.last().is_some_and(|f| f.closer == closer);
    if !matches {
        log::trace!("Ignoring unbalanced {:?} at byte {}", closer, end);
        return;
    }
    if let Some(Frame {
        function: Some(func),
        ..
    }) = frames.pop()
    {
        tree.set_end(func, end);
    }
}

// ============================================================================
// Doc comments
// ============================================================================

fn build_doc_comment(tree: &mut SyntaxTree, owner: NodeId, lines: &[Token<'_>]) -> NodeId {
    let start = lines[0].range.start - DOC_PREFIX_LEN;
    let end = lines[lines.len() - 1].range.end;
    let comment = tree.add_node(owner, NodeKind::DocComment, TextRange::new(start, end));
    for line in lines {
        parse_tag_line(tree, comment, line.text, line.range.start);
    }
    comment
}

/// Parse one doc line. Lines without a leading `@` are description text.
fn parse_tag_line(tree: &mut SyntaxTree, comment: NodeId, src: &str, base: usize) {
    let mut cur = DocCursor { src, base, pos: 0 };
    cur.skip_ws();
    let at = cur.pos;
    if !cur.eat('@') {
        return;
    }
    let Some((_, tag_name)) = cur.word() else {
        return;
    };
    let kind = match tag_name {
        "class" => NodeKind::TagClass,
        "alias" => NodeKind::TagAlias,
        "type" => NodeKind::TagType,
        "param" => NodeKind::TagParam,
        "return" => NodeKind::TagReturn,
        "field" => NodeKind::TagField,
        "generic" => NodeKind::TagGeneric,
        "overload" => NodeKind::TagOverload,
        _ => NodeKind::TagOther,
    };
    let range = TextRange::new(base + at, base + src.trim_end().len());
    let tag = tree.add_node(comment, kind, range);

    match kind {
        NodeKind::TagClass => {
            if cur.name_leaf(tree, tag, NodeKind::Name).is_some() && cur.eat_after_ws(':') {
                loop {
                    cur.skip_ws();
                    if cur.name_leaf(tree, tag, NodeKind::ClassNameRef).is_none() || !cur.eat_after_ws(',') {
                        break;
                    }
                }
            }
        }
        NodeKind::TagAlias => {
            if cur.name_leaf(tree, tag, NodeKind::Name).is_some() {
                cur.ty_into(tree, tag);
            }
        }
        NodeKind::TagType | NodeKind::TagReturn => cur.ty_list_into(tree, tag),
        NodeKind::TagParam => {
            if cur.param_name_leaf(tree, tag) {
                cur.eat('?');
                cur.ty_into(tree, tag);
            }
        }
        NodeKind::TagField => {
            cur.skip_ws();
            for vis in ["public", "protected", "private", "package"] {
                if cur.eat_word(vis) {
                    break;
                }
            }
            if cur.name_leaf(tree, tag, NodeKind::Name).is_some() {
                cur.eat('?');
                cur.ty_into(tree, tag);
            }
        }
        NodeKind::TagGeneric => loop {
            cur.skip_ws();
            let Some((name_range, name)) = cur.name() else {
                break;
            };
            let def = tree.add_node(tag, NodeKind::GenericDef, name_range);
            tree.add_leaf(def, NodeKind::Name, name_range, name);
            if cur.eat_after_ws(':') {
                cur.skip_ws();
                if let Some(parent) = cur.name_leaf(tree, def, NodeKind::ClassNameRef) {
                    let end = tree.range(parent).end;
                    tree.set_end(def, end);
                }
            }
            if !cur.eat_after_ws(',') {
                break;
            }
        },
        NodeKind::TagOverload => cur.ty_into(tree, tag),
        _ => {}
    }
}

/// Intermediate type expression, materialized into nodes once complete.
#[derive(Debug)]
enum Ty {
    Name(TextRange, String),
    Array(TextRange, Box<Ty>),
    Union(TextRange, Vec<Ty>),
    Generic(TextRange, Box<Ty>, Vec<Ty>),
    Function(TextRange, Vec<FunctionParam>, Vec<Ty>),
}

#[derive(Debug)]
struct FunctionParam {
    range: TextRange,
    name: (TextRange, String),
    ty: Option<Ty>,
}

impl Ty {
    fn range(&self) -> TextRange {
        match self {
            Ty::Name(r, _)
            | Ty::Array(r, _)
            | Ty::Union(r, _)
            | Ty::Generic(r, _, _)
            | Ty::Function(r, _, _) => *r,
        }
    }

    fn emit(&self, tree: &mut SyntaxTree, parent: NodeId) {
        match self {
            Ty::Name(range, text) => {
                tree.add_leaf(parent, NodeKind::ClassNameRef, *range, text);
            }
            Ty::Array(range, inner) => {
                let node = tree.add_node(parent, NodeKind::ArrayTy, *range);
                inner.emit(tree, node);
            }
            Ty::Union(range, items) => {
                let node = tree.add_node(parent, NodeKind::UnionTy, *range);
                for item in items {
                    item.emit(tree, node);
                }
            }
            Ty::Generic(range, base, args) => {
                let node = tree.add_node(parent, NodeKind::GenericTy, *range);
                base.emit(tree, node);
                for arg in args {
                    arg.emit(tree, node);
                }
            }
            Ty::Function(range, params, returns) => {
                let node = tree.add_node(parent, NodeKind::FunctionTy, *range);
                for param in params {
                    let p = tree.add_node(node, NodeKind::FunctionParam, param.range);
                    tree.add_leaf(p, NodeKind::Name, param.name.0, &param.name.1);
                    if let Some(ty) = &param.ty {
                        ty.emit(tree, p);
                    }
                }
                for ret in returns {
                    ret.emit(tree, node);
                }
            }
        }
    }
}

struct DocCursor<'a> {
    src: &'a str,
    /// Absolute offset of `src` in the file
    base: usize,
    pos: usize,
}

impl<'a> DocCursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn abs(&self, local: usize) -> usize {
        self.base + local
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start_matches([' ', '\t']);
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_after_ws(&mut self, c: char) -> bool {
        let saved = self.pos;
        self.skip_ws();
        if self.eat(c) {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        let rest = self.rest();
        if rest.starts_with(word)
            && !rest[word.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    /// Identifier without dots (tag names)
    fn word(&mut self) -> Option<(TextRange, &'a str)> {
        self.scan(|c, _| c.is_ascii_alphanumeric() || c == '_')
    }

    /// `[A-Za-z_][A-Za-z0-9_.]*`
    fn name(&mut self) -> Option<(TextRange, &'a str)> {
        self.scan(|c, first| c.is_ascii_alphabetic() || c == '_' || (!first && (c.is_ascii_digit() || c == '.')))
    }

    fn scan(&mut self, accept: impl Fn(char, bool) -> bool) -> Option<(TextRange, &'a str)> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(i, c)| !accept(c, i == 0))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return None;
        }
        let start = self.pos;
        self.pos += len;
        Some((
            TextRange::new(self.abs(start), self.abs(self.pos)),
            &self.src[start..self.pos],
        ))
    }

    fn name_leaf(&mut self, tree: &mut SyntaxTree, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.skip_ws();
        let (range, text) = self.name()?;
        Some(tree.add_leaf(parent, kind, range, text))
    }

    /// `@param` names may also be `...`
    fn param_name_leaf(&mut self, tree: &mut SyntaxTree, parent: NodeId) -> bool {
        self.skip_ws();
        if self.rest().starts_with("...") {
            let start = self.pos;
            self.pos += 3;
            let range = TextRange::new(self.abs(start), self.abs(self.pos));
            tree.add_leaf(parent, NodeKind::Name, range, "...");
            return true;
        }
        self.name_leaf(tree, parent, NodeKind::Name).is_some()
    }

    fn ty_into(&mut self, tree: &mut SyntaxTree, parent: NodeId) {
        if let Some(ty) = self.ty() {
            ty.emit(tree, parent);
        }
    }

    fn ty_list_into(&mut self, tree: &mut SyntaxTree, parent: NodeId) {
        for ty in self.ty_list() {
            ty.emit(tree, parent);
        }
    }

    fn ty_list(&mut self) -> Vec<Ty> {
        let mut items = Vec::new();
        while let Some(ty) = self.ty() {
            items.push(ty);
            if !self.eat_after_ws(',') {
                break;
            }
        }
        items
    }

    fn ty(&mut self) -> Option<Ty> {
        let first = self.postfix()?;
        let mut items = vec![first];
        while self.eat_after_ws('|') {
            match self.postfix() {
                Some(ty) => items.push(ty),
                None => break,
            }
        }
        if items.len() == 1 {
            return items.pop();
        }
        let range = TextRange::new(items[0].range().start, items[items.len() - 1].range().end);
        Some(Ty::Union(range, items))
    }

    fn postfix(&mut self) -> Option<Ty> {
        let mut ty = self.primary()?;
        while self.rest().starts_with("[]") {
            self.pos += 2;
            let range = TextRange::new(ty.range().start, self.abs(self.pos));
            ty = Ty::Array(range, Box::new(ty));
        }
        Some(ty)
    }

    fn primary(&mut self) -> Option<Ty> {
        self.skip_ws();
        let start = self.pos;

        if self.eat_word("fun") && self.eat_after_ws('(') {
            return Some(self.function_ty(start));
        }
        self.pos = start;

        if self.eat('(') {
            let inner = self.ty();
            if !self.eat_after_ws(')') {
                log::trace!("Unclosed parenthesized doc type at byte {}", self.abs(start));
            }
            return inner;
        }

        let (range, text) = self.name()?;
        let name = Ty::Name(range, text.to_string());
        if self.eat('<') {
            let args = self.ty_list();
            self.eat_after_ws('>');
            let range = TextRange::new(range.start, self.abs(self.pos));
            return Some(Ty::Generic(range, Box::new(name), args));
        }
        Some(name)
    }

    /// After `fun(`
    fn function_ty(&mut self, start: usize) -> Ty {
        let mut params = Vec::new();
        loop {
            self.skip_ws();
            let param_start = self.pos;
            let name = if self.rest().starts_with("...") {
                self.pos += 3;
                Some((
                    TextRange::new(self.abs(param_start), self.abs(self.pos)),
                    "...".to_string(),
                ))
            } else {
                self.name().map(|(r, t)| (r, t.to_string()))
            };
            let Some(name) = name else {
                break;
            };
            let ty = if self.eat_after_ws(':') { self.ty() } else { None };
            let end = ty.as_ref().map_or(name.0.end, |t| t.range().end);
            params.push(FunctionParam {
                range: TextRange::new(name.0.start, end),
                name,
                ty,
            });
            if !self.eat_after_ws(',') {
                break;
            }
        }
        self.eat_after_ws(')');
        let returns = if self.eat_after_ws(':') {
            self.ty_list()
        } else {
            Vec::new()
        };
        let end = returns.last().map_or(self.abs(self.pos), |t| t.range().end);
        Ty::Function(TextRange::new(self.abs(start), end), params, returns)
    }
}
