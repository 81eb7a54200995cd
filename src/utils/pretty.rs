//! Pretty printing of kernel source.
//!
//! Expressions are laid out with the `pretty` document algebra and render as
//! C source text. Statements and functions go through [`SourcePrinter`], a
//! line-oriented printer on top of [`CodeFormatter`].

use crate::frontend::ast::*;
use crate::frontend::semantic::VarTable;
use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use std::fmt;

/// Default line width for pretty printing.
pub const DEFAULT_WIDTH: usize = 80;

/// Width used by `Display`, wide enough that expressions never break.
const INLINE_WIDTH: usize = 1 << 20;

/// A pretty-printable value.
pub trait PrettyPrint {
    /// Convert to a pretty document.
    fn to_doc<'a>(&self, allocator: &'a BoxAllocator) -> DocBuilder<'a, BoxAllocator>;

    /// Pretty print to a string with the given width.
    fn pretty_print(&self, width: usize) -> String {
        let allocator = BoxAllocator;
        let doc = self.to_doc(&allocator).into_doc();
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = doc.render_fmt(width, &mut output);
        output
    }

    /// Pretty print with default width.
    fn pretty(&self) -> String {
        self.pretty_print(DEFAULT_WIDTH)
    }
}

/// Binding strength of an expression node, for deciding where a child needs
/// parentheses that the tree does not carry explicitly.
fn binding(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::LeftUnary { .. } => 8,
        _ => 9,
    }
}

fn operand<'a>(alloc: &'a BoxAllocator, expr: &Expr, min: u8) -> DocBuilder<'a, BoxAllocator> {
    if binding(expr) < min {
        alloc.text("(").append(expr.to_doc(alloc)).append(alloc.text(")"))
    } else {
        expr.to_doc(alloc)
    }
}

impl PrettyPrint for Expr {
    fn to_doc<'a>(&self, alloc: &'a BoxAllocator) -> DocBuilder<'a, BoxAllocator> {
        match &self.kind {
            ExprKind::Variable(var) => alloc.text(var.name.as_string()),
            ExprKind::Primitive(value) => alloc.text(value.to_string()),
            ExprKind::LeftUnary { op, value } => alloc.text(op.to_string()).append(operand(alloc, value, 8)),
            ExprKind::RightUnary { op, value } => operand(alloc, value, 9).append(alloc.text(op.to_string())),
            ExprKind::Binary { op, left, right } => {
                let prec = op.precedence();
                // Assignment is right-associative, everything else left.
                let (left_min, right_min) = if op.is_assignment() { (prec + 1, prec) } else { (prec, prec + 1) };
                operand(alloc, left, left_min)
                    .append(alloc.space())
                    .append(alloc.text(op.to_string()))
                    .append(alloc.space())
                    .append(operand(alloc, right, right_min))
                    .group()
            }
            ExprKind::Parentheses(inner) => alloc.text("(").append(inner.to_doc(alloc)).append(alloc.text(")")),
            ExprKind::Subscript { array, index } => operand(alloc, array, 9)
                .append(alloc.text("["))
                .append(index.to_doc(alloc))
                .append(alloc.text("]")),
            ExprKind::Call { function, args } => alloc
                .text(function.as_string())
                .append(alloc.text("("))
                .append(alloc.intersperse(args.iter().map(|a| a.to_doc(alloc)), alloc.text(", ")))
                .append(alloc.text(")")),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allocator = BoxAllocator;
        let doc = self.to_doc(&allocator).into_doc();
        doc.render_fmt(INLINE_WIDTH, f)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "({})", format_list(&self.args, ", "))?;
        }
        Ok(())
    }
}

/// A simple code formatter for generated code.
#[derive(Debug)]
pub struct CodeFormatter {
    output: String,
    indent_level: usize,
    indent_str: String,
    at_line_start: bool,
}

impl CodeFormatter {
    /// Create a new formatter with the given indent string.
    pub fn new(indent_str: &str) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: indent_str.to_string(),
            at_line_start: true,
        }
    }

    /// Create a formatter with default settings (2 spaces).
    pub fn default_indent() -> Self {
        Self::new("  ")
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write text, indenting at the start of each line.
    pub fn write(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.output.push('\n');
                self.at_line_start = true;
            } else {
                if self.at_line_start {
                    for _ in 0..self.indent_level {
                        self.output.push_str(&self.indent_str);
                    }
                    self.at_line_start = false;
                }
                self.output.push(c);
            }
        }
    }

    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.write("\n");
    }

    pub fn finish(self) -> String {
        self.output
    }
}

impl fmt::Write for CodeFormatter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s);
        Ok(())
    }
}

/// Format a list with separators.
pub fn format_list<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Prints statements and functions back as kernel source.
///
/// `for` attributes are printed in the loop header (`; @outer`), all other
/// attributes as a prefix.
pub struct SourcePrinter<'a> {
    vars: &'a VarTable,
    out: CodeFormatter,
}

impl<'a> SourcePrinter<'a> {
    pub fn new(vars: &'a VarTable) -> Self {
        Self { vars, out: CodeFormatter::default_indent() }
    }

    pub fn print_program(mut self, program: &Program) -> String {
        for (i, func) in program.functions.iter().enumerate() {
            if i > 0 {
                self.out.writeln("");
            }
            self.function(func);
        }
        self.out.finish()
    }

    fn function(&mut self, func: &Function) {
        for attr in &func.attributes {
            self.out.write(&format!("{} ", attr));
        }
        let params: Vec<String> = func.params.iter().map(|p| self.declarator(p)).collect();
        let header = format!("{} {}({})", func.return_type, func.name, params.join(", "));
        self.out.write(&header);
        self.out.writeln(" {");
        self.block_body(&func.body);
        self.out.writeln("}");
    }

    fn block_body(&mut self, block: &Block) {
        self.out.indent();
        for stmt in &block.statements {
            self.stmt(stmt);
        }
        self.out.dedent();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if stmt.as_for().is_none() {
            for attr in &stmt.attributes {
                self.out.write(&format!("{} ", attr));
            }
        }
        match &stmt.kind {
            StmtKind::For(for_stmt) => {
                let header = self.for_header(for_stmt, &stmt.attributes);
                self.nested(&header, &for_stmt.body);
            }
            StmtKind::Block(block) => {
                self.out.writeln("{");
                self.block_body(block);
                self.out.writeln("}");
            }
            StmtKind::If { condition, then_branch, else_branch } => {
                self.nested(&format!("if ({})", condition), then_branch);
                if let Some(else_branch) = else_branch {
                    self.nested("else", else_branch);
                }
            }
            StmtKind::While { condition, body } => self.nested(&format!("while ({})", condition), body),
            StmtKind::Return(Some(value)) => self.out.writeln(&format!("return {};", value)),
            StmtKind::Return(None) => self.out.writeln("return;"),
            _ => {
                let text = self.inline(stmt);
                self.out.writeln(&format!("{};", text));
            }
        }
    }

    /// A header followed by a body statement. Block bodies share the header line.
    fn nested(&mut self, header: &str, body: &Stmt) {
        match &body.kind {
            StmtKind::Block(block) if body.attributes.is_empty() => {
                self.out.writeln(&format!("{} {{", header));
                self.block_body(block);
                self.out.writeln("}");
            }
            _ => {
                self.out.writeln(header);
                self.out.indent();
                self.stmt(body);
                self.out.dedent();
            }
        }
    }

    fn for_header(&self, for_stmt: &ForStmt, attributes: &[Attribute]) -> String {
        let mut header = format!(
            "for ({}; {}; {}",
            self.inline(&for_stmt.init),
            self.inline(&for_stmt.check),
            self.inline(&for_stmt.update),
        );
        if !attributes.is_empty() {
            header.push_str("; ");
            header.push_str(&format_list(attributes, " "));
        }
        header.push(')');
        header
    }

    /// A simple statement without its terminating `;`.
    fn inline(&self, stmt: &Stmt) -> String {
        match &stmt.kind {
            StmtKind::Declaration(decls) => self.declaration(decls),
            StmtKind::Expression(expr) => expr.to_string(),
            _ => String::new(),
        }
    }

    fn declaration(&self, decls: &[VarDecl]) -> String {
        let base = decls
            .first()
            .and_then(|d| self.vars.ty(d.var.id))
            .map(base_type)
            .unwrap_or(Type::Int);
        let declarators: Vec<String> = decls
            .iter()
            .map(|d| {
                let stars = self.vars.ty(d.var.id).map(pointer_depth).unwrap_or(0);
                let mut text = format!("{}{}", "*".repeat(stars), d.var.name);
                if let Some(value) = &d.value {
                    text.push_str(&format!(" = {}", value));
                }
                text
            })
            .collect();
        format!("{} {}", base, declarators.join(", "))
    }

    fn declarator(&self, var: &VarRef) -> String {
        match self.vars.ty(var.id) {
            Some(Type::Pointer(_)) => {
                let ty = self.vars.ty(var.id).cloned().unwrap_or(Type::Int);
                format!("{} {}{}", base_type(&ty), "*".repeat(pointer_depth(&ty)), var.name)
            }
            Some(ty) => format!("{} {}", ty, var.name),
            None => format!("int {}", var.name),
        }
    }
}

fn base_type(ty: &Type) -> Type {
    match ty {
        Type::Pointer(inner) => base_type(inner),
        other => other.clone(),
    }
}

fn pointer_depth(ty: &Type) -> usize {
    match ty {
        Type::Pointer(inner) => 1 + pointer_depth(inner),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::semantic::VarId;
    use crate::utils::intern::Symbol;
    use crate::utils::location::Span;

    fn var(id: u32, name: &str) -> Expr {
        Expr::var(VarRef::new(VarId(id), Symbol::intern(name)), Span::dummy())
    }

    #[test]
    fn test_expr_display() {
        let expr = Expr::binary(
            BinaryOp::Sub,
            var(0, "N").wrap_in_parentheses(),
            Expr::int_lit(0, Span::dummy()).wrap_in_parentheses(),
            Span::dummy(),
        );
        assert_eq!(expr.to_string(), "(N) - (0)");
    }

    #[test]
    fn test_missing_parentheses_are_inserted() {
        let sum = Expr::binary(BinaryOp::Add, var(0, "a"), var(1, "b"), Span::dummy());
        let product = Expr::binary(BinaryOp::Mul, sum, var(2, "c"), Span::dummy());
        assert_eq!(product.to_string(), "(a + b) * c");

        let diff = Expr::binary(BinaryOp::Sub, var(0, "a"), var(1, "b"), Span::dummy());
        let nested = Expr::binary(BinaryOp::Sub, var(2, "c"), diff, Span::dummy());
        assert_eq!(nested.to_string(), "c - (a - b)");
    }

    #[test]
    fn test_unary_and_postfix() {
        let pre = Expr::new(ExprKind::LeftUnary { op: UnaryOp::Increment, value: Box::new(var(0, "i")) }, Span::dummy());
        let post = Expr::new(ExprKind::RightUnary { op: UnaryOp::Decrement, value: Box::new(var(0, "i")) }, Span::dummy());
        let index = Expr::new(
            ExprKind::Subscript { array: Box::new(var(1, "a")), index: Box::new(post.clone()) },
            Span::dummy(),
        );
        assert_eq!(pre.to_string(), "++i");
        assert_eq!(post.to_string(), "i--");
        assert_eq!(index.to_string(), "a[i--]");
    }

    #[test]
    fn test_source_printer_round_trip() {
        let source = "@kernel void f(int N, float *a) {\n  for (int i = 0; i < N; ++i; @outer) {\n    a[i] = 0.5;\n  }\n}\n";
        let program = crate::frontend::parse(source).unwrap();
        let printed = SourcePrinter::new(&program.vars).print_program(&program);
        assert_eq!(printed, source);
    }

    #[test]
    fn test_code_formatter_indents() {
        let mut fmt = CodeFormatter::default_indent();
        fmt.writeln("for (i = 0; i < N; i++) {");
        fmt.indent();
        fmt.writeln("sum += a[i];");
        fmt.dedent();
        fmt.writeln("}");
        let output = fmt.finish();
        assert_eq!(output, "for (i = 0; i < N; i++) {\n  sum += a[i];\n}\n");
    }
}
