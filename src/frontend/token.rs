//! Token types for the kernel dialect.

use crate::utils::location::Span;
use std::fmt;

/// A token in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source span
    pub span: Span,
    /// The lexeme (raw text)
    pub lexeme: String,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, span, lexeme }
    }

    /// Check if this is an EOF token.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.lexeme)
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Integer,
    /// Floating-point literal, with or without an `f` suffix
    Float,
    /// Identifier (variable, function or attribute name)
    Identifier,

    // Keywords
    /// `for` keyword
    For,
    /// `while` keyword
    While,
    /// `if` keyword
    If,
    /// `else` keyword
    Else,
    /// `return` keyword
    Return,
    /// `true` keyword
    True,
    /// `false` keyword
    False,

    // Type keywords
    /// `void` type
    Void,
    /// `char` type
    Char,
    /// `short` type
    Short,
    /// `int` type
    Int,
    /// `long` type
    Long,
    /// `float` type
    FloatType,
    /// `double` type
    Double,
    /// `bool` type
    Bool,

    // Arithmetic
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,

    // Comparison
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Assignment
    /// `=`
    Equal,
    /// `+=`
    PlusEqual,
    /// `-=`
    MinusEqual,
    /// `*=`
    StarEqual,
    /// `/=`
    SlashEqual,

    // Logical
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `!`
    Bang,

    // Delimiters
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// Attribute marker `@`
    At,

    /// End of file
    Eof,
}

impl TokenKind {
    /// Keyword for an identifier-shaped lexeme, if any.
    pub fn keyword(s: &str) -> Option<TokenKind> {
        match s {
            "for" => Some(TokenKind::For),
            "while" => Some(TokenKind::While),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "return" => Some(TokenKind::Return),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "void" => Some(TokenKind::Void),
            "char" => Some(TokenKind::Char),
            "short" => Some(TokenKind::Short),
            "int" => Some(TokenKind::Int),
            "long" => Some(TokenKind::Long),
            "float" => Some(TokenKind::FloatType),
            "double" => Some(TokenKind::Double),
            "bool" => Some(TokenKind::Bool),
            _ => None,
        }
    }

    /// Check if this token starts a type name.
    pub fn is_type(&self) -> bool {
        use TokenKind::*;
        matches!(self, Void | Char | Short | Int | Long | FloatType | Double | Bool)
    }

    pub fn is_keyword(&self) -> bool {
        use TokenKind::*;
        self.is_type() || matches!(self, For | While | If | Else | Return | True | False)
    }

    /// Get a human-readable name for this token kind.
    pub fn name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Integer => "integer",
            Float => "float literal",
            Identifier => "identifier",
            For => "for",
            While => "while",
            If => "if",
            Else => "else",
            Return => "return",
            True => "true",
            False => "false",
            Void => "void",
            Char => "char",
            Short => "short",
            Int => "int",
            Long => "long",
            FloatType => "float",
            Double => "double",
            Bool => "bool",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            PlusPlus => "++",
            MinusMinus => "--",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Equal => "=",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            AmpAmp => "&&",
            PipePipe => "||",
            Bang => "!",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Comma => ",",
            Semicolon => ";",
            At => "@",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.name())
    }
}
