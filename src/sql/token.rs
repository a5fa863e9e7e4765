//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize to text for a
//! given dialect and identifier quote.

use crate::model::{Comparator, JoinKind};

use super::dialect::{Dialect, SqlDialect};

/// SQL Token - every element the generator emits.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    As,
    On,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    /// `INNER JOIN`, `LEFT OUTER JOIN`, ...
    Join(JoinKind),

    // === Punctuation ===
    Comma,
    Dot,
    LParen,
    RParen,

    // === Operators ===
    Comparator(Comparator),

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Table or column name, wrapped in the identifier quote.
    Ident(String),
    /// Table name with optional schema, each part quoted.
    QualifiedIdent {
        schema: Option<String>,
        name: String,
    },
    /// Table or item alias, never quoted.
    Alias(String),
    /// Aggregate function name.
    FunctionName(String),
    LitInt(i64),

    // === Escape Hatch ===
    /// Text passed through as is: user-typed SQL (filter fragments, HAVING
    /// text) and item names already resolved by the dialect.
    Raw(String),
}

impl Token {
    /// Serialize this token for `dialect`, quoting identifiers with `quote`.
    pub fn serialize(&self, dialect: Dialect, quote: &str) -> String {
        match self {
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::As => "AS".into(),
            Token::On => "ON".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::Join(kind) => kind.keyword().into(),

            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            Token::Comparator(c) => c.as_str().into(),

            Token::Space => " ".into(),

            Token::Ident(name) => dialect.quote_identifier(name, quote),
            Token::QualifiedIdent { schema, name } => match schema {
                Some(s) => format!(
                    "{}.{}",
                    dialect.quote_identifier(s, quote),
                    dialect.quote_identifier(name, quote)
                ),
                None => dialect.quote_identifier(name, quote),
            },
            Token::Alias(alias) => alias.clone(),
            Token::FunctionName(name) => name.to_uppercase(),
            Token::LitInt(n) => n.to_string(),

            Token::Raw(s) => s.clone(),
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Append `parts` separated by `separator` tokens.
    pub fn join(&mut self, parts: Vec<TokenStream>, separator: &[Token]) -> &mut Self {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.extend(separator.iter().cloned());
            }
            self.append(part);
        }
        self
    }

    /// Serialize all tokens to a SQL string.
    pub fn serialize(&self, dialect: Dialect, quote: &str) -> String {
        self.tokens
            .iter()
            .map(|t| t.serialize(dialect, quote))
            .collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}
