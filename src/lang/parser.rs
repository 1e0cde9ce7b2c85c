//! Command parser
//!
//! This module parses command tokens into an AST.

use super::ast::*;
use super::lexer::Lexer;
use super::token::{LocatedToken, Token};
use crate::catalog::{Attribute, ForeignKey};
use crate::error::{Error, Result};

/// Infix algebra operators, all left-associative with equal precedence
#[derive(Debug, Clone, Copy)]
enum Infix {
    Join,
    Union,
    Intersect,
    Difference,
    Product,
}

/// Command parser
pub struct Parser {
    tokens: Vec<LocatedToken>,
    position: usize,
}

impl Parser {
    /// Create a new parser from command text
    pub fn new(source: &str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single statement, consuming an optional semicolon
    pub fn parse(&mut self) -> Result<Located<Statement>> {
        let line = self.line();
        let result = self.parse_statement();
        let stmt = result.map_err(|e| e.at_line(self.line()))?;

        if self.check(&Token::Semicolon) {
            self.advance();
        }

        Ok(Located::new(stmt, line))
    }

    /// Parse exactly one statement; anything after it is an error
    pub fn parse_single(&mut self) -> Result<Located<Statement>> {
        let stmt = self.parse()?;
        if !self.is_at_end() {
            return Err(self.unexpected("end of input").at_line(self.line()));
        }
        Ok(stmt)
    }

    /// Parse a program: one schema batch, then inserts and assignments
    pub fn parse_program(&mut self) -> Result<Program> {
        self.skip_semicolons();
        let schema_line = self.line();
        let mut relations = Vec::new();

        while self.starts_relation_def() {
            let def = self
                .parse_relation_def()
                .map_err(|e| e.at_line(self.line()))?;
            relations.push(def);
            self.skip_semicolons();
        }

        if relations.is_empty() && !self.is_at_end() {
            return Err(self.unexpected("relation definition").at_line(self.line()));
        }

        let mut commands = Vec::new();
        while !self.is_at_end() {
            let allowed = match self.current() {
                Token::Insert => true,
                Token::Force => matches!(self.peek(), Some(Token::Insert)),
                Token::Identifier(_) => matches!(self.peek(), Some(Token::Assign)),
                _ => false,
            };
            if !allowed {
                return Err(self
                    .unexpected("insert, force insert or assignment")
                    .at_line(self.line()));
            }

            commands.push(self.parse()?);
            self.skip_semicolons();
        }

        Ok(Program {
            schema: Located::new(relations, schema_line),
            commands,
        })
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Dot => self.parse_dot_command(),
            Token::Exit => {
                self.advance();
                Ok(Statement::Exit)
            }
            Token::Insert => self.parse_insert(CheckMode::Checked).map(Statement::Insert),
            Token::Delete => self.parse_delete(CheckMode::Checked).map(Statement::Delete),
            Token::Force => self.parse_force(),
            Token::Print => {
                self.advance();
                self.expect_identifier().map(Statement::PrintRelation)
            }
            Token::Identifier(_) if self.starts_relation_def() => {
                self.parse_relation_defs().map(Statement::DefineRelations)
            }
            Token::Identifier(_) if matches!(self.peek(), Some(Token::Assign)) => {
                self.parse_assign().map(Statement::Assign)
            }
            Token::Eof => Err(Error::UnexpectedEof("statement".to_string())),
            _ => self.parse_expr().map(Statement::Evaluate),
        }
    }

    // ========== Shell Commands ==========

    fn parse_dot_command(&mut self) -> Result<Statement> {
        self.expect(&Token::Dot)?;

        let stmt = match self.current() {
            Token::Exit => Statement::Exit,
            Token::Identifier(name) => match name.as_str() {
                "quit" => Statement::Exit,
                "model" => Statement::PrintModel(ModelStyle::Decorated),
                "raw_model" => Statement::PrintModel(ModelStyle::Raw),
                _ => return Err(self.unexpected("model, raw_model, exit or quit")),
            },
            _ => return Err(self.unexpected("model, raw_model, exit or quit")),
        };
        self.advance();

        Ok(stmt)
    }

    // ========== Schema Definitions ==========

    fn starts_relation_def(&self) -> bool {
        matches!(
            (self.current(), self.peek()),
            (Token::Identifier(_), Some(Token::LParen))
        )
    }

    fn parse_relation_defs(&mut self) -> Result<Vec<RelationDef>> {
        let mut relations = Vec::new();

        while self.starts_relation_def() {
            relations.push(self.parse_relation_def()?);
        }

        Ok(relations)
    }

    fn parse_relation_def(&mut self) -> Result<RelationDef> {
        let name = self.expect_identifier()?;
        self.expect(&Token::LParen)?;

        let mut attributes = Vec::new();
        loop {
            attributes.push(self.parse_attribute_def()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        // attr references Relation.attr
        let mut foreign_keys = Vec::new();
        while matches!(
            (self.current(), self.peek()),
            (Token::Identifier(_), Some(Token::References))
        ) {
            let referencer = self.expect_identifier()?;
            self.expect(&Token::References)?;
            let relation = self.expect_identifier()?;
            self.expect(&Token::Dot)?;
            let attribute = self.expect_identifier()?;
            foreign_keys.push(ForeignKey::new(referencer, relation, attribute));
        }

        Ok(RelationDef {
            name,
            attributes,
            foreign_keys,
        })
    }

    /// `name`, `_name` (primary key), `#name` (foreign key) or `_#name` (both)
    fn parse_attribute_def(&mut self) -> Result<Attribute> {
        if self.check(&Token::Hash) {
            self.advance();
            let name = self.expect_identifier()?;
            return Ok(Attribute::new(name).foreign_key(true));
        }

        let written = self.expect_identifier()?;
        if written == "_" {
            if self.check(&Token::Hash) {
                self.advance();
                let name = self.expect_identifier()?;
                return Ok(Attribute::new(name).primary_key(true).foreign_key(true));
            }
            return Err(self.unexpected("attribute name"));
        }

        match written.strip_prefix('_') {
            Some(name) => Ok(Attribute::new(name).primary_key(true)),
            None => Ok(Attribute::new(written)),
        }
    }

    // ========== Mutations ==========

    fn parse_force(&mut self) -> Result<Statement> {
        self.expect(&Token::Force)?;

        match self.current() {
            Token::Insert => self.parse_insert(CheckMode::Force).map(Statement::Insert),
            Token::Delete => self.parse_delete(CheckMode::Force).map(Statement::Delete),
            _ => Err(self.unexpected("insert or delete")),
        }
    }

    fn parse_insert(&mut self, mode: CheckMode) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        let relation = self.expect_identifier()?;
        self.expect(&Token::LParen)?;

        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        Ok(InsertStatement {
            relation,
            values,
            mode,
        })
    }

    fn parse_delete(&mut self, mode: CheckMode) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        let relation = self.expect_identifier()?;
        self.expect(&Token::Where)?;
        let condition = self.parse_condition()?;

        Ok(DeleteStatement {
            relation,
            condition,
            mode,
        })
    }

    fn parse_assign(&mut self) -> Result<AssignStatement> {
        let name = self.expect_identifier()?;
        self.expect(&Token::Assign)?;
        let expr = self.parse_expr()?;

        Ok(AssignStatement { name, expr })
    }

    // ========== Expressions ==========

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary_expr()?;

        while let Some(op) = self.infix_operator() {
            self.advance();
            let right = Box::new(self.parse_primary_expr()?);
            let lhs = Box::new(left);

            left = match op {
                Infix::Join => {
                    self.expect(&Token::Pipe)?;
                    let l = self.expect_identifier()?;
                    self.expect(&Token::Eq)?;
                    let r = self.expect_identifier()?;
                    Expr::Join {
                        left: lhs,
                        right,
                        condition: JoinCondition { left: l, right: r },
                    }
                }
                Infix::Union => Expr::Union { left: lhs, right },
                Infix::Intersect => Expr::Intersect { left: lhs, right },
                Infix::Difference => Expr::Difference { left: lhs, right },
                Infix::Product => Expr::Product { left: lhs, right },
            };
        }

        Ok(left)
    }

    /// The operator at the current position, if it is in infix position.
    ///
    /// `U` and `X` are ordinary names unless they follow an operand, and even
    /// then not when they start an assignment.
    fn infix_operator(&self) -> Option<Infix> {
        match self.current() {
            Token::Join => Some(Infix::Join),
            Token::Union => Some(Infix::Union),
            Token::Intersect => Some(Infix::Intersect),
            Token::Minus => Some(Infix::Difference),
            Token::Times => Some(Infix::Product),
            Token::Identifier(name) if !matches!(self.peek(), Some(Token::Assign)) => {
                match name.as_str() {
                    "U" => Some(Infix::Union),
                    "X" => Some(Infix::Product),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::Relation(name))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::Project => {
                self.advance();
                let columns = self.parse_identifier_list()?;
                let input = Box::new(self.parse_operand()?);
                Ok(Expr::Project { columns, input })
            }
            Token::Select => {
                self.advance();
                let condition = self.parse_condition()?;
                let input = Box::new(self.parse_operand()?);
                Ok(Expr::Select { condition, input })
            }
            Token::Eof => Err(Error::UnexpectedEof("relation or expression".to_string())),
            _ => Err(self.unexpected("relation or expression")),
        }
    }

    /// `( expr )` operand of a unary operator
    fn parse_operand(&mut self) -> Result<Expr> {
        self.expect(&Token::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        Ok(expr)
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let attribute = self.expect_identifier()?;
        let op = self.parse_compare_op()?;
        let value = self.parse_literal()?;

        Ok(Condition {
            attribute,
            op,
            value,
        })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Neq => CompareOp::Neq,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();
        Ok(op)
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match self.current().clone() {
            Token::IntegerLiteral(n) => Literal::Integer(n),
            Token::FloatLiteral(n) => Literal::Float(n),
            Token::StringLiteral(s) => Literal::String(s),
            Token::True => Literal::Boolean(true),
            Token::False => Literal::Boolean(false),
            _ => return Err(self.unexpected("literal")),
        };
        self.advance();
        Ok(literal)
    }

    // ========== Helper functions ==========

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    fn skip_semicolons(&mut self) {
        while self.check(&Token::Semicolon) {
            self.advance();
        }
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position + 1).map(|t| &t.token)
    }

    /// Line of the current token
    fn line(&self) -> usize {
        self.tokens
            .get(self.position)
            .or(self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn unexpected(&self, expected: &str) -> Error {
        if self.is_at_end() {
            return Error::UnexpectedEof(expected.to_string());
        }
        Error::UnexpectedToken {
            expected: expected.to_string(),
            found: format!("{}", self.current()),
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("{}", token)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }
}

/// Parse one statement from `source`
pub fn parse_statement(source: &str) -> Result<Located<Statement>> {
    Parser::new(source)?.parse_single()
}

/// Parse a whole program file
pub fn parse_program(source: &str) -> Result<Program> {
    Parser::new(source)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Statement {
        parse_statement(source).unwrap().node
    }

    #[test]
    fn test_parse_schema_batch() {
        let stmt = parse(
            "Emp(_id, name, #dept)
                dept references Dept.id
             Dept(_id, name)",
        );

        match stmt {
            Statement::DefineRelations(defs) => {
                assert_eq!(defs.len(), 2);
                assert_eq!(defs[0].name, "Emp");
                assert!(defs[0].attributes[0].primary_key);
                assert_eq!(defs[0].attributes[0].name, "id");
                assert!(defs[0].attributes[2].foreign_key);
                assert_eq!(
                    defs[0].foreign_keys,
                    vec![ForeignKey::new("dept", "Dept", "id")]
                );
                assert!(defs[1].foreign_keys.is_empty());
            }
            _ => panic!("Expected relation definitions"),
        }
    }

    #[test]
    fn test_parse_key_and_foreign_key_attribute() {
        match parse("Node(_#id, _ # other)") {
            Statement::DefineRelations(defs) => {
                let attrs = &defs[0].attributes;
                assert!(attrs[0].primary_key && attrs[0].foreign_key);
                assert_eq!(attrs[0].name, "id");
                assert!(attrs[1].primary_key && attrs[1].foreign_key);
            }
            _ => panic!("Expected relation definitions"),
        }
    }

    #[test]
    fn test_parse_insert() {
        match parse(r#"insert Emp(10, "Ann", 1);"#) {
            Statement::Insert(i) => {
                assert_eq!(i.relation, "Emp");
                assert_eq!(i.values.len(), 3);
                assert_eq!(i.values[1], Literal::String("Ann".to_string()));
                assert_eq!(i.mode, CheckMode::Checked);
            }
            _ => panic!("Expected INSERT statement"),
        }

        match parse("force insert Emp(11, 'Bob', 99)") {
            Statement::Insert(i) => assert_eq!(i.mode, CheckMode::Force),
            _ => panic!("Expected INSERT statement"),
        }
    }

    #[test]
    fn test_parse_delete() {
        match parse("delete Dept where id >= 2") {
            Statement::Delete(d) => {
                assert_eq!(d.relation, "Dept");
                assert_eq!(d.condition.attribute, "id");
                assert_eq!(d.condition.op, CompareOp::Gte);
                assert_eq!(d.condition.value, Literal::Integer(2));
                assert_eq!(d.mode, CheckMode::Checked);
            }
            _ => panic!("Expected DELETE statement"),
        }

        match parse("force delete Dept where name <> 'Ops'") {
            Statement::Delete(d) => {
                assert_eq!(d.mode, CheckMode::Force);
                assert_eq!(d.condition.op, CompareOp::Neq);
            }
            _ => panic!("Expected DELETE statement"),
        }
    }

    #[test]
    fn test_parse_nested_expression() {
        match parse("π name (σ dept = 1 (Emp))") {
            Statement::Evaluate(expr) => {
                assert_eq!(expr.to_string(), "π name (σ dept = 1 (Emp))");
            }
            _ => panic!("Expected expression"),
        }
    }

    #[test]
    fn test_parse_infix_left_associative() {
        match parse("A ∪ B - C") {
            Statement::Evaluate(Expr::Difference { left, right }) => {
                assert!(matches!(*left, Expr::Union { .. }));
                assert_eq!(*right, Expr::relation("C"));
            }
            other => panic!("Expected difference, got {:?}", other),
        }

        match parse("A - (B ∪ C)") {
            Statement::Evaluate(Expr::Difference { right, .. }) => {
                assert!(matches!(*right, Expr::Union { .. }));
            }
            other => panic!("Expected difference, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_join_and_letter_operators() {
        match parse("T := Emp ⋈ Dept | dept = id X Proj U Other") {
            Statement::Assign(a) => {
                assert_eq!(a.name, "T");
                match a.expr {
                    Expr::Union { left, right } => {
                        assert_eq!(*right, Expr::relation("Other"));
                        match *left {
                            Expr::Product { left, .. } => {
                                assert!(matches!(*left, Expr::Join { .. }));
                            }
                            other => panic!("Expected product, got {:?}", other),
                        }
                    }
                    other => panic!("Expected union, got {:?}", other),
                }
            }
            _ => panic!("Expected assignment"),
        }

        // U and X as relation names
        assert_eq!(parse("U"), Statement::Evaluate(Expr::relation("U")));
        match parse("X := U × X") {
            Statement::Assign(a) => {
                assert_eq!(a.name, "X");
                assert!(matches!(a.expr, Expr::Product { .. }));
            }
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_parse_shell_commands() {
        assert_eq!(parse(".model"), Statement::PrintModel(ModelStyle::Decorated));
        assert_eq!(parse(".raw_model"), Statement::PrintModel(ModelStyle::Raw));
        assert_eq!(parse(".quit"), Statement::Exit);
        assert_eq!(parse(".exit"), Statement::Exit);
        assert_eq!(parse("exit;"), Statement::Exit);
        assert_eq!(parse("print Emp"), Statement::PrintRelation("Emp".to_string()));
    }

    #[test]
    fn test_parse_errors_are_located() {
        let err = parse_statement("insert Emp(1,\n 2").unwrap_err();
        assert!(matches!(err, Error::AtLine { line: 2, .. }));
        assert!(matches!(err.inner(), Error::UnexpectedEof(_)));

        let err = parse_statement("delete Emp where id ~ 1").unwrap_err();
        assert!(matches!(err.inner(), Error::UnexpectedCharacter('~', 1)));

        let err = parse_statement("Emp Dept").unwrap_err();
        assert!(matches!(err.inner(), Error::UnexpectedToken { .. }));
    }

    #[test]
    fn test_parse_program() {
        let program = parse_program(
            "-- company
Emp(_id, name, #dept)
    dept references Dept.id
Dept(_id, name)

insert Dept(1, \"Eng\")
force insert Emp(11, \"Bob\", 99)
T := π name (Emp)
",
        )
        .unwrap();

        assert_eq!(program.schema.line, 2);
        assert_eq!(program.schema.node.len(), 2);
        assert_eq!(program.commands.len(), 3);
        assert_eq!(program.commands[0].line, 6);
        assert!(matches!(program.commands[2].node, Statement::Assign(_)));
    }

    #[test]
    fn test_parse_program_rejects_other_statements() {
        let err = parse_program("R(a)\ninsert R(1)\ndelete R where a = 1").unwrap_err();
        assert!(matches!(err, Error::AtLine { line: 3, .. }));

        let err = parse_program("insert R(1)").unwrap_err();
        assert!(matches!(err, Error::AtLine { line: 1, .. }));

        let empty = parse_program("  -- nothing\n").unwrap();
        assert!(empty.schema.node.is_empty());
        assert!(empty.commands.is_empty());
    }
}
