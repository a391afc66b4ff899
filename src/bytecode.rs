use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::ast::{Expression, Program, Statement};
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Stack-machine instruction set executed by the VM.
///
/// Jumps carry absolute instruction indices; `Load`/`Store` carry variable
/// slot indices assigned by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Push,
    Pop,
    Store,
    Load,
    Add,
    Sub,
    Mul,
    Div,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    Jmp,
    JmpIfFalse,
    Print,
    Halt,
}

/// One instruction: an opcode and its operand slot. Opcodes without data
/// carry the conventional `Int(0)` and ignore it.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: Value,
}

impl Instruction {
    pub fn new(op: OpCode) -> Self {
        Self {
            op,
            operand: Value::Int(0),
        }
    }

    pub fn with_operand(op: OpCode, operand: Value) -> Self {
        Self { op, operand }
    }
}

/// Fully compiled program: linear instructions plus the slot count the VM
/// sizes its variable environment from.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub instructions: Vec<Instruction>,
    pub variable_count: usize,
}

/// Compiles an AST into linear bytecode with resolved jump targets.
pub fn compile(program: &Program) -> Result<CompiledProgram> {
    let mut generator = CodeGenerator::new();
    for statement in &program.statements {
        generator.compile_statement(statement)?;
    }
    generator.emit(OpCode::Halt);
    Ok(generator.finish())
}

struct CodeGenerator {
    instructions: Vec<Instruction>,
    slots: HashMap<String, usize>,
}

impl CodeGenerator {
    fn new() -> Self {
        Self {
            instructions: Vec::new(),
            slots: HashMap::new(),
        }
    }

    fn finish(self) -> CompiledProgram {
        CompiledProgram {
            variable_count: self.slots.len(),
            instructions: self.instructions,
        }
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression(expr) => {
                // Assignment is statement-only: it stores without leaving a
                // value on the stack, so it gets no trailing Pop.
                if let Expression::Assignment { name, value } = expr {
                    self.compile_expression(value)?;
                    self.emit_store(&name.text);
                } else {
                    self.compile_expression(expr)?;
                    self.emit(OpCode::Pop);
                }
            }
            Statement::Print(expr) => {
                self.compile_expression(expr)?;
                self.emit(OpCode::Print);
            }
            Statement::VarDecl { name, initializer } => {
                self.compile_expression(initializer)?;
                self.emit_store(&name.text);
            }
            Statement::Block(statements) => {
                for statement in statements {
                    self.compile_statement(statement)?;
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.compile_expression(condition)?;
                let else_jump = self.emit_jump(OpCode::JmpIfFalse);
                // The taken jump consumes the condition; the fall-through
                // path discards it here.
                self.emit(OpCode::Pop);
                self.compile_statement(then_branch)?;
                if let Some(else_branch) = else_branch {
                    let end_jump = self.emit_jump(OpCode::Jmp);
                    self.patch_jump(else_jump);
                    self.compile_statement(else_branch)?;
                    self.patch_jump(end_jump);
                } else {
                    self.patch_jump(else_jump);
                }
            }
            Statement::While { condition, body } => {
                let loop_start = self.instructions.len();
                self.compile_expression(condition)?;
                let exit_jump = self.emit_jump(OpCode::JmpIfFalse);
                self.emit(OpCode::Pop);
                self.compile_statement(body)?;
                self.emit_with(OpCode::Jmp, Value::Int(loop_start as i64));
                self.patch_jump(exit_jump);
            }
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::Literal(token) => {
                let value = decode_literal(token)?;
                self.emit_with(OpCode::Push, value);
            }
            Expression::Variable(name) => {
                let slot = self.slot(&name.text);
                self.emit_with(OpCode::Load, Value::Int(slot as i64));
            }
            Expression::Assignment { .. } => {
                bail!("Assignment is only valid as a statement");
            }
            Expression::Binary { op, left, right } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let opcode = match op.kind {
                    TokenKind::Plus => OpCode::Add,
                    TokenKind::Minus => OpCode::Sub,
                    TokenKind::Star => OpCode::Mul,
                    TokenKind::Slash => OpCode::Div,
                    TokenKind::EqualEqual => OpCode::CmpEq,
                    TokenKind::BangEqual => OpCode::CmpNe,
                    TokenKind::Less => OpCode::CmpLt,
                    TokenKind::LessEqual => OpCode::CmpLe,
                    TokenKind::Greater => OpCode::CmpGt,
                    TokenKind::GreaterEqual => OpCode::CmpGe,
                    _ => bail!("Unknown binary operator"),
                };
                self.emit(opcode);
            }
        }
        Ok(())
    }

    fn emit(&mut self, op: OpCode) {
        self.instructions.push(Instruction::new(op));
    }

    fn emit_with(&mut self, op: OpCode, operand: Value) {
        self.instructions.push(Instruction::with_operand(op, operand));
    }

    fn emit_store(&mut self, name: &str) {
        let slot = self.slot(name);
        self.emit_with(OpCode::Store, Value::Int(slot as i64));
    }

    /// Emits a jump with a placeholder target and returns its index for
    /// later patching.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        let index = self.instructions.len();
        self.emit_with(op, Value::Int(0));
        index
    }

    /// Points a previously emitted jump at the next instruction address.
    fn patch_jump(&mut self, index: usize) {
        self.instructions[index].operand = Value::Int(self.instructions.len() as i64);
    }

    /// First reference to a name claims the next slot; later references,
    /// including re-declarations, reuse it.
    fn slot(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.slots.get(name) {
            return slot;
        }
        let slot = self.slots.len();
        self.slots.insert(name.to_string(), slot);
        slot
    }
}

/// Decodes a literal token into its runtime value. A number spelling with a
/// `.` is a float, otherwise an integer. `null` has no runtime
/// representation of its own; it decodes to integer zero.
fn decode_literal(token: &Token) -> Result<Value> {
    match token.kind {
        TokenKind::Number => {
            let decoded = if token.text.contains('.') {
                token.text.parse::<f64>().ok().map(Value::Float)
            } else {
                token.text.parse::<i64>().ok().map(Value::Int)
            };
            decoded.ok_or_else(|| anyhow::anyhow!("Invalid number literal: {}", token.text))
        }
        TokenKind::Str => Ok(Value::Str(token.text.clone())),
        TokenKind::Bool => Ok(Value::Bool(token.text == "true")),
        TokenKind::Null => Ok(Value::Int(0)),
        _ => bail!("Invalid literal token {:?}", token.kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;

    fn compile_source(source: &str) -> CompiledProgram {
        let program = parse_tokens(tokenize(source)).expect("parse failed");
        compile(&program).expect("compile failed")
    }

    fn push_int(value: i64) -> Instruction {
        Instruction::with_operand(OpCode::Push, Value::Int(value))
    }

    #[test]
    fn compiles_arithmetic_with_precedence() {
        let compiled = compile_source("1 + 2 * 3;");
        assert_eq!(
            compiled.instructions,
            vec![
                push_int(1),
                push_int(2),
                push_int(3),
                Instruction::new(OpCode::Mul),
                Instruction::new(OpCode::Add),
                Instruction::new(OpCode::Pop),
                Instruction::new(OpCode::Halt),
            ]
        );
    }

    #[test]
    fn compiles_declaration_and_assignment_without_pop() {
        let compiled = compile_source("var x = 10; x = x - 3;");
        assert_eq!(
            compiled.instructions,
            vec![
                push_int(10),
                Instruction::with_operand(OpCode::Store, Value::Int(0)),
                Instruction::with_operand(OpCode::Load, Value::Int(0)),
                push_int(3),
                Instruction::new(OpCode::Sub),
                Instruction::with_operand(OpCode::Store, Value::Int(0)),
                Instruction::new(OpCode::Halt),
            ]
        );
        assert_eq!(compiled.variable_count, 1);
    }

    #[test]
    fn compiles_print_without_trailing_pop() {
        let compiled = compile_source("print(1);");
        assert_eq!(
            compiled.instructions,
            vec![
                push_int(1),
                Instruction::new(OpCode::Print),
                Instruction::new(OpCode::Halt),
            ]
        );
    }

    #[test]
    fn literal_decoding_covers_all_kinds() {
        let compiled = compile_source(r#"3.5; "s"; true; null;"#);
        let pushed = compiled
            .instructions
            .iter()
            .filter(|instruction| instruction.op == OpCode::Push)
            .map(|instruction| instruction.operand.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            pushed,
            vec![
                Value::Float(3.5),
                Value::Str("s".to_string()),
                Value::Bool(true),
                Value::Int(0),
            ]
        );
    }

    #[test]
    fn backpatches_if_else_to_absolute_targets() {
        let compiled = compile_source("if (1 < 2) { print(1); } else { print(0); }");
        assert_eq!(
            compiled.instructions,
            vec![
                push_int(1),                                                  // 0
                push_int(2),                                                  // 1
                Instruction::new(OpCode::CmpLt),                              // 2
                Instruction::with_operand(OpCode::JmpIfFalse, Value::Int(8)), // 3: to else
                Instruction::new(OpCode::Pop),                                // 4
                push_int(1),                                                  // 5
                Instruction::new(OpCode::Print),                              // 6
                Instruction::with_operand(OpCode::Jmp, Value::Int(10)),       // 7: over else
                push_int(0),                                                  // 8
                Instruction::new(OpCode::Print),                              // 9
                Instruction::new(OpCode::Halt),                               // 10
            ]
        );
    }

    #[test]
    fn backpatches_while_loop_jumps() {
        let compiled = compile_source("var i = 0; while (i < 3) { i = i + 1; }");
        assert_eq!(
            compiled.instructions,
            vec![
                push_int(0),                                                  // 0
                Instruction::with_operand(OpCode::Store, Value::Int(0)),      // 1
                Instruction::with_operand(OpCode::Load, Value::Int(0)),       // 2: loop start
                push_int(3),                                                  // 3
                Instruction::new(OpCode::CmpLt),                              // 4
                Instruction::with_operand(OpCode::JmpIfFalse, Value::Int(12)), // 5: to halt
                Instruction::new(OpCode::Pop),                                // 6
                Instruction::with_operand(OpCode::Load, Value::Int(0)),       // 7
                push_int(1),                                                  // 8
                Instruction::new(OpCode::Add),                                // 9
                Instruction::with_operand(OpCode::Store, Value::Int(0)),      // 10
                Instruction::with_operand(OpCode::Jmp, Value::Int(2)),        // 11
                Instruction::new(OpCode::Halt),                               // 12
            ]
        );
    }

    #[test]
    fn distinct_names_get_dense_slots_and_redeclaration_reuses() {
        let compiled = compile_source("var a = 1; var b = 2; var a = 3;");
        let stores = compiled
            .instructions
            .iter()
            .filter(|instruction| instruction.op == OpCode::Store)
            .map(|instruction| instruction.operand.clone())
            .collect::<Vec<_>>();
        assert_eq!(stores, vec![Value::Int(0), Value::Int(1), Value::Int(0)]);
        assert_eq!(compiled.variable_count, 2);
    }

    #[test]
    fn rejects_assignment_nested_in_expression() {
        let program = parse_tokens(tokenize("print(x = 1);")).expect("parse failed");
        let error = compile(&program).expect_err("compile should fail");
        assert!(
            error
                .to_string()
                .contains("Assignment is only valid as a statement")
        );
    }

    #[test]
    fn errors_on_undecodable_number_literal() {
        let program = Program {
            statements: vec![Statement::Expression(Expression::Literal(Token::new(
                TokenKind::Number,
                "12x3",
            )))],
        };
        let error = compile(&program).expect_err("compile should fail");
        assert_eq!(error.to_string(), "Invalid number literal: 12x3");
    }

    #[test]
    fn errors_on_unknown_binary_operator() {
        let program = Program {
            statements: vec![Statement::Expression(Expression::Binary {
                op: Token::new(TokenKind::And, "&&"),
                left: Box::new(Expression::Literal(Token::new(TokenKind::Number, "1"))),
                right: Box::new(Expression::Literal(Token::new(TokenKind::Number, "2"))),
            })],
        };
        let error = compile(&program).expect_err("compile should fail");
        assert_eq!(error.to_string(), "Unknown binary operator");
    }
}
