use std::cmp::Ordering;

use crate::ast::{
    Assignment, Binary, CallTarget, Declaration, Expression, MethodBody, MethodCall, Operator,
    Pattern, Statement,
};
use crate::builtins::BuiltinFunction;
use crate::config::InterpreterConfig;
use crate::scope::{Cursor, Entity, MethodId, ScopeError, ScopeTable, VariableId};
use crate::token::TokenKind;
use crate::value::Value;

use super::InterpreterError;

type EvalResult<T> = std::result::Result<T, InterpreterError>;

/// Numeric operand pair after int/float promotion.
enum Numbers {
    Integers(i64, i64),
    Floats(f64, f64),
}

impl Numbers {
    fn of(left: &Value, right: &Value) -> Option<Self> {
        match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => Some(Numbers::Integers(*left, *right)),
            (Value::Integer(left), Value::Float(right)) => {
                Some(Numbers::Floats(*left as f64, *right))
            }
            (Value::Float(left), Value::Integer(right)) => {
                Some(Numbers::Floats(*left, *right as f64))
            }
            (Value::Float(left), Value::Float(right)) => Some(Numbers::Floats(*left, *right)),
            _ => None,
        }
    }
}

/// Runtime executor for one run of a prepared program.
///
/// `cursor` is the current class / current method pair. It is saved before
/// entering a class body or method body and restored afterwards, whether the
/// body succeeded or not.
pub(super) struct InterpreterRuntime<'a> {
    pub(super) bodies: &'a [&'a MethodBody],
    pub(super) scopes: ScopeTable,
    pub(super) cursor: Cursor,
    pub(super) output: Vec<String>,
    pub(super) config: InterpreterConfig,
}

impl<'a> InterpreterRuntime<'a> {
    pub(super) fn exec_block(&mut self, body: &[Declaration]) -> EvalResult<()> {
        for declaration in body {
            self.exec_declaration(declaration)?;
        }
        Ok(())
    }

    fn exec_declaration(&mut self, declaration: &Declaration) -> EvalResult<()> {
        match declaration {
            Declaration::Class(class) => {
                let id = self
                    .scopes
                    .find_class(&class.name.name, self.cursor)
                    .ok_or_else(|| {
                        scope_error(
                            ScopeError::UndeclaredClass {
                                name: class.name.name.clone(),
                            },
                            class.name.line,
                        )
                    })?;
                let saved = self.cursor;
                self.cursor = Cursor::in_class(id);
                let result = self.exec_block(&class.body);
                self.cursor = saved;
                result
            }
            Declaration::Method(method) => {
                if self
                    .scopes
                    .find_declared_method(&method.name.name, self.cursor)
                    .is_none()
                {
                    let error = ScopeError::UndeclaredMethod {
                        name: method.name.name.clone(),
                    };
                    return Err(scope_error(error, method.name.line));
                }
                Ok(())
            }
            Declaration::Var(var) => {
                if self
                    .scopes
                    .find_declared_variable(&var.name.name, self.cursor)
                    .is_none()
                {
                    let error = ScopeError::UndeclaredVariable {
                        name: var.name.name.clone(),
                    };
                    return Err(scope_error(error, var.name.line));
                }
                Ok(())
            }
            Declaration::Statement(statement) => self.exec_statement(statement),
        }
    }

    fn exec_statement(&mut self, statement: &Statement) -> EvalResult<()> {
        match statement {
            Statement::Assign(assignment) => {
                self.assign(assignment)?;
                Ok(())
            }
            Statement::If {
                condition,
                body,
                line,
            } => {
                if self.condition(condition, *line)? {
                    self.exec_block(body)?;
                }
                Ok(())
            }
            Statement::While {
                condition,
                body,
                line,
            } => {
                let mut iterations = 0u64;
                while self.condition(condition, *line)? {
                    if let Some(limit) = self.config.max_loop_iterations
                        && iterations >= limit
                    {
                        return Err(InterpreterError::LoopLimitExceeded { limit, line: *line });
                    }
                    iterations += 1;
                    self.exec_block(body)?;
                }
                Ok(())
            }
            // Bodies are attached to their method while parsing.
            Statement::MethodBody(_) => Ok(()),
            Statement::Call(call) => {
                self.call(call)?;
                Ok(())
            }
            Statement::Expr(expr) => {
                self.eval_expression(expr)?;
                Ok(())
            }
        }
    }

    fn eval_expression(&mut self, expr: &Expression) -> EvalResult<Value> {
        match expr {
            Expression::Assign(assignment) => self.assign(assignment),
            Expression::Logic(binary) => self.logic(binary),
            Expression::Equality(binary) => self.equality(binary),
            Expression::Comparison(binary) => self.comparison(binary),
            Expression::Addition(binary) | Expression::Multiplication(binary) => {
                self.arithmetic(binary)
            }
            Expression::Unary { operator, right } => {
                let right = self.eval_expression(right)?;
                unary(operator, right)
            }
            Expression::Grouping(inner) => self.eval_expression(inner),
            Expression::Literal(literal) => Ok(Value::from(literal)),
            Expression::Identifier(identifier) => {
                match self.scopes.resolve(&identifier.name, self.cursor) {
                    Some(Entity::Variable(id)) => {
                        self.scopes.value(id).cloned().ok_or_else(|| {
                            InterpreterError::UnassignedVariable {
                                name: identifier.name.clone(),
                                line: identifier.line,
                            }
                        })
                    }
                    Some(Entity::Method(id)) => {
                        Ok(Value::String(self.scopes.method(id).name.clone()))
                    }
                    Some(Entity::Class(id)) => {
                        Ok(Value::String(self.scopes.class(id).name.clone()))
                    }
                    None => Err(scope_error(
                        ScopeError::UndeclaredName {
                            name: identifier.name.clone(),
                        },
                        identifier.line,
                    )),
                }
            }
            Expression::Call(call) => self.call(call),
        }
    }

    fn assign(&mut self, assignment: &Assignment) -> EvalResult<Value> {
        let value = self.eval_expression(&assignment.value)?;
        let target = &assignment.target;
        let id = match self.scopes.resolve(&target.name, self.cursor) {
            Some(Entity::Variable(id)) => id,
            Some(entity) => {
                let error = ScopeError::NotAssignable {
                    name: target.name.clone(),
                    found: entity.kind(),
                };
                return Err(scope_error(error, target.line));
            }
            None => {
                let error = ScopeError::UndeclaredVariable {
                    name: target.name.clone(),
                };
                return Err(scope_error(error, target.line));
            }
        };
        self.scopes.set_value(id, Some(value.clone()));
        Ok(value)
    }

    fn condition(&mut self, condition: &Expression, line: usize) -> EvalResult<bool> {
        let value = self.eval_expression(condition)?;
        value
            .as_bool()
            .ok_or(InterpreterError::NonBooleanCondition {
                found: value.type_name(),
                line,
            })
    }

    /// Evaluates both operands, left before right.
    fn operands(&mut self, binary: &Binary) -> EvalResult<(Value, Value)> {
        let left = self.eval_expression(&binary.left)?;
        let right = self.eval_expression(&binary.right)?;
        Ok((left, right))
    }

    fn logic(&mut self, binary: &Binary) -> EvalResult<Value> {
        let (left, right) = self.operands(binary)?;
        let operator = &binary.operator;
        let (Some(l), Some(r)) = (left.as_bool(), right.as_bool()) else {
            return Err(invalid_operands(operator, &left, &right));
        };
        match operator.kind {
            TokenKind::And => Ok(Value::Boolean(l && r)),
            TokenKind::Or => Ok(Value::Boolean(l || r)),
            _ => Err(unknown_operator("logic", operator)),
        }
    }

    fn equality(&mut self, binary: &Binary) -> EvalResult<Value> {
        let (left, right) = self.operands(binary)?;
        match binary.operator.kind {
            TokenKind::EqualEqual => Ok(Value::Boolean(left.equals(&right))),
            TokenKind::BangEqual => Ok(Value::Boolean(!left.equals(&right))),
            _ => Err(unknown_operator("equality", &binary.operator)),
        }
    }

    fn comparison(&mut self, binary: &Binary) -> EvalResult<Value> {
        let (left, right) = self.operands(binary)?;
        let operator = &binary.operator;
        let ordering = match Numbers::of(&left, &right) {
            Some(Numbers::Integers(l, r)) => Some(l.cmp(&r)),
            Some(Numbers::Floats(l, r)) => l.partial_cmp(&r),
            None => return Err(invalid_operands(operator, &left, &right)),
        };
        let result = match operator.kind {
            TokenKind::Greater => ordering == Some(Ordering::Greater),
            TokenKind::GreaterEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            TokenKind::Less => ordering == Some(Ordering::Less),
            TokenKind::LessEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            _ => return Err(unknown_operator("comparison", operator)),
        };
        Ok(Value::Boolean(result))
    }

    fn arithmetic(&mut self, binary: &Binary) -> EvalResult<Value> {
        let (left, right) = self.operands(binary)?;
        let operator = &binary.operator;
        let Some(numbers) = Numbers::of(&left, &right) else {
            return Err(invalid_operands(operator, &left, &right));
        };
        match numbers {
            Numbers::Integers(l, r) => {
                let result = match operator.kind {
                    TokenKind::Plus => l.checked_add(r),
                    TokenKind::Minus => l.checked_sub(r),
                    TokenKind::Star => l.checked_mul(r),
                    TokenKind::Slash => {
                        if r == 0 {
                            return Err(InterpreterError::DivisionByZero {
                                line: operator.line,
                            });
                        }
                        l.checked_div(r)
                    }
                    _ => return Err(unknown_operator("arithmetic", operator)),
                };
                result
                    .map(Value::Integer)
                    .ok_or_else(|| InterpreterError::IntegerOverflow {
                        operator: operator.lexeme.clone(),
                        line: operator.line,
                    })
            }
            Numbers::Floats(l, r) => {
                let result = match operator.kind {
                    TokenKind::Plus => l + r,
                    TokenKind::Minus => l - r,
                    TokenKind::Star => l * r,
                    TokenKind::Slash => l / r,
                    _ => return Err(unknown_operator("arithmetic", operator)),
                };
                Ok(Value::Float(result))
            }
        }
    }

    fn call(&mut self, call: &MethodCall) -> EvalResult<Value> {
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(self.eval_expression(argument)?);
        }

        match call.target {
            CallTarget::Builtin(builtin) => self.call_builtin(builtin, arguments, call.name.line),
            CallTarget::Method(method) => {
                let body = self.select_body(method, &arguments)?.ok_or_else(|| {
                    InterpreterError::NoMatchingImplementation {
                        method: call.name.name.clone(),
                        arguments: describe_arguments(&arguments),
                        line: call.name.line,
                    }
                })?;
                self.invoke(body, arguments)?;
                Ok(Value::Null)
            }
        }
    }

    fn call_builtin(
        &mut self,
        builtin: BuiltinFunction,
        arguments: Vec<Value>,
        line: usize,
    ) -> EvalResult<Value> {
        if arguments.len() != builtin.arity() {
            return Err(InterpreterError::BuiltinArity {
                name: builtin.name(),
                expected: builtin.arity(),
                found: arguments.len(),
                line,
            });
        }
        match builtin {
            BuiltinFunction::Print => {
                self.output.push(arguments[0].to_output());
                Ok(Value::Null)
            }
        }
    }

    /// First implementation, in declaration order, whose patterns all match.
    fn select_body(
        &mut self,
        method: MethodId,
        arguments: &[Value],
    ) -> EvalResult<Option<&'a MethodBody>> {
        let implementations = self.scopes.method(method).implementations.clone();
        for id in implementations {
            let body = self.bodies[id.index()];
            if body.params.len() == arguments.len() && self.patterns_match(body, arguments)? {
                return Ok(Some(body));
            }
        }
        Ok(None)
    }

    fn patterns_match(&mut self, body: &MethodBody, arguments: &[Value]) -> EvalResult<bool> {
        for (pattern, argument) in body.params.iter().zip(arguments) {
            if let Pattern::Value(expected) = pattern
                && !self.eval_expression(expected)?.equals(argument)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs `body` with a fresh frame: every variable the method owns starts
    /// out unassigned, parameters are bound, and all previous values come
    /// back once the body finishes.
    fn invoke(&mut self, body: &MethodBody, arguments: Vec<Value>) -> EvalResult<()> {
        let method = body.method;
        let frame = self.scopes.body_cursor(method);
        let locals = self.scopes.method(method).members.variables.clone();
        let mut saved: Vec<(VariableId, Option<Value>)> = locals
            .iter()
            .map(|id| (*id, self.scopes.set_value(*id, None)))
            .collect();

        let bound = self.bind_parameters(body, frame, arguments);
        let result = bound.and_then(|()| {
            let previous = self.cursor;
            self.cursor = frame;
            let result = self.exec_block(&body.body);
            self.cursor = previous;
            result
        });

        while let Some((id, value)) = saved.pop() {
            self.scopes.set_value(id, value);
        }
        result
    }

    fn bind_parameters(
        &mut self,
        body: &MethodBody,
        frame: Cursor,
        arguments: Vec<Value>,
    ) -> EvalResult<()> {
        for (pattern, argument) in body.params.iter().zip(arguments) {
            if let Pattern::Binding(name) = pattern {
                let id = self
                    .scopes
                    .find_declared_variable(&name.name, frame)
                    .ok_or_else(|| {
                        scope_error(
                            ScopeError::UndeclaredVariable {
                                name: name.name.clone(),
                            },
                            name.line,
                        )
                    })?;
                self.scopes.set_value(id, Some(argument));
            }
        }
        Ok(())
    }
}

fn unary(operator: &Operator, right: Value) -> EvalResult<Value> {
    let invalid = |operand: &Value| InterpreterError::InvalidOperand {
        operator: operator.lexeme.clone(),
        operand: operand.type_name(),
        line: operator.line,
    };
    match operator.kind {
        TokenKind::Bang => right
            .as_bool()
            .map(|value| Value::Boolean(!value))
            .ok_or_else(|| invalid(&right)),
        TokenKind::Minus => match right {
            Value::Integer(value) => value.checked_neg().map(Value::Integer).ok_or_else(|| {
                InterpreterError::IntegerOverflow {
                    operator: operator.lexeme.clone(),
                    line: operator.line,
                }
            }),
            Value::Float(value) => Ok(Value::Float(-value)),
            other => Err(invalid(&other)),
        },
        _ => Err(unknown_operator("unary", operator)),
    }
}

fn scope_error(source: ScopeError, line: usize) -> InterpreterError {
    InterpreterError::Scope { source, line }
}

fn invalid_operands(operator: &Operator, left: &Value, right: &Value) -> InterpreterError {
    InterpreterError::InvalidOperands {
        operator: operator.lexeme.clone(),
        left: left.type_name(),
        right: right.type_name(),
        line: operator.line,
    }
}

fn unknown_operator(node: &'static str, operator: &Operator) -> InterpreterError {
    InterpreterError::UnknownOperator {
        node,
        operator: operator.lexeme.clone(),
        line: operator.line,
    }
}

fn describe_arguments(arguments: &[Value]) -> String {
    arguments
        .iter()
        .map(|value| match value {
            Value::String(text) => format!("\"{text}\""),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
