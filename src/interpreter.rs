use anyhow::{Result, bail};

use crate::ast::{Declaration, MethodBody, Statement};
use crate::backend::{Backend, PreparedBackend};
use crate::config::InterpreterConfig;
use crate::parser::ParsedProgram;
use crate::scope::Cursor;

mod error;
mod runtime;

pub use error::{InterpreterError, RunFailure};
use runtime::InterpreterRuntime;

/// AST-walking backend that executes programs directly.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    config: InterpreterConfig,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self { config }
    }
}

/// Prepared executable program for the tree-walking interpreter.
pub struct PreparedInterpreter<'a> {
    parsed: &'a ParsedProgram,
    /// Every method body in the program, indexed by `BodyId`.
    bodies: Vec<&'a MethodBody>,
    config: InterpreterConfig,
}

impl PreparedInterpreter<'_> {
    fn run_once(&self) -> std::result::Result<String, RunFailure> {
        // Each run works on its own copy of the scope table so variable values
        // never carry over between runs.
        let mut runtime = InterpreterRuntime {
            bodies: &self.bodies,
            scopes: self.parsed.scopes.clone(),
            cursor: Cursor::GLOBAL,
            output: Vec::new(),
            config: self.config,
        };
        let result = runtime.exec_block(&self.parsed.program.declarations);
        let output = runtime.output.join("\n");
        match result {
            Ok(()) => Ok(output),
            Err(error) => Err(RunFailure { output, error }),
        }
    }
}

impl PreparedBackend for PreparedInterpreter<'_> {
    fn run(&self) -> Result<String> {
        Ok(self.run_once()?)
    }
}

impl Backend for Interpreter {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn prepare<'a>(&self, parsed: &'a ParsedProgram) -> Result<Box<dyn PreparedBackend + 'a>> {
        let mut bodies = Vec::with_capacity(parsed.scopes.body_count());
        collect_bodies(&parsed.program.declarations, &mut bodies);
        bodies.sort_by_key(|body| body.id);

        let consistent = bodies.len() == parsed.scopes.body_count()
            && bodies
                .iter()
                .enumerate()
                .all(|(index, body)| body.id.index() == index);
        if !consistent {
            bail!("Method bodies in the syntax tree do not match the scope table");
        }

        Ok(Box::new(PreparedInterpreter {
            parsed,
            bodies,
            config: self.config,
        }))
    }
}

fn collect_bodies<'a>(declarations: &'a [Declaration], bodies: &mut Vec<&'a MethodBody>) {
    for declaration in declarations {
        match declaration {
            Declaration::Class(class) => collect_bodies(&class.body, bodies),
            Declaration::Statement(Statement::MethodBody(body)) => {
                bodies.push(body);
                collect_bodies(&body.body, bodies);
            }
            Declaration::Statement(Statement::If { body, .. })
            | Declaration::Statement(Statement::While { body, .. }) => {
                collect_bodies(body, bodies)
            }
            Declaration::Method(_) | Declaration::Var(_) | Declaration::Statement(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::scope::Entity;
    use indoc::indoc;

    fn parse(source: &str) -> ParsedProgram {
        parser::parse(source).unwrap_or_else(|err| panic!("parse failed:\n{err}"))
    }

    fn run_with(interpreter: &Interpreter, source: &str) -> anyhow::Result<String> {
        let parsed = parse(source);
        interpreter.prepare(&parsed)?.run()
    }

    fn run_source(source: &str) -> anyhow::Result<String> {
        run_with(&Interpreter::new(), source)
    }

    fn expect_interpreter_error(error: anyhow::Error) -> InterpreterError {
        error
            .downcast::<RunFailure>()
            .expect("expected RunFailure")
            .error
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let output = run_source(indoc! {"
            x :: Int
            x = 1 + 2 * 3
            print(x)
        "})
        .expect("run failed");
        assert_eq!(output, "7");
    }

    #[test]
    fn evaluates_binary_operands_left_to_right() {
        let output = run_source(indoc! {"
            trace :: Void <- Int
            trace(n) do
                print(n)
            end
            print(trace(1) == trace(2))
        "})
        .expect("run failed");
        assert_eq!(output, "1\n2\ntrue");
    }

    #[test]
    fn overloads_are_tried_in_declaration_order() {
        let literal_first = run_source(indoc! {r#"
            f :: Void <- Int
            f(0) do
                print("zero")
            end
            f(x) do
                print(x)
            end
            f(0)
            f(5)
        "#})
        .expect("run failed");
        assert_eq!(literal_first, "zero\n5");

        let wildcard_first = run_source(indoc! {r#"
            f :: Void <- Int
            f(x) do
                print(x)
            end
            f(0) do
                print("zero")
            end
            f(0)
        "#})
        .expect("run failed");
        assert_eq!(wildcard_first, "0");
    }

    #[test]
    fn errors_when_no_implementation_matches() {
        let error = expect_interpreter_error(
            run_source(indoc! {"
                f :: Void <- Int
                f(1) do
                end
                f(2)
            "})
            .expect_err("expected missing implementation"),
        );
        assert_eq!(
            error,
            InterpreterError::NoMatchingImplementation {
                method: "f".to_string(),
                arguments: "2".to_string(),
                line: 4,
            }
        );
    }

    #[test]
    fn keeps_output_printed_before_a_failure() {
        let error = run_source(indoc! {"
            print(1)
            print(2)
            print(1 / 0)
        "})
        .expect_err("expected division by zero");
        let failure = error.downcast::<RunFailure>().expect("expected RunFailure");

        assert_eq!(failure.output, "1\n2");
        assert_eq!(failure.error, InterpreterError::DivisionByZero { line: 3 });
        assert_eq!(failure.to_string(), "Division by zero at line 3");
    }

    #[test]
    fn while_false_never_runs_its_body() {
        let output = run_source(indoc! {r#"
            while false do
                print("never")
            end
            print("done")
        "#})
        .expect("run failed");
        assert_eq!(output, "done");
    }

    #[test]
    fn executes_while_and_if() {
        let output = run_source(indoc! {"
            n :: Int
            n = 0
            while n < 4 do
                if n == 2 do
                    print(n)
                end
                n = n + 1
            end
            print(n)
        "})
        .expect("run failed");
        assert_eq!(output, "2\n4");
    }

    #[test]
    fn stops_non_terminating_loops_at_the_configured_bound() {
        let interpreter = Interpreter::with_config(InterpreterConfig {
            max_loop_iterations: Some(100),
        });
        let error = expect_interpreter_error(
            run_with(
                &interpreter,
                indoc! {"
                    x :: Int
                    x = 0
                    while true do
                        x = x
                    end
                "},
            )
            .expect_err("expected loop limit"),
        );
        assert_eq!(
            error,
            InterpreterError::LoopLimitExceeded {
                limit: 100,
                line: 3
            }
        );
    }

    #[test]
    fn resolves_names_through_nested_classes_and_methods() {
        let output = run_source(indoc! {"
            class Outer
                size :: Int
                size = 2
                class Inner
                    grow :: Void <- Int
                    grow(n) do
                        scale :: Void <- Int
                        scale(k) do
                            print(n * k)
                        end
                        scale(10)
                    end
                    grow(3)
                end
                print(size)
            end
        "})
        .expect("run failed");
        assert_eq!(output, "30\n2");
    }

    #[test]
    fn recursion_restores_parameters_after_each_call() {
        let output = run_source(indoc! {r#"
            count :: Void <- Int
            count(0) do
                print("liftoff")
            end
            count(n) do
                print(n)
                count(n - 1)
                print(n)
            end
            count(2)
        "#})
        .expect("run failed");
        assert_eq!(output, "2\n1\nliftoff\n1\n2");
    }

    #[test]
    fn calls_yield_null() {
        let output = run_source(indoc! {"
            f :: Int <- Int
            f(x) do
            end
            print(f(1))
        "})
        .expect("run failed");
        assert_eq!(output, "null");
    }

    #[test]
    fn errors_on_reading_unassigned_variable() {
        let error = expect_interpreter_error(
            run_source("x :: Int\nprint(x)").expect_err("expected unassigned variable"),
        );
        assert_eq!(
            error,
            InterpreterError::UnassignedVariable {
                name: "x".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn method_locals_start_unassigned_on_every_call() {
        let error = expect_interpreter_error(
            run_source(indoc! {"
                f :: Void <- Int
                f(first) do
                    seen :: Int
                    if first do
                        seen = 1
                    end
                    print(seen)
                end
                f(true)
                f(false)
            "})
            .expect_err("expected unassigned local"),
        );
        assert_eq!(
            error,
            InterpreterError::UnassignedVariable {
                name: "seen".to_string(),
                line: 7,
            }
        );
    }

    #[test]
    fn conditions_must_be_booleans() {
        let error = expect_interpreter_error(
            run_source("while 1 do\nend").expect_err("expected non-boolean condition"),
        );
        assert_eq!(
            error,
            InterpreterError::NonBooleanCondition {
                found: "integer",
                line: 1,
            }
        );
    }

    #[test]
    fn checks_integer_arithmetic() {
        let error = expect_interpreter_error(
            run_source("print(1 / 0)").expect_err("expected division by zero"),
        );
        assert_eq!(error, InterpreterError::DivisionByZero { line: 1 });

        let error = expect_interpreter_error(
            run_source("print(9223372036854775807 + 1)").expect_err("expected overflow"),
        );
        assert_eq!(
            error,
            InterpreterError::IntegerOverflow {
                operator: "+".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn promotes_mixed_arithmetic_to_float() {
        let output = run_source(indoc! {"
            print(1 + 2.5)
            print(7 / 2)
            print(-(2 * 1.5))
            print(2 == 2.0)
        "})
        .expect("run failed");
        assert_eq!(output, "3.5\n3\n-3.0\ntrue");
    }

    #[test]
    fn rejects_operands_of_the_wrong_kind() {
        let error = expect_interpreter_error(
            run_source("print(true and 1)").expect_err("expected invalid operands"),
        );
        assert_eq!(
            error,
            InterpreterError::InvalidOperands {
                operator: "and".to_string(),
                left: "boolean",
                right: "integer",
                line: 1,
            }
        );

        let error = expect_interpreter_error(
            run_source("print(!\"yes\")").expect_err("expected invalid operand"),
        );
        assert_eq!(
            error,
            InterpreterError::InvalidOperand {
                operator: "!".to_string(),
                operand: "string",
                line: 1,
            }
        );
    }

    #[test]
    fn print_takes_exactly_one_argument() {
        let error = expect_interpreter_error(
            run_source("print(1, 2)").expect_err("expected arity error"),
        );
        assert_eq!(
            error,
            InterpreterError::BuiltinArity {
                name: "print",
                expected: 1,
                found: 2,
                line: 1,
            }
        );
    }

    #[test]
    fn assignment_is_an_expression() {
        let output = run_source(indoc! {"
            x :: Int
            y :: Int
            x = y = 4
            print(x + y)
        "})
        .expect("run failed");
        assert_eq!(output, "8");
    }

    #[test]
    fn method_and_class_names_evaluate_to_their_name() {
        let output = run_source(indoc! {"
            class Shape
            end
            area :: Int <- Int
            print(area)
            print(Shape)
        "})
        .expect("run failed");
        assert_eq!(output, "area\nShape");
    }

    #[test]
    fn runs_do_not_mutate_the_parsed_program() {
        let parsed = parse("x :: Int\nx = 1\nprint(x)");
        let interpreter = Interpreter::new();
        let prepared = interpreter.prepare(&parsed).expect("prepare failed");

        assert_eq!(prepared.run().expect("first run"), "1");
        assert_eq!(prepared.run().expect("second run"), "1");

        let Some(Entity::Variable(x)) = parsed.scopes.resolve("x", Cursor::GLOBAL) else {
            panic!("x should be declared");
        };
        assert_eq!(parsed.scopes.value(x), None);
    }

    #[test]
    fn indexes_nested_bodies_by_id() {
        let parsed = parse(indoc! {"
            outer :: Void <- Int
            outer(a) do
                inner :: Void <- Int
                inner(b) do
                    print(a + b)
                end
                inner(a * 2)
            end
            outer(1)
        "});
        let output = Interpreter::new()
            .run(&parsed)
            .expect("run failed");
        assert_eq!(output, "3");
    }
}
