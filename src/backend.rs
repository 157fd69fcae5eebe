use anyhow::{Result, bail};

use crate::config::Config;
use crate::interpreter::Interpreter;
use crate::parser::ParsedProgram;
use crate::transpiler::Transpiler;

/// Executable artifact produced by a backend `prepare` step.
///
/// This keeps preparation and execution separated so benchmarks and tests can
/// measure/validate prepare-vs-run phases independently.
pub trait PreparedBackend {
    fn run(&self) -> Result<String>;
}

/// Common interface implemented by each consumer of a parsed program.
///
/// `prepare` builds whatever the backend needs from the syntax tree and scope
/// table, while `run` offers the convenience path for one-shot execution.
pub trait Backend {
    fn name(&self) -> &'static str;
    fn prepare<'a>(&self, parsed: &'a ParsedProgram) -> Result<Box<dyn PreparedBackend + 'a>>;

    fn run(&self, parsed: &ParsedProgram) -> Result<String> {
        self.prepare(parsed)?.run()
    }
}

pub fn backends() -> Vec<Box<dyn Backend>> {
    vec![Box::new(Interpreter::new()), Box::new(Transpiler::new())]
}

/// Looks a backend up by name, configured from `config`.
pub fn backend_by_name(name: &str, config: &Config) -> Result<Box<dyn Backend>> {
    match name {
        "interpreter" => Ok(Box::new(Interpreter::with_config(config.interpreter))),
        "transpiler" => Ok(Box::new(Transpiler::new())),
        other => {
            let known = backends()
                .iter()
                .map(|backend| backend.name())
                .collect::<Vec<_>>()
                .join(", ");
            bail!("Unknown backend '{other}' (expected one of: {known})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_every_backend() {
        let names = backends()
            .iter()
            .map(|backend| backend.name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["interpreter", "transpiler"]);
    }

    #[test]
    fn rejects_unknown_backend_names() {
        let error = backend_by_name("bytecode", &Config::default())
            .err()
            .expect("unknown backend should fail");
        assert_eq!(
            error.to_string(),
            "Unknown backend 'bytecode' (expected one of: interpreter, transpiler)"
        );
    }
}
