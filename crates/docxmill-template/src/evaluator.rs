//! Expression evaluation for template commands
//!
//! Commands are evaluated by an [`Evaluator`]. The default one embeds a
//! sandboxed Rhai engine: scripts cannot touch the filesystem or network and
//! are bounded by operation and size limits.
//!
//! The report data is exposed as variables (one per top-level key of a JSON
//! object, or `data` for anything else). Loop variables may be written with
//! or without a `$` sigil. Functions and variables defined by `EXEC`
//! commands stay available for the rest of the document part.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use rhai::{Dynamic, Engine, Scope, AST};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{Result, TemplateError};

/// Evaluates command code against the report data
pub trait Evaluator {
    /// Evaluate `code` with the loop variables in `locals` in scope
    fn evaluate(&mut self, code: &str, locals: &[(String, Dynamic)]) -> Result<Dynamic>;
}

/// Builds a fresh evaluator for each document part from the data and the
/// additional context
pub type EvaluatorFactory =
    Arc<dyn Fn(&Value, &Map<String, Value>) -> Result<Box<dyn Evaluator>> + Send + Sync>;

/// The default factory: a [`RhaiEvaluator`]
pub fn rhai_factory() -> EvaluatorFactory {
    Arc::new(|data, context| Ok(Box::new(RhaiEvaluator::new(data, context)?) as Box<dyn Evaluator>))
}

/// Rhai-backed evaluator
pub struct RhaiEvaluator {
    engine: Engine,
    scope: Scope<'static>,
    functions: AST,
    cache: HashMap<String, AST>,
}

impl RhaiEvaluator {
    /// Create an evaluator with `data` and `context` as variables
    pub fn new(data: &Value, context: &Map<String, Value>) -> Result<Self> {
        let mut engine = Engine::new();

        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_operations(1_000_000);
        engine.set_max_modules(0);
        engine.set_max_string_size(10_000_000);
        engine.set_max_array_size(100_000);
        engine.set_max_map_size(100_000);

        let mut scope = Scope::new();
        match data {
            Value::Object(map) => {
                for (key, value) in map {
                    scope.push_dynamic(key.clone(), to_dynamic(value)?);
                }
            }
            Value::Null => {}
            other => {
                scope.push_dynamic("data", to_dynamic(other)?);
            }
        }
        for (key, value) in context {
            scope.push_dynamic(key.clone(), to_dynamic(value)?);
        }

        Ok(Self {
            engine,
            scope,
            functions: AST::default(),
            cache: HashMap::new(),
        })
    }

    fn compile(&mut self, code: &str) -> Result<AST> {
        if let Some(ast) = self.cache.get(code) {
            return Ok(ast.clone());
        }
        let ast = self
            .engine
            .compile(strip_sigils(code))
            .map_err(|e| TemplateError::Evaluation(e.to_string()))?;
        self.cache.insert(code.to_string(), ast.clone());
        Ok(ast)
    }
}

impl Evaluator for RhaiEvaluator {
    fn evaluate(&mut self, code: &str, locals: &[(String, Dynamic)]) -> Result<Dynamic> {
        let ast = self.compile(code)?;
        let program = self.functions.merge(&ast);

        let base = self.scope.len();
        for (name, value) in locals {
            self.scope.push_dynamic(name.clone(), value.clone());
        }
        let first_created = self.scope.len();

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &program);

        // Variables the code declared outlive the loop variables
        let created: Vec<(String, Dynamic)> = self
            .scope
            .iter()
            .skip(first_created)
            .map(|(name, _, value)| (name.to_string(), value))
            .collect();
        self.scope.rewind(base);
        for (name, value) in created {
            self.scope.push_dynamic(name, value);
        }

        let value = result.map_err(|e| TemplateError::Evaluation(e.to_string()))?;
        self.functions = self.functions.merge(&ast.clone_functions_only());
        trace!(code, result = %value, "evaluated");
        Ok(value)
    }
}

fn to_dynamic(value: &Value) -> Result<Dynamic> {
    rhai::serde::to_dynamic(value).map_err(|e| TemplateError::Evaluation(e.to_string()))
}

/// Drop the `$` sigil from variable references (`$item.name` -> `item.name`)
fn strip_sigils(code: &str) -> std::borrow::Cow<'_, str> {
    static SIGIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = SIGIL_RE.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());
    re.replace_all(code, "$1")
}

/// JavaScript-style truthiness used by `IF`
pub fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Some(b) = value.clone().try_cast::<bool>() {
        return b;
    }
    if let Ok(i) = value.as_int() {
        return i != 0;
    }
    if let Ok(f) = value.as_float() {
        return f != 0.0 && !f.is_nan();
    }
    if value.is_string() {
        return !value.clone().into_string().unwrap_or_default().is_empty();
    }
    true
}
