//! Python-syntax config files
//!
//! The file is parsed into an AST and evaluated without running any code:
//! only assignments of literal expressions are accepted. Expressions may refer
//! to names bound earlier in the same file, so `data_dir = home_dir + "/data"`
//! works while imports, calls and attribute access are rejected.

use crate::domain::Value;
use rustpython_parser::ast;
use rustpython_parser::Parse;

type EvalResult<T> = std::result::Result<T, String>;

/// Evaluate a config file and return every top-level binding in first-bound
/// order, private names included.
pub fn eval_python_config(source: &str, source_path: &str) -> EvalResult<Vec<(String, Value)>> {
    let suite = ast::Suite::parse(source, source_path).map_err(|e| format!("syntax error: {e}"))?;

    let mut scope = Scope::default();
    for stmt in &suite {
        match stmt {
            ast::Stmt::Assign(ast::StmtAssign { targets, value, .. }) => {
                let value = scope.eval(value)?;
                for target in targets {
                    scope.bind(target_name(target)?, value.clone());
                }
            }
            ast::Stmt::AnnAssign(ast::StmtAnnAssign { target, value, .. }) => {
                // A bare annotation declares nothing.
                if let Some(value) = value {
                    let value = scope.eval(value)?;
                    scope.bind(target_name(target)?, value);
                }
            }
            ast::Stmt::Expr(ast::StmtExpr { value, .. }) if is_docstring(value) => {}
            ast::Stmt::Pass(_) => {}
            ast::Stmt::Import(_) | ast::Stmt::ImportFrom(_) => {
                return Err("imports are not supported".to_string());
            }
            _ => return Err("only `name = value` assignments are supported".to_string()),
        }
    }

    Ok(scope.bindings)
}

fn target_name(target: &ast::Expr) -> EvalResult<String> {
    match target {
        ast::Expr::Name(ast::ExprName { id, .. }) => Ok(id.as_str().to_string()),
        _ => Err("assignment targets must be plain names".to_string()),
    }
}

fn is_docstring(expr: &ast::Expr) -> bool {
    matches!(
        expr,
        ast::Expr::Constant(ast::ExprConstant { value: ast::Constant::Str(_), .. })
    )
}

#[derive(Default)]
struct Scope {
    bindings: Vec<(String, Value)>,
}

impl Scope {
    fn bind(&mut self, name: String, value: Value) {
        match self.bindings.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.bindings.push((name, value)),
        }
    }

    fn lookup(&self, name: &str) -> EvalResult<Value> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| format!("name `{name}` is not defined"))
    }

    fn eval(&self, expr: &ast::Expr) -> EvalResult<Value> {
        match expr {
            ast::Expr::Constant(ast::ExprConstant { value, .. }) => constant(value),
            ast::Expr::Name(ast::ExprName { id, .. }) => self.lookup(id.as_str()),
            ast::Expr::List(ast::ExprList { elts, .. })
            | ast::Expr::Tuple(ast::ExprTuple { elts, .. }) => {
                let items = elts.iter().map(|e| self.eval(e)).collect::<EvalResult<Vec<_>>>()?;
                if items.iter().any(|item| !item.is_scalar()) {
                    return Err("lists may only contain scalars".to_string());
                }
                Ok(Value::List(items))
            }
            ast::Expr::UnaryOp(ast::ExprUnaryOp { op, operand, .. }) => {
                unary(op, self.eval(operand)?)
            }
            ast::Expr::BinOp(ast::ExprBinOp { left, op, right, .. }) => {
                binary(op, self.eval(left)?, self.eval(right)?)
            }
            _ => Err("unsupported expression; only literals, names, lists and arithmetic are allowed"
                .to_string()),
        }
    }
}

fn constant(value: &ast::Constant) -> EvalResult<Value> {
    match value {
        ast::Constant::Bool(b) => Ok(Value::Bool(*b)),
        ast::Constant::Str(s) => Ok(Value::Str(s.clone())),
        ast::Constant::Float(f) => Ok(Value::Float(*f)),
        ast::Constant::Int(i) => {
            let digits = i.to_string();
            digits.parse::<i64>().map(Value::Int).map_err(|_| format!("integer {digits} is out of range"))
        }
        ast::Constant::None => Err("None is not a supported value".to_string()),
        _ => Err("unsupported literal".to_string()),
    }
}

fn unary(op: &ast::UnaryOp, operand: Value) -> EvalResult<Value> {
    match (op, operand) {
        (ast::UnaryOp::USub, Value::Int(i)) => {
            i.checked_neg().map(Value::Int).ok_or_else(|| "integer overflow".to_string())
        }
        (ast::UnaryOp::USub, Value::Float(f)) => Ok(Value::Float(-f)),
        (ast::UnaryOp::UAdd, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (ast::UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        _ => Err("unsupported unary operation".to_string()),
    }
}

fn binary(op: &ast::Operator, left: Value, right: Value) -> EvalResult<Value> {
    use ast::Operator::{Add, Div, Mult, Sub};

    match (op, left, right) {
        (Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (Add, Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (Div, l, r) => match (l.as_float(), r.as_float()) {
            (Some(_), Some(d)) if d == 0.0 => Err("division by zero".to_string()),
            (Some(n), Some(d)) => Ok(Value::Float(n / d)),
            _ => Err("unsupported operands for `/`".to_string()),
        },
        (Add | Sub | Mult, Value::Int(a), Value::Int(b)) => {
            let result = match op {
                Add => a.checked_add(b),
                Sub => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            result.map(Value::Int).ok_or_else(|| "integer overflow".to_string())
        }
        (Add | Sub | Mult, l @ (Value::Int(_) | Value::Float(_)), r @ (Value::Int(_) | Value::Float(_))) => {
            let (a, b) = (l.as_float().unwrap_or_default(), r.as_float().unwrap_or_default());
            Ok(Value::Float(match op {
                Add => a + b,
                Sub => a - b,
                _ => a * b,
            }))
        }
        _ => Err("unsupported operands for arithmetic".to_string()),
    }
}
