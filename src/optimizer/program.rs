//! Solver-agnostic representation of a mixed-integer linear program
//!
//! The model builder only assembles this data structure. Translation into a
//! concrete solver happens in [`crate::optimizer::solver`], and the LP text
//! dump in [`crate::optimizer::lp_format`] reads the same structure.

use serde::Serialize;

/// Index of a variable inside its [`LinearProgram`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, Serialize)]
pub struct VarDef {
    pub name: String,
    /// `None` means unbounded below
    pub lower: Option<f64>,
    /// `None` means unbounded above
    pub upper: Option<f64>,
    pub kind: VarKind,
}

impl VarDef {
    /// Continuous variable with a lower bound of zero
    pub fn non_negative(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: Some(0.0),
            upper: None,
            kind: VarKind::Continuous,
        }
    }

    /// Continuous variable of free sign
    pub fn free(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: None,
            upper: None,
            kind: VarKind::Continuous,
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: Some(0.0),
            upper: Some(1.0),
            kind: VarKind::Binary,
        }
    }

    pub fn with_upper(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }
}

/// Sparse affine expression `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expression holding a single term
    pub fn term(var: VarId, coefficient: f64) -> Self {
        Self {
            terms: vec![(var, coefficient)],
            constant: 0.0,
        }
    }

    pub fn add_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.push(var, coefficient);
        self
    }

    pub fn push(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    /// Evaluate against a full assignment of variable values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.0])
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintSense {
    Le,
    Ge,
    Eq,
}

impl ConstraintSense {
    pub fn symbol(&self) -> &'static str {
        match self {
            ConstraintSense::Le => "<=",
            ConstraintSense::Ge => ">=",
            ConstraintSense::Eq => "=",
        }
    }
}

/// `expr (sense) rhs`
#[derive(Debug, Clone, Serialize)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Whether `values` satisfies this row within `tolerance`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            ConstraintSense::Le => lhs <= self.rhs + tolerance,
            ConstraintSense::Ge => lhs >= self.rhs - tolerance,
            ConstraintSense::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// A minimisation program: variables, constraint rows and an objective
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinearProgram {
    pub name: String,
    pub variables: Vec<VarDef>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: LinearExpr,
}

impl LinearProgram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_variable(&mut self, def: VarDef) -> VarId {
        self.variables.push(def);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
    }

    pub fn variable(&self, id: VarId) -> &VarDef {
        &self.variables[id.0]
    }

    pub fn num_binaries(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    pub fn constraint(&self, name: &str) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_evaluate() {
        let mut lp = LinearProgram::new("t");
        let x = lp.add_variable(VarDef::non_negative("x"));
        let y = lp.add_variable(VarDef::binary("y"));
        lp.add_constraint(
            "row",
            LinearExpr::term(x, 1.0).add_term(y, -4.0),
            ConstraintSense::Le,
            0.0,
        );

        assert_eq!(lp.num_binaries(), 1);
        assert_eq!(lp.variable(y).upper, Some(1.0));

        let row = lp.constraint("row").unwrap();
        assert!(row.is_satisfied(&[3.0, 1.0], 1e-9));
        assert!(!row.is_satisfied(&[3.0, 0.0], 1e-9));
    }

    #[test]
    fn test_expression_constant() {
        let expr = LinearExpr::term(VarId(0), 2.0).with_constant(1.5);
        assert_eq!(expr.evaluate(&[2.0]), 5.5);
    }
}
