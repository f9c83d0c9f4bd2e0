//! Solver Adapter
//!
//! Hands a [`LinearProgram`] to a MILP backend through `good_lp`, blocks
//! until it returns and classifies the outcome. Non-optimal outcomes dump the
//! program through the [`DiagnosticsSink`] before being reported.

use good_lp::{
    variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use super::diagnostics::{ArtifactKind, DiagnosticsSink};
use super::program::{ConstraintSense, LinearExpr, LinearProgram, VarId, VarKind};
use crate::error::{ConfigError, PlannerError};

/// MILP backend selector
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SolverKind {
    /// Pure-Rust branch and bound (always compiled in)
    #[default]
    Microlp,
    /// COIN-OR CBC (`cbc` feature)
    Cbc,
    /// HiGHS (`highs` feature)
    Highs,
}

impl SolverKind {
    /// Parse a solver identifier such as `"cbc"`
    pub fn from_id(id: &str) -> Result<Self, ConfigError> {
        id.parse().map_err(|_| ConfigError::UnknownSolver(id.to_string()))
    }

    /// Whether this backend was compiled into the current build
    pub fn is_available(&self) -> bool {
        match self {
            SolverKind::Microlp => true,
            SolverKind::Cbc => cfg!(feature = "cbc"),
            SolverKind::Highs => cfg!(feature = "highs"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub kind: SolverKind,
    /// Forward the backend's own trace output
    pub verbose: bool,
    /// Handed to backends that support a time limit
    pub time_limit_seconds: Option<u64>,
}

/// Variable values of an optimal solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedProgram {
    values: Vec<f64>,
    objective: f64,
}

impl SolvedProgram {
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    pub fn value(&self, id: VarId) -> f64 {
        self.values[id.0]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// Classified result of one solver call
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Optimal(SolvedProgram),
    Infeasible,
    Failed { status: String },
}

pub struct SolverAdapter {
    settings: SolverSettings,
    diagnostics: DiagnosticsSink,
}

impl SolverAdapter {
    pub fn new(
        settings: SolverSettings,
        diagnostics: DiagnosticsSink,
    ) -> Result<Self, ConfigError> {
        if !settings.kind.is_available() {
            return Err(ConfigError::SolverUnavailable(settings.kind.to_string()));
        }
        Ok(Self {
            settings,
            diagnostics,
        })
    }

    /// Adapter on the always-available pure-Rust backend
    pub fn microlp(diagnostics: DiagnosticsSink) -> Self {
        Self {
            settings: SolverSettings::default(),
            diagnostics,
        }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Solve and turn every non-optimal outcome into a typed error, after
    /// dumping the program for inspection.
    pub fn solve_or_dump(&self, program: &LinearProgram) -> Result<SolvedProgram, PlannerError> {
        match self.solve(program) {
            SolveOutcome::Optimal(solved) => Ok(solved),
            SolveOutcome::Infeasible => {
                let artifact = self.diagnostics.dump(program, ArtifactKind::Infeasible);
                warn!(artifact = ?artifact, "INFEASIBLE charging model");
                Err(PlannerError::Infeasible { artifact })
            }
            SolveOutcome::Failed { status } => {
                let artifact = self.diagnostics.dump(program, ArtifactKind::Failure);
                warn!(%status, artifact = ?artifact, "solver did not reach an optimal solution");
                Err(PlannerError::SolverFailure { status, artifact })
            }
        }
    }

    /// Run the configured backend and classify its termination
    pub fn solve(&self, program: &LinearProgram) -> SolveOutcome {
        let started = Instant::now();
        let (vars, handles) = declare_variables(program);
        let objective = to_expression(&program.objective, &handles);
        let constraints: Vec<Constraint> = program
            .constraints
            .iter()
            .map(|c| {
                let lhs = to_expression(&c.expr, &handles);
                match c.sense {
                    ConstraintSense::Le => good_lp::constraint::leq(lhs, c.rhs),
                    ConstraintSense::Ge => good_lp::constraint::geq(lhs, c.rhs),
                    ConstraintSense::Eq => good_lp::constraint::eq(lhs, c.rhs),
                }
            })
            .collect();

        let result = self.dispatch(vars, objective, constraints, &handles);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(values) => {
                let objective = program.objective.evaluate(&values);
                info!(solver = %self.settings.kind, elapsed_ms, objective, "optimal solution found");
                SolveOutcome::Optimal(SolvedProgram::new(values, objective))
            }
            Err(ResolutionError::Infeasible) => {
                info!(solver = %self.settings.kind, elapsed_ms, "solver reports infeasible");
                SolveOutcome::Infeasible
            }
            Err(ResolutionError::Unbounded) => SolveOutcome::Failed {
                status: "unbounded".to_string(),
            },
            Err(other) => SolveOutcome::Failed {
                status: other.to_string(),
            },
        }
    }

    fn dispatch(
        &self,
        vars: ProblemVariables,
        objective: Expression,
        constraints: Vec<Constraint>,
        handles: &[Variable],
    ) -> Result<Vec<f64>, ResolutionError> {
        let unsolved = vars.minimise(objective);

        match self.settings.kind {
            SolverKind::Microlp => {
                if self.settings.verbose || self.settings.time_limit_seconds.is_some() {
                    debug!("microlp backend has no trace output or time limit; settings ignored");
                }
                run_model(unsolved.using(good_lp::microlp), constraints, handles)
            }
            #[cfg(feature = "cbc")]
            SolverKind::Cbc => {
                let mut model = unsolved.using(good_lp::coin_cbc);
                model.set_parameter("logLevel", if self.settings.verbose { "1" } else { "0" });
                if let Some(secs) = self.settings.time_limit_seconds {
                    model.set_parameter("seconds", &secs.to_string());
                }
                run_model(model, constraints, handles)
            }
            #[cfg(feature = "highs")]
            SolverKind::Highs => {
                let mut model = unsolved
                    .using(good_lp::highs)
                    .set_verbose(self.settings.verbose);
                if let Some(secs) = self.settings.time_limit_seconds {
                    model = model.set_time_limit(secs as f64);
                }
                run_model(model, constraints, handles)
            }
            #[allow(unreachable_patterns)]
            other => Err(ResolutionError::Str(format!(
                "solver '{other}' is not compiled into this build"
            ))),
        }
    }
}

fn declare_variables(program: &LinearProgram) -> (ProblemVariables, Vec<Variable>) {
    let mut vars = ProblemVariables::new();
    let handles = program
        .variables
        .iter()
        .map(|def| {
            let mut definition = variable().name(def.name.clone());
            if def.kind == VarKind::Binary {
                definition = definition.binary();
            }
            if let Some(lower) = def.lower {
                definition = definition.min(lower);
            }
            if let Some(upper) = def.upper {
                definition = definition.max(upper);
            }
            vars.add(definition)
        })
        .collect();
    (vars, handles)
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for (id, coef) in &expr.terms {
        out += handles[id.0] * *coef;
    }
    out
}

fn run_model<M>(
    mut model: M,
    constraints: Vec<Constraint>,
    handles: &[Variable],
) -> Result<Vec<f64>, ResolutionError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for constraint in constraints {
        model.add_constraint(constraint);
    }
    let solution = model.solve()?;
    Ok(handles.iter().map(|v| solution.value(*v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::program::VarDef;
    use rstest::rstest;

    fn adapter() -> SolverAdapter {
        SolverAdapter::microlp(DiagnosticsSink::disabled())
    }

    #[rstest]
    #[case("microlp", SolverKind::Microlp)]
    #[case("CBC", SolverKind::Cbc)]
    #[case("highs", SolverKind::Highs)]
    fn test_parse_solver_id(#[case] id: &str, #[case] expected: SolverKind) {
        assert_eq!(SolverKind::from_id(id).unwrap(), expected);
    }

    #[test]
    fn test_unknown_solver() {
        assert!(matches!(
            SolverKind::from_id("gurobi"),
            Err(ConfigError::UnknownSolver(_))
        ));
        assert_eq!(SolverKind::default().to_string(), "microlp");
    }

    #[cfg(not(feature = "cbc"))]
    #[test]
    fn test_unavailable_backend_is_config_error() {
        let settings = SolverSettings {
            kind: SolverKind::Cbc,
            ..SolverSettings::default()
        };
        assert!(matches!(
            SolverAdapter::new(settings, DiagnosticsSink::disabled()),
            Err(ConfigError::SolverUnavailable(_))
        ));
    }

    #[test]
    fn test_small_mip_is_optimal() {
        // min -x - y  s.t. x + y <= 1.5, y binary, x <= 1
        let mut lp = LinearProgram::new("mip");
        let x = lp.add_variable(VarDef::non_negative("x").with_upper(1.0));
        let y = lp.add_variable(VarDef::binary("y"));
        lp.objective = LinearExpr::term(x, -1.0).add_term(y, -2.0);
        lp.add_constraint(
            "cap",
            LinearExpr::term(x, 1.0).add_term(y, 1.0),
            ConstraintSense::Le,
            1.5,
        );

        match adapter().solve(&lp) {
            SolveOutcome::Optimal(solved) => {
                assert!((solved.value(y) - 1.0).abs() < 1e-6);
                assert!((solved.value(x) - 0.5).abs() < 1e-6);
                assert!((solved.objective() + 2.5).abs() < 1e-6);
            }
            other => panic!("expected optimal, got {other:?}"),
        }
    }

    #[test]
    fn test_infeasible_is_classified() {
        let mut lp = LinearProgram::new("bad");
        let x = lp.add_variable(VarDef::non_negative("x"));
        lp.objective = LinearExpr::term(x, 1.0);
        lp.add_constraint("neg", LinearExpr::term(x, 1.0), ConstraintSense::Le, -1.0);

        assert!(matches!(adapter().solve(&lp), SolveOutcome::Infeasible));
        assert!(matches!(
            adapter().solve_or_dump(&lp),
            Err(PlannerError::Infeasible { artifact: None })
        ));
    }

    #[test]
    fn test_unbounded_dumps_failure_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let diagnostics = DiagnosticsSink::from_config(&crate::config::DiagnosticsConfig {
            dir: tmp.path().to_path_buf(),
            ..Default::default()
        });
        let adapter = SolverAdapter::microlp(diagnostics);
        assert_eq!(adapter.settings().kind, SolverKind::Microlp);

        // min -x  s.t. x >= 0
        let mut lp = LinearProgram::new("open");
        let x = lp.add_variable(VarDef::non_negative("x"));
        lp.objective = LinearExpr::term(x, -1.0);

        match adapter.solve_or_dump(&lp) {
            Err(PlannerError::SolverFailure {
                status,
                artifact: Some(path),
            }) => {
                assert_eq!(status, "unbounded");
                assert!(path.ends_with("failure.lp"));
                assert!(path.exists());
            }
            other => panic!("expected solver failure with dump, got {other:?}"),
        }
        assert!(!tmp.path().join("infeasible.lp").exists());
    }
}
