//! CPLEX LP text format writer
//!
//! Used to dump a program that failed to solve so it can be inspected by
//! hand or replayed in another solver. Names stay symbolic: `soc[2,5]` is
//! written as `soc(2_5)`.

use itertools::Itertools;
use std::io::{self, Write};

use super::program::{LinearExpr, LinearProgram, VarKind};

const TERMS_PER_LINE: usize = 6;

/// Map a symbolic name to an LP-legal identifier
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' => '(',
            ']' => ')',
            ',' => '_',
            ' ' | ':' | '+' | '-' | '*' | '^' | '<' | '>' | '=' => '_',
            other => other,
        })
        .collect()
}

fn format_number(value: f64) -> String {
    if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{value}")
    }
}

fn format_expr(program: &LinearProgram, expr: &LinearExpr) -> String {
    if expr.terms.is_empty() {
        return "0".to_string();
    }

    let terms = expr.terms.iter().enumerate().map(|(i, (var, coef))| {
        let name = sanitize_name(&program.variable(*var).name);
        let sign = if *coef < 0.0 { "-" } else { "+" };
        let magnitude = coef.abs();
        let body = if magnitude == 1.0 {
            name
        } else {
            format!("{} {name}", format_number(magnitude))
        };
        match (i, sign) {
            (0, "+") => body,
            (0, _) => format!("- {body}"),
            _ => format!("{sign} {body}"),
        }
    });

    let chunks = terms.chunks(TERMS_PER_LINE);
    let lines: Vec<String> = chunks.into_iter().map(|mut chunk| chunk.join(" ")).collect();
    lines.join("\n   ")
}

/// Write `program` in LP format
pub fn write_lp<W: Write>(program: &LinearProgram, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "\\ Problem: {}", sanitize_name(&program.name))?;
    writeln!(writer, "Minimize")?;
    let mut objective = format_expr(program, &program.objective);
    if program.objective.constant != 0.0 {
        objective.push_str(&format!(" + {}", format_number(program.objective.constant)));
    }
    writeln!(writer, " obj: {objective}")?;

    writeln!(writer, "Subject To")?;
    for constraint in &program.constraints {
        let rhs = constraint.rhs - constraint.expr.constant;
        writeln!(
            writer,
            " {}: {} {} {}",
            sanitize_name(&constraint.name),
            format_expr(program, &constraint.expr),
            constraint.sense.symbol(),
            format_number(rhs)
        )?;
    }

    writeln!(writer, "Bounds")?;
    for var in program.variables.iter().filter(|v| v.kind == VarKind::Continuous) {
        let name = sanitize_name(&var.name);
        match (var.lower, var.upper) {
            (Some(lower), None) if lower == 0.0 => {}
            (None, None) => writeln!(writer, " {name} free")?,
            (lower, upper) => writeln!(
                writer,
                " {} <= {name} <= {}",
                format_number(lower.unwrap_or(f64::NEG_INFINITY)),
                format_number(upper.unwrap_or(f64::INFINITY))
            )?,
        }
    }

    let binaries: Vec<String> = program
        .variables
        .iter()
        .filter(|v| v.kind == VarKind::Binary)
        .map(|v| sanitize_name(&v.name))
        .collect();
    if !binaries.is_empty() {
        writeln!(writer, "Binaries")?;
        for chunk in binaries.chunks(TERMS_PER_LINE) {
            writeln!(writer, " {}", chunk.join(" "))?;
        }
    }

    writeln!(writer, "End")
}

pub fn to_lp_string(program: &LinearProgram) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec<u8> cannot fail
    let _ = write_lp(program, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
