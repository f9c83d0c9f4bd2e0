use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use super::lp_format::write_lp;
use super::program::LinearProgram;
use crate::config::DiagnosticsConfig;

/// Which failure an artifact documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Infeasible,
    Failure,
}

/// Writes LP dumps of programs that did not solve to optimality
#[derive(Debug, Clone)]
pub struct DiagnosticsSink {
    enabled: bool,
    dir: PathBuf,
    infeasible_file: String,
    failure_file: String,
    unique_names: bool,
}

impl DiagnosticsSink {
    pub fn from_config(cfg: &DiagnosticsConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            dir: cfg.dir.clone(),
            infeasible_file: cfg.infeasible_file.clone(),
            failure_file: cfg.failure_file.clone(),
            unique_names: cfg.unique_names,
        }
    }

    /// A sink that never writes
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::from_config(&DiagnosticsConfig::default())
        }
    }

    /// Path the next artifact of `kind` goes to. With unique names each call
    /// yields a fresh path so concurrent invocations never share a file.
    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        let file = match kind {
            ArtifactKind::Infeasible => &self.infeasible_file,
            ArtifactKind::Failure => &self.failure_file,
        };
        if !self.unique_names {
            return self.dir.join(file);
        }

        let path = Path::new(file);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("model");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("lp");
        self.dir.join(format!("{stem}-{}.{ext}", Uuid::new_v4().simple()))
    }

    /// Dump `program`; returns the written path, or `None` when disabled or
    /// when writing failed.
    pub fn dump(&self, program: &LinearProgram, kind: ArtifactKind) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }

        let path = self.artifact_path(kind);
        match write_artifact(&path, program) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to write model dump");
                None
            }
        }
    }
}

fn write_artifact(path: &Path, program: &LinearProgram) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_lp(program, &mut writer)?;
    writer.flush()
}
