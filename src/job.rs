//! Job descriptors and the registry of runnable jobs.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use sync_core::{RowSet, SyncError};

use crate::connect::{ConnectionRegistry, Role};
use crate::source::{Source, SourceKind};
use crate::target::{TargetTable, WriteMode};

/// What a transform receives: the pending dates and one row set per
/// source, in declaration order.
#[derive(Debug, Clone)]
pub struct SourceData {
    pub job: String,
    pub pending_dates: Vec<NaiveDate>,
    pub sources: Vec<RowSet>,
}

impl SourceData {
    /// Rows fetched by the `index`-th source.
    pub fn source(&self, index: usize) -> Result<&RowSet, SyncError> {
        self.sources.get(index).ok_or_else(|| {
            SyncError::Shape(format!(
                "job '{}' has {} source(s), no source #{index}",
                self.job,
                self.sources.len()
            ))
        })
    }
}

/// One entry per target: the rows to write, or `None` for no result.
pub type TransformResult = anyhow::Result<Vec<Option<RowSet>>>;

/// Job-specific logic turning source rows into target rows.
///
/// Must return exactly one entry per target, in target order. `None`
/// means "no result for this target": nothing is written to it and the
/// job's completion commit is suppressed for this run.
pub trait Transform: Send + Sync {
    fn transform(&self, input: &SourceData) -> TransformResult;
}

impl<F> Transform for F
where
    F: Fn(&SourceData) -> TransformResult + Send + Sync,
{
    fn transform(&self, input: &SourceData) -> TransformResult {
        self(input)
    }
}

/// One named synchronization task.
///
/// The name is also the completion-record key and the state-matrix column.
#[derive(Clone)]
pub struct Job {
    name: String,
    sources: Vec<Source>,
    targets: Vec<TargetTable>,
    transform: Arc<dyn Transform>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("sources", &self.sources)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl Job {
    pub fn new(name: impl Into<String>, transform: impl Transform + 'static) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            targets: Vec::new(),
            transform: Arc::new(transform),
        }
    }

    /// A job whose single target receives its single source unchanged.
    pub fn copy(name: impl Into<String>, source: Source, target: TargetTable) -> Self {
        Self::new(name, |input: &SourceData| -> TransformResult {
            Ok(vec![Some(input.source(0)?.clone())])
        })
        .source(source)
        .target(target)
    }

    pub fn source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn target(mut self, target: TargetTable) -> Self {
        self.targets.push(target);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn targets(&self) -> &[TargetTable] {
        &self.targets
    }

    pub fn transform(&self) -> &dyn Transform {
        self.transform.as_ref()
    }

    /// Check every connection alias resolves and every variant is usable.
    pub fn validate(&self, connections: &ConnectionRegistry) -> Result<(), SyncError> {
        let config_err = |msg: String| SyncError::Config(format!("job '{}': {msg}", self.name));

        for source in &self.sources {
            connections
                .resolve(source.db.as_deref(), Role::Source)
                .map_err(|e| config_err(e.to_string()))?;
            if let SourceKind::Join(join) = &source.kind {
                if join.relations.is_empty() {
                    return Err(config_err("join source without relations".to_string()));
                }
            }
        }
        for target in &self.targets {
            connections
                .resolve(target.db.as_deref(), Role::Target)
                .map_err(|e| config_err(e.to_string()))?;
            if let WriteMode::Upsert { key } = &target.mode {
                if key.is_empty() {
                    return Err(config_err(format!(
                        "upsert target '{}' has no key columns",
                        target.table
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Every job the process knows how to run, in registration order.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job. Names must be unique.
    pub fn register(&mut self, job: Job) -> Result<&mut Self, SyncError> {
        if self.get(job.name()).is_some() {
            return Err(SyncError::Config(format!(
                "job '{}' registered twice",
                job.name()
            )));
        }
        self.jobs.push(job);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.name.clone()).collect()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Validate every registered job against `connections`.
    pub fn validate(&self, connections: &ConnectionRegistry) -> Result<(), SyncError> {
        self.jobs.iter().try_for_each(|job| job.validate(connections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryConnection;

    fn connections() -> ConnectionRegistry {
        let mut registry = ConnectionRegistry::new();
        registry.register_in_role(Role::Source, "ods", true, Arc::new(MemoryConnection::new("ods")));
        registry.register_in_role(Role::Target, "dw", true, Arc::new(MemoryConnection::new("dw")));
        registry
    }

    #[test]
    fn test_duplicate_job_rejected() {
        let mut registry = JobRegistry::new();
        registry
            .register(Job::copy("a", Source::table("s"), TargetTable::new("t")))
            .unwrap();
        let err = registry
            .register(Job::copy("a", Source::table("s"), TargetTable::new("t")))
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert_eq!(registry.names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_validate_unknown_alias() {
        let mut registry = JobRegistry::new();
        registry
            .register(Job::copy(
                "a",
                Source::table("s").db("missing"),
                TargetTable::new("t"),
            ))
            .unwrap();
        let err = registry.validate(&connections()).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validate_upsert_without_key() {
        let job = Job::copy(
            "a",
            Source::table("s"),
            TargetTable::new("t").upsert(Vec::<String>::new()),
        );
        assert!(matches!(job.validate(&connections()), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_copy_transform_passes_source_through() {
        let job = Job::copy("a", Source::table("s"), TargetTable::new("t"));
        let rows = RowSet::new(["date"])
            .with_row([sync_core::Value::text("2024-01-01")])
            .unwrap();
        let input = SourceData {
            job: "a".to_string(),
            pending_dates: vec![],
            sources: vec![rows.clone()],
        };
        let output = job.transform().transform(&input).unwrap();
        assert_eq!(output, vec![Some(rows)]);
    }
}
