//! Audit orchestration: discovery, per-template audit, aggregation, rendering.

use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn, Dispatch};

use crate::catalog::{CatalogError, RuleCatalog};
use crate::config::{Config, ConfigError};
use crate::discovery::{DiscoveryError, TemplateDiscovery};
use crate::model::CfnParser;
use crate::profile::{Profile, ProfileDefinition, ProfileError, ProfileKind};
use crate::render::{renderer_for, RenderError};
use crate::rule::{RuleBox, RuleDefinition};
use crate::types::{AuditReport, FileResults, TemplateResults, Violation};

/// Errors that abort an audit run.
///
/// Problems with individual templates never surface here; they become
/// violations of that template.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum AuditError {
    /// Template discovery failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Profile loading failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Profile(#[from] ProfileError),

    /// Renderer selection or rendering failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    /// Rule registration or rule file loading failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    /// Configuration is invalid.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// The dedicated worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    #[diagnostic(code(cfn_audit::auditor::thread_pool))]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Builder for configuring an [`Auditor`].
#[derive(Default)]
pub struct AuditorBuilder {
    catalog: RuleCatalog,
    extra_rules: Vec<RuleBox>,
    profile_definitions: Vec<ProfileDefinition>,
    config: Option<Config>,
    exclude_patterns: Vec<String>,
    parallelism: Option<usize>,
    dispatch: Option<Dispatch>,
}

impl AuditorBuilder {
    /// Creates a new builder with an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses this catalog as the base rule set.
    #[must_use]
    pub fn catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Adds a rule on top of the catalog.
    #[must_use]
    pub fn rule(mut self, rule: RuleBox) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Adds a rule set on top of the catalog.
    #[must_use]
    pub fn rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = RuleBox>,
    {
        self.extra_rules.extend(rules);
        self
    }

    /// Adds a profile definition.
    #[must_use]
    pub fn profile_definition(mut self, definition: ProfileDefinition) -> Self {
        self.profile_definitions.push(definition);
        self
    }

    /// Sets the configuration.
    ///
    /// Its rule directory, profile files, rule overrides, discovery settings
    /// and parallelism are applied at build time.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds an exclude glob pattern for discovery.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Sets how many templates are audited concurrently.
    ///
    /// Takes precedence over the configuration value.
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Routes the auditor's log events to this dispatcher.
    #[must_use]
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Builds the auditor.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule file, profile, exclude pattern, or the
    /// worker pool cannot be set up.
    pub fn build(self) -> Result<Auditor, AuditError> {
        let config = self.config.unwrap_or_default();
        let dispatch = self.dispatch;

        let build = || -> Result<Auditor, AuditError> {
            let mut catalog = self.catalog;
            for rule in self.extra_rules {
                catalog.register(rule)?;
            }
            if let Some(dir) = &config.audit.rule_directory {
                let loaded = catalog.load_rule_directory(dir)?;
                info!("Loaded {} custom rule(s) from {}", loaded, dir.display());
            }
            config.apply_to(&mut catalog);

            let mut definitions = self.profile_definitions;
            if let Some(path) = &config.audit.profile {
                definitions.push(ProfileDefinition::from_file(ProfileKind::Allow, path)?);
            }
            if let Some(path) = &config.audit.deny_list {
                definitions.push(ProfileDefinition::from_file(ProfileKind::Deny, path)?);
            }
            let profile = if definitions.is_empty() {
                None
            } else {
                Some(Profile::load(&definitions, &catalog.rule_definitions())?)
            };

            let discovery = TemplateDiscovery::new()
                .extensions(config.audit.extensions.iter().cloned())
                .excludes(config.audit.exclude.iter().chain(&self.exclude_patterns))?;

            let execution = match self.parallelism.or(config.audit.parallelism) {
                Some(0 | 1) => Execution::Sequential,
                Some(threads) => Execution::Pool(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .thread_name(|i| format!("cfn-audit-{i}"))
                        .build()?,
                ),
                None => Execution::Global,
            };

            debug!(
                "Auditor ready: {} rule(s), profile: {}",
                catalog.len(),
                profile.is_some()
            );

            Ok(Auditor {
                catalog,
                profile,
                discovery,
                execution,
                parser: CfnParser::new(),
                default_format: config.audit.output_format.clone(),
                dispatch: None,
            })
        };

        let mut auditor = match &dispatch {
            Some(d) => tracing::dispatcher::with_default(d, build)?,
            None => build()?,
        };
        auditor.dispatch = dispatch;
        Ok(auditor)
    }
}

enum Execution {
    Sequential,
    Global,
    Pool(rayon::ThreadPool),
}

/// Audits templates against a rule catalog.
///
/// Use [`Auditor::builder()`] to construct an instance. An auditor is
/// immutable once built and can be shared across threads.
pub struct Auditor {
    catalog: RuleCatalog,
    profile: Option<Profile>,
    discovery: TemplateDiscovery,
    execution: Execution,
    parser: CfnParser,
    default_format: String,
    dispatch: Option<Dispatch>,
}

impl Auditor {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> AuditorBuilder {
        AuditorBuilder::new()
    }

    /// Definitions of every rule in the catalog.
    #[must_use]
    pub fn rule_definitions(&self) -> Vec<RuleDefinition> {
        self.catalog.rule_definitions()
    }

    /// Output format from the configuration.
    #[must_use]
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    /// Audits one template's text.
    ///
    /// An unparseable template yields a single `FATAL` violation and no rule
    /// runs. Otherwise every enabled rule runs and the profile, if any,
    /// filters the result.
    #[must_use]
    pub fn audit(&self, template: &str) -> FileResults {
        self.in_scope(|| self.audit_text(template))
    }

    /// Reads and audits one template file.
    #[must_use]
    pub fn audit_file(&self, path: &Path) -> TemplateResults {
        self.in_scope(|| self.audit_path(path))
    }

    /// Audits every template under `input`, preserving discovery order.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails; nothing is audited in that case.
    pub fn audit_aggregate_across_files(&self, input: &Path) -> Result<AuditReport, AuditError> {
        self.in_scope(|| {
            info!("Starting audit at {}", input.display());
            let templates = self.discovery.discover(input)?;
            info!("Found {} template(s) to audit", templates.len());

            let results = self.audit_all(&templates);
            let report = AuditReport::new(results);

            info!(
                "Audit complete: {} failure(s), {} warning(s) in {} template(s)",
                report.failure_count(),
                report.warning_count(),
                report.len()
            );
            Ok(report)
        })
    }

    /// Audits every template under `input` and renders the report.
    ///
    /// The renderer is looked up before any template is read. Returns the
    /// total failure count.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is unknown, discovery fails, or
    /// rendering fails.
    pub fn audit_aggregate_across_files_and_render(
        &self,
        input: &Path,
        format: &str,
        out: &mut dyn Write,
    ) -> Result<usize, AuditError> {
        let renderer = renderer_for(format)?;
        let report = self.audit_aggregate_across_files(input)?;
        renderer.render(&report, out)?;
        Ok(report.failure_count())
    }

    fn audit_all(&self, templates: &[PathBuf]) -> Vec<TemplateResults> {
        match &self.execution {
            Execution::Sequential => templates.iter().map(|p| self.audit_path(p)).collect(),
            Execution::Global => templates
                .par_iter()
                .map(|p| self.in_scope(|| self.audit_path(p)))
                .collect(),
            Execution::Pool(pool) => pool.install(|| {
                templates
                    .par_iter()
                    .map(|p| self.in_scope(|| self.audit_path(p)))
                    .collect()
            }),
        }
    }

    fn audit_path(&self, path: &Path) -> TemplateResults {
        debug!("Auditing: {}", path.display());
        let file_results = match std::fs::read_to_string(path) {
            Ok(text) => self.audit_text(&text),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                FileResults::new(vec![Violation::fatal(format!(
                    "failed to read template: {e}"
                ))])
            }
        };
        TemplateResults::new(path, file_results)
    }

    fn audit_text(&self, template: &str) -> FileResults {
        let model = match self.parser.parse(template) {
            Ok(model) => model,
            Err(e) => {
                debug!("Template failed to parse: {}", e);
                return FileResults::new(vec![Violation::fatal(e.to_string())]);
            }
        };

        let mut violations = self.catalog.execute(&model);
        if let Some(profile) = &self.profile {
            violations.retain(|v| profile.execute_rule(v.id()));
        }
        FileResults::new(violations)
    }

    /// Runs `f` with the configured dispatcher as the thread's default.
    fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CfnModel;
    use crate::rule::{Rule, RuleError};
    use crate::types::ViolationType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Flags every resource of one type.
    struct FlagType {
        id: &'static str,
        violation_type: ViolationType,
        resource_type: &'static str,
    }

    impl Rule for FlagType {
        fn id(&self) -> &str {
            self.id
        }
        fn description(&self) -> &str {
            "flagged"
        }
        fn violation_type(&self) -> ViolationType {
            self.violation_type
        }
        fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
            Ok(self.violations_for(
                model
                    .resources_by_type(self.resource_type)
                    .map(|r| r.logical_id.clone()),
            ))
        }
    }

    fn rules() -> Vec<RuleBox> {
        vec![
            Box::new(FlagType {
                id: "F9",
                violation_type: ViolationType::FailingViolation,
                resource_type: "AWS::S3::Bucket",
            }),
            Box::new(FlagType {
                id: "W9",
                violation_type: ViolationType::Warning,
                resource_type: "AWS::SQS::Queue",
            }),
        ]
    }

    const MIXED: &str = r"
Resources:
  Bucket:
    Type: AWS::S3::Bucket
  Queue:
    Type: AWS::SQS::Queue
";

    const CLEAN: &str = r#"{"Resources": {"Topic": {"Type": "AWS::SNS::Topic"}}}"#;

    fn auditor() -> Auditor {
        Auditor::builder().rules(rules()).build().unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parse_failure_short_circuits() {
        let results = auditor().audit("{ not json");
        assert_eq!(results.violations().len(), 1);
        assert!(results.violations()[0].is_fatal());
        assert_eq!(results.failure_count(), 1);
    }

    #[test]
    fn failing_and_warning_without_profile() {
        let results = auditor().audit(MIXED);
        let ids: Vec<&str> = results.violations().iter().map(Violation::id).collect();
        assert_eq!(ids, vec!["F9", "W9"]);
        assert_eq!(results.failure_count(), 1);
        assert_eq!(results.warning_count(), 1);
    }

    #[test]
    fn profile_only_filters() {
        let auditor = Auditor::builder()
            .rules(rules())
            .profile_definition(ProfileDefinition::parse(ProfileKind::Deny, "F9"))
            .build()
            .unwrap();

        let unfiltered = self::auditor().audit(MIXED);
        let filtered = auditor.audit(MIXED);

        assert_eq!(filtered.failure_count(), 0);
        assert_eq!(filtered.violations().len(), 1);
        assert!(unfiltered.violations().contains(&filtered.violations()[0]));
    }

    #[test]
    fn allow_everything_profile_matches_no_profile() {
        let with_profile = Auditor::builder()
            .rules(rules())
            .profile_definition(ProfileDefinition::parse(ProfileKind::Allow, "F9, W9"))
            .build()
            .unwrap();

        assert_eq!(with_profile.audit(MIXED), auditor().audit(MIXED));
        assert_eq!(with_profile.audit(CLEAN), auditor().audit(CLEAN));
    }

    #[test]
    fn profile_does_not_affect_fatal() {
        let auditor = Auditor::builder()
            .rules(rules())
            .profile_definition(ProfileDefinition::parse(ProfileKind::Allow, "W9"))
            .build()
            .unwrap();
        assert!(auditor.audit("[1, 2").violations()[0].is_fatal());
    }

    #[test]
    fn unknown_profile_id_fails_build() {
        let result = Auditor::builder()
            .rules(rules())
            .profile_definition(ProfileDefinition::parse(ProfileKind::Allow, "W404"))
            .build();
        assert!(matches!(
            result,
            Err(AuditError::Profile(ProfileError::UnknownRuleId { .. }))
        ));
    }

    #[test]
    fn aggregate_preserves_order_and_totals() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.yaml", MIXED);
        write(dir.path(), "b.json", "{ broken");
        write(dir.path(), "c.json", CLEAN);
        write(dir.path(), "d.yml", MIXED);

        for threads in [1, 3] {
            let auditor = Auditor::builder()
                .rules(rules())
                .parallelism(threads)
                .build()
                .unwrap();
            let report = auditor.audit_aggregate_across_files(dir.path()).unwrap();

            let names: Vec<String> = report
                .results()
                .iter()
                .map(|r| r.filename().file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            assert_eq!(names, vec!["a.yaml", "b.json", "c.json", "d.yml"]);

            let per_template: Vec<usize> = report
                .results()
                .iter()
                .map(|r| r.file_results.failure_count())
                .collect();
            assert_eq!(per_template, vec![1, 1, 0, 1]);
            assert_eq!(report.failure_count(), 3);
        }
    }

    #[test]
    fn valid_and_unparseable_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", CLEAN);
        write(dir.path(), "b.json", "{");

        let report = auditor().audit_aggregate_across_files(dir.path()).unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.results()[0].file_results.violations().is_empty());
        let b = report.results()[1].file_results.violations();
        assert_eq!(b.len(), 1);
        assert!(b[0].is_fatal());
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn unsupported_format_fails_before_audit() {
        let mut out = Vec::new();
        let err = auditor()
            .audit_aggregate_across_files_and_render(
                Path::new("/nonexistent/templates"),
                "xml",
                &mut out,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::Render(RenderError::UnsupportedFormat { .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn render_returns_total() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "stack.yaml", MIXED);

        let mut out = Vec::new();
        let total = auditor()
            .audit_aggregate_across_files_and_render(&file, "json", &mut out)
            .unwrap();
        assert_eq!(total, 1);

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["file_results"]["failure_count"], 1);
    }

    #[test]
    fn missing_input_is_discovery_error() {
        let err = auditor()
            .audit_aggregate_across_files(Path::new("/nonexistent/templates"))
            .unwrap_err();
        assert!(matches!(err, AuditError::Discovery(DiscoveryError::NotFound { .. })));
    }

    #[test]
    fn unreadable_template_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let results = auditor().audit_file(&path);
        assert_eq!(results.file_results.failure_count(), 1);
        assert!(results.file_results.violations()[0]
            .message()
            .starts_with("failed to read template"));
    }

    #[test]
    fn config_drives_rules_and_profile() {
        let dir = TempDir::new().unwrap();
        let rules_dir = dir.path().join("rules");
        std::fs::create_dir(&rules_dir).unwrap();
        write(
            &rules_dir,
            "queues.toml",
            r#"
[[require-property]]
id = "C1"
resource-type = "AWS::SQS::Queue"
path = "KmsMasterKeyId"
message = "queues should be encrypted"
"#,
        );
        write(dir.path(), "deny.txt", "W9\n");
        let config_path = write(
            dir.path(),
            "cfn-audit.toml",
            "[audit]\nrule_directory = \"rules\"\ndeny_list = \"deny.txt\"\n\n[rules.F9]\nenabled = false\n",
        );

        let auditor = Auditor::builder()
            .rules(rules())
            .config(Config::from_file(&config_path).unwrap())
            .build()
            .unwrap();

        let results = auditor.audit(MIXED);
        let ids: Vec<&str> = results.violations().iter().map(Violation::id).collect();
        assert_eq!(ids, vec!["C1"]);
    }

    #[test]
    fn exclude_applies_to_discovery() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "keep.json", CLEAN);
        write(dir.path(), "skip.json", CLEAN);

        let auditor = Auditor::builder().exclude("skip.*").build().unwrap();
        let report = auditor.audit_aggregate_across_files(dir.path()).unwrap();
        assert_eq!(report.len(), 1);
    }

    /// Counts events delivered to it.
    struct CountingSubscriber(Arc<AtomicUsize>);

    impl tracing::Subscriber for CountingSubscriber {
        fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _span: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }
        fn record(&self, _span: &tracing::span::Id, _values: &tracing::span::Record<'_>) {}
        fn record_follows_from(&self, _span: &tracing::span::Id, _follows: &tracing::span::Id) {}
        fn event(&self, _event: &tracing::Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn enter(&self, _span: &tracing::span::Id) {}
        fn exit(&self, _span: &tracing::span::Id) {}
    }

    #[test]
    fn dispatch_receives_events_from_workers() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", CLEAN);
        write(dir.path(), "b.json", CLEAN);

        let count = Arc::new(AtomicUsize::new(0));
        let auditor = Auditor::builder()
            .rules(rules())
            .parallelism(2)
            .dispatch(Dispatch::new(CountingSubscriber(Arc::clone(&count))))
            .build()
            .unwrap();

        let before = count.load(Ordering::SeqCst);
        auditor.audit_aggregate_across_files(dir.path()).unwrap();
        // two run-level events, discovery, plus per-template and per-rule events
        assert!(count.load(Ordering::SeqCst) - before > 4);
    }
}
