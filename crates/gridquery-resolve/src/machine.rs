//! The resolution state machine.
//!
//! ```text
//!   ClassifyIntent ──► ResolveSchema ──► Execute ──► Done
//! ```
//!
//! Each call to [`ResolutionRun::evaluate`] tries the current step only. The
//! step advances only when its gate accepts; a rejection leaves the state
//! exactly as it was, so the driver can retry the same step with another
//! candidate thought. There are no backward edges and nothing leaves `Done`.

use crate::config::ResolverConfig;
use crate::entities::{EntityExtractor, EntityValidator, KnownEntities};
use crate::error::{ResolveError, StoreError};
use crate::graph::GraphStore;
use crate::intent::IntentClassifier;
use crate::relational::RelationalStore;
use crate::render::{self, ResponseRenderer};
use crate::schema::SchemaResolver;
use crate::synthesis::QuerySynthesizer;
use crate::time::TimeResolver;
use crate::{EntityBag, Intent, SchemaBinding, ThoughtValidity};
use gridquery_sql::{QueryValidator, ResultRow, SqlQuery};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ClassifyIntent,
    ResolveSchema,
    Execute,
    Done,
}

impl Step {
    pub fn index(&self) -> Option<usize> {
        match self {
            Step::ClassifyIntent => Some(0),
            Step::ResolveSchema => Some(1),
            Step::Execute => Some(2),
            Step::Done => None,
        }
    }

    fn next(self) -> Step {
        match self {
            Step::ClassifyIntent => Step::ResolveSchema,
            Step::ResolveSchema => Step::Execute,
            Step::Execute | Step::Done => Step::Done,
        }
    }
}

/// Everything a run has committed so far. Fields only ever go from `None` to
/// `Some`, in step order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionState {
    step: Step,
    intent: Option<Intent>,
    entities: Option<EntityBag>,
    binding: Option<SchemaBinding>,
    query: Option<SqlQuery>,
    rows: Vec<ResultRow>,
}

impl ResolutionState {
    fn new() -> Self {
        Self {
            step: Step::ClassifyIntent,
            intent: None,
            entities: None,
            binding: None,
            query: None,
            rows: Vec::new(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn entities(&self) -> Option<&EntityBag> {
        self.entities.as_ref()
    }

    pub fn binding(&self) -> Option<&SchemaBinding> {
        self.binding.as_ref()
    }

    pub fn query(&self) -> Option<&SqlQuery> {
        self.query.as_ref()
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }
}

/// One entry per `evaluate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraceEvent {
    Accepted {
        step: Step,
    },
    Rejected {
        step: Step,
        reason: String,
        detail: String,
    },
}

// ============================================================================
// Resolver (shared, read-only)
// ============================================================================

/// Collaborators and rule sets shared by every run.
pub struct QueryResolver {
    graph: Arc<dyn GraphStore>,
    relational: Arc<dyn RelationalStore>,
    config: ResolverConfig,
    known: Arc<KnownEntities>,
    classifier: IntentClassifier,
    extractor: EntityExtractor,
    sql_validator: QueryValidator,
    renderer: ResponseRenderer,
}

impl QueryResolver {
    /// Build a resolver, taking the [`KnownEntities`] snapshot from `graph`.
    pub fn new(
        graph: Arc<dyn GraphStore>,
        relational: Arc<dyn RelationalStore>,
        config: ResolverConfig,
    ) -> Result<Self, StoreError> {
        let known = Arc::new(KnownEntities::load(graph.as_ref())?);
        tracing::info!(known_entities = known.len(), "loaded known entities");
        Ok(Self::with_known_entities(graph, relational, config, known))
    }

    pub fn with_known_entities(
        graph: Arc<dyn GraphStore>,
        relational: Arc<dyn RelationalStore>,
        config: ResolverConfig,
        known: Arc<KnownEntities>,
    ) -> Self {
        Self {
            graph,
            relational,
            sql_validator: QueryValidator::new().strict(config.strict_sql),
            renderer: ResponseRenderer::new(config.clone()),
            config,
            known,
            classifier: IntentClassifier::new(),
            extractor: EntityExtractor::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn known_entities(&self) -> &Arc<KnownEntities> {
        &self.known
    }

    /// Start a fresh run for `query`. Runs never share mutable state.
    pub fn begin(&self, query: impl Into<String>) -> ResolutionRun<'_> {
        let time = match self.config.reference_date {
            Some(day) => TimeResolver::new(day),
            None => TimeResolver::today(),
        };
        ResolutionRun {
            resolver: self,
            id: Uuid::new_v4(),
            query: query.into(),
            state: ResolutionState::new(),
            trace: Vec::new(),
            time,
        }
    }

    /// Walk every step with an empty thought history and render the outcome.
    pub fn answer(&self, query: &str) -> String {
        let mut run = self.begin(query);
        loop {
            match run.try_evaluate(query, &[]) {
                Ok(ThoughtValidity::ValidIntermediate) => continue,
                Ok(ThoughtValidity::ValidFinal) => return run.format_result(),
                Ok(ThoughtValidity::Invalid) => return render::INVALID_QUERY.to_string(),
                Err(ResolveError::EmptyResult) => return render::NO_DATA.to_string(),
                Err(ResolveError::Store(_)) => return render::SYSTEM_ERROR.to_string(),
                Err(_) => return render::INVALID_QUERY.to_string(),
            }
        }
    }
}

// ============================================================================
// Run (per-query, mutable)
// ============================================================================

pub struct ResolutionRun<'r> {
    resolver: &'r QueryResolver,
    id: Uuid,
    query: String,
    state: ResolutionState,
    trace: Vec<TraceEvent>,
    time: TimeResolver,
}

impl<'r> ResolutionRun<'r> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn step(&self) -> Step {
        self.state.step
    }

    pub fn is_done(&self) -> bool {
        self.state.step == Step::Done
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Search-driver entry point. Every failure, including store errors, is
    /// reported as [`ThoughtValidity::Invalid`].
    pub fn evaluate(&mut self, problem: &str, thoughts: &[String]) -> ThoughtValidity {
        self.try_evaluate(problem, thoughts)
            .unwrap_or(ThoughtValidity::Invalid)
    }

    /// Like [`evaluate`](Self::evaluate) but keeps the rejection reason.
    pub fn try_evaluate(
        &mut self,
        problem: &str,
        thoughts: &[String],
    ) -> Result<ThoughtValidity, ResolveError> {
        let step = self.state.step;
        let span = tracing::info_span!("resolution_run", run_id = %self.id, ?step);
        let _enter = span.enter();

        match self.advance(problem) {
            Ok(validity) => {
                tracing::debug!(?validity, next = ?self.state.step, "step accepted");
                self.trace.push(TraceEvent::Accepted { step });
                Ok(validity)
            }
            Err(err) => {
                tracing::warn!(
                    reason = err.label(),
                    error = %err,
                    thoughts = thoughts.len(),
                    "candidate rejected"
                );
                self.trace.push(TraceEvent::Rejected {
                    step,
                    reason: err.label().to_string(),
                    detail: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Render the committed rows. Before a final acceptance there are no rows,
    /// which renders as the no-data text.
    pub fn format_result(&self) -> String {
        match (self.state.intent, self.state.binding.as_ref()) {
            (Some(intent), Some(binding)) => {
                self.resolver
                    .renderer
                    .render(intent, &binding.column_name, &self.state.rows)
            }
            _ => render::NO_DATA.to_string(),
        }
    }

    pub fn into_state(self) -> ResolutionState {
        self.state
    }

    /// Try the current step. State is committed only on success.
    fn advance(&mut self, problem: &str) -> Result<ThoughtValidity, ResolveError> {
        if self.state.step == Step::Done {
            return Err(ResolveError::RunFinished);
        }
        if problem != self.query {
            return Err(ResolveError::ProblemMismatch);
        }

        let resolver = self.resolver;
        let validity = match self.state.step {
            Step::ClassifyIntent => {
                let intent = resolver
                    .classifier
                    .classify(&self.query)
                    .ok_or(ResolveError::Classification)?;
                self.state.intent = Some(intent);
                ThoughtValidity::ValidIntermediate
            }
            Step::ResolveSchema => {
                let intent = self.committed_intent()?;
                let entities = resolver.extractor.extract(&self.query);
                if let Some(slot) = entities.first_missing(intent) {
                    return Err(ResolveError::Extraction { intent, slot });
                }
                EntityValidator::new(Arc::clone(&resolver.known)).validate(&entities)?;
                let binding = SchemaResolver::new(resolver.graph.as_ref(), &resolver.config)
                    .resolve(intent, &entities)?;
                tracing::debug!(table = %binding.table_name, column = %binding.column_name, "schema bound");
                self.state.entities = Some(entities);
                self.state.binding = Some(binding);
                ThoughtValidity::ValidIntermediate
            }
            Step::Execute => {
                let intent = self.committed_intent()?;
                let (Some(entities), Some(binding)) =
                    (self.state.entities.as_ref(), self.state.binding.as_ref())
                else {
                    return Err(ResolveError::Synthesis {
                        intent,
                        reason: "no schema binding committed".to_string(),
                    });
                };
                let query = QuerySynthesizer::new(&resolver.config, self.time)
                    .synthesize(intent, entities, binding)?;
                resolver
                    .sql_validator
                    .validate(&query)
                    .map_err(ResolveError::QuerySyntax)?;
                tracing::debug!(%query, "executing");
                let rows = resolver.relational.execute(&query)?;
                if rows.is_empty() {
                    return Err(ResolveError::EmptyResult);
                }
                self.state.query = Some(query);
                self.state.rows = rows;
                ThoughtValidity::ValidFinal
            }
            Step::Done => return Err(ResolveError::RunFinished),
        };

        self.state.step = self.state.step.next();
        Ok(validity)
    }

    fn committed_intent(&self) -> Result<Intent, ResolveError> {
        self.state.intent.ok_or(ResolveError::Classification)
    }
}
