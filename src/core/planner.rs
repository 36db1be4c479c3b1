use crate::core::equivalence::{equivalence_key, subject_of, CompletedSet};
use crate::core::filter::{filter_pool, FilterOutcome};
use crate::core::normalizer;
use crate::core::parser::AgreementParser;
use crate::core::selector::{select_term, SelectionPolicy, GE_CODE};
use crate::domain::model::{
    CompletedCourse, Course, PlanningContext, RequirementModel, TermPlan,
};
use crate::domain::ports::{DocumentTree, GenerationRequest, ScheduleGenerator};
use crate::utils::error::{PlannerError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// One planning request as typed by the user.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub academic_year: String,
    pub source_institution: String,
    pub target_institution: String,
    pub major: String,
    pub completed: Vec<CompletedCourse>,
    pub target_units: Decimal,
    pub term_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PlanSource {
    Deterministic,
    Generated { generator: String },
}

#[derive(Debug)]
pub struct PlanOutcome {
    pub model: RequirementModel,
    pub plan: TermPlan,
    pub source: PlanSource,
    /// Set when a generator was configured but its plan was rejected.
    pub generator_failure: Option<PlannerError>,
}

/// Runs normalize → parse → filter → select for one request.
///
/// The engine keeps no state between calls; one instance can serve
/// concurrent requests.
pub struct PlanningEngine {
    parser: AgreementParser,
    policy: SelectionPolicy,
    generator: Option<Arc<dyn ScheduleGenerator>>,
    generator_timeout: Duration,
}

impl Default for PlanningEngine {
    fn default() -> Self {
        Self::new(AgreementParser::default(), SelectionPolicy::default())
    }
}

impl PlanningEngine {
    pub fn new(parser: AgreementParser, policy: SelectionPolicy) -> Self {
        Self {
            parser,
            policy,
            generator: None,
            generator_timeout: DEFAULT_GENERATOR_TIMEOUT,
        }
    }

    pub fn with_generator(
        mut self,
        generator: Arc<dyn ScheduleGenerator>,
        timeout: Duration,
    ) -> Self {
        self.generator = Some(generator);
        self.generator_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Canonicalizes names and parses the agreement.
    pub fn build_model<T: DocumentTree + ?Sized>(
        &self,
        request: &PlanRequest,
        tree: &T,
    ) -> RequirementModel {
        let source = canonical_institution(&request.source_institution);
        let target = canonical_institution(&request.target_institution);
        let major = canonical_major(&request.major);

        tracing::info!("🔍 Parsing agreement: {} → {} ({})", source, target, major);
        let model = self
            .parser
            .parse(tree, &request.academic_year, &source, &target, &major);

        if model.is_incomplete() {
            tracing::warn!(
                "⚠️ Agreement for {} produced no sections ({} diagnostics)",
                major,
                model.diagnostics.len()
            );
        }
        model
    }

    pub async fn plan<T: DocumentTree + Sync + ?Sized>(
        &self,
        request: &PlanRequest,
        tree: &T,
    ) -> Result<PlanOutcome> {
        let model = self.build_model(request, tree);
        let (plan, source, generator_failure) = self.schedule(&model, request).await?;
        Ok(PlanOutcome {
            model,
            plan,
            source,
            generator_failure,
        })
    }

    /// Filters the model's pool and builds a plan, preferring the generator
    /// when one is configured and its plan passes validation.
    pub async fn schedule(
        &self,
        model: &RequirementModel,
        request: &PlanRequest,
    ) -> Result<(TermPlan, PlanSource, Option<PlannerError>)> {
        let filtered = filter_pool(
            &model.source_pool,
            &request.completed,
            &model.source_institution,
            &model.target_institution,
        );

        if filtered.available.is_empty() {
            tracing::error!(
                "❌ No available courses for {} after filtering {} completed courses",
                model.major,
                request.completed.len()
            );
            return Err(PlannerError::NoAvailableCourses {
                major: model.major.clone(),
                source_institution: model.source_institution.clone(),
                target_institution: model.target_institution.clone(),
            });
        }

        let context = PlanningContext {
            term_label: request.term_label.clone(),
            source_institution: model.source_institution.clone(),
            target_institution: model.target_institution.clone(),
            major: model.major.clone(),
            target_units: request.target_units,
        };

        let mut failure = None;
        if let Some(generator) = &self.generator {
            match self
                .try_generator(generator.as_ref(), &context, &filtered, &request.completed)
                .await
            {
                Ok(plan) => {
                    tracing::info!("🤖 Using plan from generator '{}'", generator.name());
                    return Ok((
                        plan,
                        PlanSource::Generated {
                            generator: generator.name().to_string(),
                        },
                        None,
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Generator '{}' failed, falling back to deterministic selection: {}",
                        generator.name(),
                        e
                    );
                    failure = Some(e);
                }
            }
        }

        let plan = select_term(&filtered, &context, &self.policy);
        Ok((plan, PlanSource::Deterministic, failure))
    }

    async fn try_generator(
        &self,
        generator: &dyn ScheduleGenerator,
        context: &PlanningContext,
        filtered: &FilterOutcome,
        completed: &[CompletedCourse],
    ) -> Result<TermPlan> {
        let request = GenerationRequest {
            context,
            available: &filtered.available,
            exceptions: &filtered.exceptions,
            completed,
        };

        let mut plan = match tokio::time::timeout(self.generator_timeout, generator.generate(request))
            .await
        {
            Ok(Ok(plan)) => plan,
            Ok(Err(PlannerError::ExternalGeneratorFailure { reason })) => {
                return Err(PlannerError::generator(reason))
            }
            Ok(Err(e)) => return Err(PlannerError::generator(e.to_string())),
            Err(_) => {
                return Err(PlannerError::generator(format!(
                    "timed out after {}s",
                    self.generator_timeout.as_secs()
                )))
            }
        };

        validate_generated_plan(&mut plan, completed, &filtered.available, &self.policy)?;

        // 特殊需求的警告必須保留，即使產生器漏掉
        for warning in filtered.warnings() {
            if !plan.warnings.contains(&warning) {
                plan.warnings.push(warning);
            }
        }
        Ok(plan)
    }
}

/// Checks a plan that did not come from [`select_term`] against the same
/// guarantees the deterministic selector gives.
///
/// Every course other than the GE placeholder must be one of `available`
/// (matched through honors equivalents). A repeated subject is rejected
/// while fewer than `policy.repeat_unlock_after` courses precede it; later
/// repeats are accepted and mark the plan `diversity_relaxed`.
pub fn validate_generated_plan(
    plan: &mut TermPlan,
    completed: &[CompletedCourse],
    available: &[Course],
    policy: &SelectionPolicy,
) -> Result<()> {
    if plan.courses.is_empty() {
        return Err(PlannerError::generator("plan contains no courses"));
    }

    let completed_set = CompletedSet::from_completed(completed);
    let offered: HashSet<String> = available
        .iter()
        .map(|course| equivalence_key(&course.code))
        .collect();
    let mut seen = HashSet::new();
    let mut subjects = HashSet::new();
    let mut relaxed = false;

    for (index, selected) in plan.courses.iter().enumerate() {
        let code = selected.course.code.trim();
        if code.is_empty() {
            return Err(PlannerError::generator("course with empty code"));
        }
        if selected.course.units <= Decimal::ZERO {
            return Err(PlannerError::generator(format!(
                "{} has non-positive units ({})",
                code, selected.course.units
            )));
        }
        if completed_set.covers(code) {
            return Err(PlannerError::generator(format!(
                "{} (or its honors equivalent) is already completed",
                code
            )));
        }
        if code == GE_CODE {
            continue;
        }

        let key = equivalence_key(code);
        if !offered.contains(&key) {
            return Err(PlannerError::generator(format!(
                "{} is not among the available courses",
                code
            )));
        }
        if !seen.insert(key) {
            return Err(PlannerError::generator(format!(
                "{} appears twice (including honors equivalents)",
                code
            )));
        }

        let subject = subject_of(code);
        if !subjects.insert(subject.clone()) {
            if index < policy.repeat_unlock_after {
                return Err(PlannerError::generator(format!(
                    "{} repeats subject {} before {} distinct courses",
                    code, subject, policy.repeat_unlock_after
                )));
            }
            relaxed = true;
        }
    }

    if plan.total_units != plan.units_sum() {
        return Err(PlannerError::generator(format!(
            "total_units {} does not match course sum {}",
            plan.total_units,
            plan.units_sum()
        )));
    }

    plan.diversity_relaxed |= relaxed;
    Ok(())
}

fn canonical_institution(raw: &str) -> String {
    if normalizer::lookup_institution(raw).is_none() {
        tracing::debug!("Institution '{}' not in alias table, using title case", raw);
    }
    normalizer::normalize_institution(raw)
}

fn canonical_major(raw: &str) -> String {
    if normalizer::lookup_major(raw).is_none() {
        tracing::debug!("Major '{}' not in alias table, using title case", raw);
    }
    normalizer::normalize_major(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Articulation, Course, CourseOption, SelectedCourse, SourcePool,
    };
    use async_trait::async_trait;

    struct FixedGenerator {
        plan: Option<TermPlan>,
        delay: Duration,
    }

    #[async_trait]
    impl ScheduleGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _request: GenerationRequest<'_>) -> Result<TermPlan> {
            tokio::time::sleep(self.delay).await;
            self.plan
                .clone()
                .ok_or_else(|| PlannerError::generator("no plan"))
        }
    }

    fn model() -> RequirementModel {
        let mut pool = SourcePool::new();
        for (key, code, units) in [
            ("MATH 1A", "MATH 1A", 5),
            ("MATH 1B", "MATH 1B", 5),
            ("PHYSICS 7A", "PHYS 4A", 4),
            ("ENGLISH R1A", "ENGL 1A", 4),
        ] {
            pool.insert(
                key,
                Articulation::options(vec![CourseOption::new(vec![Course::new(
                    code,
                    "",
                    Decimal::from(units),
                )])]),
            );
        }
        pool.insert("COMPSCI 70", Articulation::NoArticulation);
        RequirementModel {
            academic_year: "2024-2025".to_string(),
            source_institution: "De Anza College".to_string(),
            target_institution: "University of California, Berkeley".to_string(),
            major: "Mathematics".to_string(),
            sections: vec![],
            source_pool: pool,
            diagnostics: vec![],
        }
    }

    fn request(completed: &[&str]) -> PlanRequest {
        PlanRequest {
            academic_year: "2024-2025".to_string(),
            source_institution: "de anza".to_string(),
            target_institution: "ucb".to_string(),
            major: "math".to_string(),
            completed: completed.iter().map(|c| CompletedCourse::new(*c)).collect(),
            target_units: Decimal::from(15),
            term_label: "Fall 2025".to_string(),
        }
    }

    fn generated(codes: &[(&str, i64)], total: i64) -> TermPlan {
        TermPlan {
            term_label: "Fall 2025".to_string(),
            courses: codes
                .iter()
                .map(|(code, units)| SelectedCourse {
                    course: Course::new(*code, "", Decimal::from(*units)),
                    category: "Major Prerequisites".to_string(),
                    reason: String::new(),
                })
                .collect(),
            total_units: Decimal::from(total),
            warnings: vec![],
            notes: String::new(),
            recommendations: vec![],
            diversity_relaxed: false,
        }
    }

    #[tokio::test]
    async fn test_deterministic_schedule() {
        let engine = PlanningEngine::default();
        let (plan, source, failure) = engine.schedule(&model(), &request(&[])).await.unwrap();
        assert_eq!(source, PlanSource::Deterministic);
        assert!(failure.is_none());
        assert_eq!(plan.codes(), vec!["MATH 1A", "PHYS 4A", "ENGL 1A"]);
        assert_eq!(plan.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_all_completed_is_reported() {
        let engine = PlanningEngine::default();
        let err = engine
            .schedule(
                &model(),
                &request(&["MATH 1AH", "MATH 1B", "PHYS 4A", "ENGL 1A"]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::NoAvailableCourses { .. }));
        assert!(err.recovery_suggestion().contains("Mathematics"));
    }

    #[tokio::test]
    async fn test_valid_generator_plan_is_used_and_keeps_warnings() {
        let engine = PlanningEngine::default().with_generator(
            Arc::new(FixedGenerator {
                plan: Some(generated(&[("PHYS 4A", 4), ("ENGL 1A", 4)], 8)),
                delay: Duration::ZERO,
            }),
            Duration::from_secs(5),
        );
        let (plan, source, failure) = engine.schedule(&model(), &request(&[])).await.unwrap();
        assert_eq!(
            source,
            PlanSource::Generated {
                generator: "fixed".to_string()
            }
        );
        assert!(failure.is_none());
        assert_eq!(plan.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_generator_plan_with_completed_partner_falls_back() {
        let engine = PlanningEngine::default().with_generator(
            Arc::new(FixedGenerator {
                plan: Some(generated(&[("MATH 1AH", 5)], 5)),
                delay: Duration::ZERO,
            }),
            Duration::from_secs(5),
        );
        let (plan, source, failure) = engine
            .schedule(&model(), &request(&["MATH 1A"]))
            .await
            .unwrap();
        assert_eq!(source, PlanSource::Deterministic);
        assert!(matches!(
            failure,
            Some(PlannerError::ExternalGeneratorFailure { .. })
        ));
        assert!(!plan.codes().contains(&"MATH 1AH"));
    }

    #[tokio::test]
    async fn test_generator_timeout_falls_back() {
        let engine = PlanningEngine::default().with_generator(
            Arc::new(FixedGenerator {
                plan: Some(generated(&[("PHYS 4A", 4)], 4)),
                delay: Duration::from_millis(200),
            }),
            Duration::from_millis(10),
        );
        let (_, source, failure) = engine.schedule(&model(), &request(&[])).await.unwrap();
        assert_eq!(source, PlanSource::Deterministic);
        let reason = failure.unwrap().to_string();
        assert!(reason.contains("timed out"));
    }

    fn available() -> Vec<Course> {
        [("MATH 1A", 5), ("MATH 1B", 5), ("PHYS 4A", 4), ("ENGL 1A", 4), ("ENGL 1B", 4)]
            .iter()
            .map(|(code, units)| Course::new(*code, "", Decimal::from(*units)))
            .collect()
    }

    #[test]
    fn test_validate_rejects_mismatched_total() {
        let policy = SelectionPolicy::default();
        let mut plan = generated(&[("PHYS 4A", 4), ("ENGL 1A", 4)], 15);
        assert!(validate_generated_plan(&mut plan, &[], &available(), &policy).is_err());
        let mut empty = generated(&[], 0);
        assert!(validate_generated_plan(&mut empty, &[], &available(), &policy).is_err());
    }

    #[test]
    fn test_validate_rejects_course_outside_pool() {
        let policy = SelectionPolicy::default();
        let mut plan = generated(&[("BOGUS 999", 15)], 15);
        let err = validate_generated_plan(&mut plan, &[], &available(), &policy).unwrap_err();
        assert!(err.to_string().contains("BOGUS 999"));

        // 榮譽課程可對應到同等的可修課程，GE 不需在課程池中
        let mut plan = generated(&[("MATH 1AH", 5), ("GE", 3)], 8);
        assert!(validate_generated_plan(&mut plan, &[], &available(), &policy).is_ok());
    }

    #[test]
    fn test_validate_subject_repeats_follow_policy() {
        let policy = SelectionPolicy::default();
        let mut early = generated(&[("MATH 1A", 5), ("MATH 1B", 5)], 10);
        assert!(validate_generated_plan(&mut early, &[], &available(), &policy).is_err());

        let relaxed_policy = SelectionPolicy {
            repeat_unlock_after: 3,
            ..SelectionPolicy::default()
        };
        let mut late = generated(
            &[("MATH 1A", 5), ("PHYS 4A", 4), ("ENGL 1A", 4), ("ENGL 1B", 4)],
            17,
        );
        assert!(validate_generated_plan(&mut late, &[], &available(), &relaxed_policy).is_ok());
        assert!(late.diversity_relaxed);
    }

    #[tokio::test]
    async fn test_fabricated_generator_course_falls_back() {
        let engine = PlanningEngine::default().with_generator(
            Arc::new(FixedGenerator {
                plan: Some(generated(&[("BOGUS 999", 15)], 15)),
                delay: Duration::ZERO,
            }),
            Duration::from_secs(5),
        );
        let (plan, source, failure) = engine.schedule(&model(), &request(&[])).await.unwrap();
        assert_eq!(source, PlanSource::Deterministic);
        assert!(failure.unwrap().to_string().contains("not among the available"));
        assert!(!plan.codes().contains(&"BOGUS 999"));
    }
}
