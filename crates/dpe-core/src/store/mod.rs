//! Hypothesis ranking store.
//!
//! Holds the differential for each clinical problem and keeps its active
//! hypotheses ranked by current probability.
//!
//! # Locking
//!
//! ```text
//! HypothesisStore
//! ├── problems: RwLock<HashMap<ProblemId, Arc<RwLock<ProblemState>>>>
//! └── owners:   RwLock<HashMap<HypothesisId, ProblemId>>
//! ```
//!
//! The outer maps are only held long enough to look up or insert an entry.
//! Every mutation of a problem (update + rerank) runs under that problem's
//! write lock, so readers see a ranking either fully before or fully after
//! a write. Different problems never contend once looked up. Lock order is
//! problem lock before `owners`; nothing takes them the other way round.

pub mod error;
pub mod file;
pub mod hypothesis;

pub use error::StoreError;
pub use file::{RecordFile, RecordLock, DEFAULT_LOCK_TIMEOUT};
pub use hypothesis::{
    EvidenceRecord, Hypothesis, HypothesisStatus, ProblemRecord, RankedHypotheses,
    RetireOutcome, TestOutcome,
};

use crate::logging::{event_names, Stage};
use chrono::{DateTime, Utc};
use dpe_common::{DiagnosisId, HypothesisId, ProblemId};
use dpe_config::{StorePolicy, ValidationError};
use dpe_math::{
    update_probability, validate_non_negative, validate_probability, TestCharacteristics,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, StoreError>;

fn poisoned<T>(err: PoisonError<T>) -> StoreError {
    StoreError::LockPoisoned(err.to_string())
}

#[derive(Debug)]
struct ProblemState {
    id: ProblemId,
    created_at: DateTime<Utc>,
    next_sequence: u64,
    /// Creation order.
    hypotheses: Vec<Hypothesis>,
}

impl ProblemState {
    fn new(id: ProblemId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            next_sequence: 0,
            hypotheses: Vec::new(),
        }
    }

    fn find_mut(&mut self, hypothesis_id: HypothesisId) -> Result<&mut Hypothesis> {
        self.hypotheses
            .iter_mut()
            .find(|h| h.id == hypothesis_id)
            .ok_or(StoreError::HypothesisNotFound(hypothesis_id))
    }

    fn find(&self, hypothesis_id: HypothesisId) -> Result<&Hypothesis> {
        self.hypotheses
            .iter()
            .find(|h| h.id == hypothesis_id)
            .ok_or(StoreError::HypothesisNotFound(hypothesis_id))
    }

    /// Recompute ranks of all active hypotheses: descending probability,
    /// ties by earliest creation. Retired hypotheses lose their rank.
    fn rerank(&mut self) {
        let mut order: Vec<usize> = (0..self.hypotheses.len())
            .filter(|&i| self.hypotheses[i].is_active())
            .collect();
        order.sort_by(|&a, &b| {
            let (ha, hb) = (&self.hypotheses[a], &self.hypotheses[b]);
            hb.current_probability
                .total_cmp(&ha.current_probability)
                .then(ha.sequence.cmp(&hb.sequence))
        });

        for h in &mut self.hypotheses {
            h.rank = None;
        }
        for (position, idx) in order.into_iter().enumerate() {
            self.hypotheses[idx].rank = Some(position + 1);
        }
    }

    fn ranked(&self) -> RankedHypotheses {
        let mut active: Vec<Hypothesis> = self
            .hypotheses
            .iter()
            .filter(|h| h.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|h| h.rank);
        RankedHypotheses::new(self.id, active)
    }

    fn record(&self) -> ProblemRecord {
        ProblemRecord {
            problem_id: self.id,
            created_at: self.created_at,
            hypotheses: self.hypotheses.clone(),
        }
    }
}

/// In-memory store of differentials, one per clinical problem.
///
/// Constructed explicitly and shared through `Arc`; there is no global
/// instance.
#[derive(Debug)]
pub struct HypothesisStore {
    policy: StorePolicy,
    problems: RwLock<HashMap<ProblemId, Arc<RwLock<ProblemState>>>>,
    owners: RwLock<HashMap<HypothesisId, ProblemId>>,
}

impl Default for HypothesisStore {
    fn default() -> Self {
        Self::with_checked_policy(StorePolicy::default())
    }
}

impl HypothesisStore {
    /// Build a store, rejecting a floor or ceiling that could never leave a
    /// hypothesis active.
    pub fn new(policy: StorePolicy) -> std::result::Result<Self, ValidationError> {
        policy.check()?;
        Ok(Self::with_checked_policy(policy))
    }

    fn with_checked_policy(policy: StorePolicy) -> Self {
        Self {
            policy,
            problems: RwLock::new(HashMap::new()),
            owners: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    /// Open a new, empty problem.
    pub fn open_problem(&self) -> Result<ProblemId> {
        let id = ProblemId::new();
        self.open_problem_with_id(id)?;
        Ok(id)
    }

    /// Open a problem under a caller-chosen id.
    pub fn open_problem_with_id(&self, problem_id: ProblemId) -> Result<()> {
        let mut problems = self.problems.write().map_err(poisoned)?;
        if problems.contains_key(&problem_id) {
            return Err(StoreError::DuplicateProblem(problem_id));
        }
        problems.insert(
            problem_id,
            Arc::new(RwLock::new(ProblemState::new(problem_id))),
        );
        info!(
            event = event_names::STORE_PROBLEM_OPENED,
            stage = %Stage::Store,
            problem_id = %problem_id,
            "problem opened"
        );
        Ok(())
    }

    /// Ids of every open problem.
    pub fn problem_ids(&self) -> Result<Vec<ProblemId>> {
        let problems = self.problems.read().map_err(poisoned)?;
        Ok(problems.keys().copied().collect())
    }

    fn problem(&self, problem_id: ProblemId) -> Result<Arc<RwLock<ProblemState>>> {
        let problems = self.problems.read().map_err(poisoned)?;
        problems
            .get(&problem_id)
            .cloned()
            .ok_or(StoreError::ProblemNotFound(problem_id))
    }

    fn owner(&self, hypothesis_id: HypothesisId) -> Result<ProblemId> {
        let owners = self.owners.read().map_err(poisoned)?;
        owners
            .get(&hypothesis_id)
            .copied()
            .ok_or(StoreError::HypothesisNotFound(hypothesis_id))
    }

    /// Add a candidate diagnosis as an active hypothesis.
    ///
    /// The current probability starts at the pretest probability. A diagnosis
    /// may be active at most once per problem. A pretest already below the
    /// elimination floor (or at the confirmation ceiling) retires the new
    /// hypothesis straight away.
    pub fn propose(
        &self,
        problem_id: ProblemId,
        diagnosis_id: DiagnosisId,
        pretest_probability: f64,
    ) -> Result<Hypothesis> {
        let pretest = validate_probability("pretest_probability", pretest_probability).map_err(
            |source| StoreError::InvalidPretest {
                problem_id,
                diagnosis_id: diagnosis_id.clone(),
                source,
            },
        )?;

        let problem = self.problem(problem_id)?;
        let mut state = problem.write().map_err(poisoned)?;

        if state
            .hypotheses
            .iter()
            .any(|h| h.is_active() && h.diagnosis_id == diagnosis_id)
        {
            return Err(StoreError::DuplicateDiagnosis {
                problem_id,
                diagnosis_id,
            });
        }

        let id = HypothesisId::new();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.hypotheses.push(Hypothesis {
            id,
            problem_id,
            diagnosis_id,
            pretest_probability: pretest,
            current_probability: pretest,
            rank: None,
            status: HypothesisStatus::Active,
            sequence,
            created_at: Utc::now(),
            evidence: Vec::new(),
        });
        if let Some(status) = self.automatic_transition(pretest) {
            state.find_mut(id)?.status = status;
            info!(
                event = event_names::STORE_STATUS_CHANGED,
                stage = %Stage::Store,
                problem_id = %problem_id,
                hypothesis_id = %id,
                status = %status,
                probability = pretest,
                "hypothesis proposed outside the active bounds"
            );
        }
        state.rerank();

        self.owners
            .write()
            .map_err(poisoned)?
            .insert(id, problem_id);

        let created = state.find(id)?.clone();
        info!(
            event = event_names::STORE_HYPOTHESIS_PROPOSED,
            stage = %Stage::Store,
            problem_id = %problem_id,
            hypothesis_id = %id,
            diagnosis_id = %created.diagnosis_id,
            pretest = pretest,
            rank = ?created.rank,
            "hypothesis proposed"
        );
        Ok(created)
    }

    /// Apply a likelihood ratio to an active hypothesis and rerank.
    ///
    /// The update, any automatic transition and the rerank happen under one
    /// write lock on the problem. Falling below the elimination floor rules
    /// the hypothesis out; reaching the confirmation ceiling, when one is
    /// configured, confirms it.
    pub fn record_evidence(
        &self,
        problem_id: ProblemId,
        hypothesis_id: HypothesisId,
        likelihood_ratio: f64,
    ) -> Result<Hypothesis> {
        let problem = self.problem(problem_id)?;
        let mut state = problem.write().map_err(poisoned)?;

        let hypothesis = state.find_mut(hypothesis_id)?;
        if !hypothesis.is_active() {
            return Err(StoreError::AlreadyRetired {
                hypothesis_id,
                status: hypothesis.status,
            });
        }

        let prior = hypothesis.current_probability;
        let posterior = update_probability(prior, likelihood_ratio).map_err(|source| {
            debug!(
                event = event_names::STORE_EVIDENCE_REJECTED,
                stage = %Stage::Store,
                problem_id = %problem_id,
                hypothesis_id = %hypothesis_id,
                error = %source,
                "evidence rejected"
            );
            StoreError::Evidence {
                problem_id,
                hypothesis_id,
                source,
            }
        })?;

        hypothesis.current_probability = posterior;
        hypothesis.evidence.push(EvidenceRecord {
            likelihood_ratio,
            prior,
            posterior,
            recorded_at: Utc::now(),
        });
        debug!(
            event = event_names::STORE_EVIDENCE_RECORDED,
            stage = %Stage::Store,
            problem_id = %problem_id,
            hypothesis_id = %hypothesis_id,
            likelihood_ratio = likelihood_ratio,
            prior = prior,
            posterior = posterior,
            "evidence recorded"
        );

        if let Some(status) = self.automatic_transition(posterior) {
            hypothesis.status = status;
            info!(
                event = event_names::STORE_STATUS_CHANGED,
                stage = %Stage::Store,
                problem_id = %problem_id,
                hypothesis_id = %hypothesis_id,
                status = %status,
                probability = posterior,
                "hypothesis left the active set"
            );
        }

        state.rerank();
        debug!(
            event = event_names::STORE_RERANKED,
            stage = %Stage::Store,
            problem_id = %problem_id,
            "problem reranked"
        );
        Ok(state.find(hypothesis_id)?.clone())
    }

    fn automatic_transition(&self, probability: f64) -> Option<HypothesisStatus> {
        if probability < self.policy.elimination_floor {
            return Some(HypothesisStatus::RuledOut);
        }
        match self.policy.confirmation_ceiling {
            Some(ceiling) if probability >= ceiling => Some(HypothesisStatus::Confirmed),
            _ => None,
        }
    }

    /// Derive LR+/LR- from the test and apply the one matching the result.
    pub fn record_test_result(
        &self,
        problem_id: ProblemId,
        hypothesis_id: HypothesisId,
        test: &TestCharacteristics,
        outcome: TestOutcome,
    ) -> Result<Hypothesis> {
        let lrs = test
            .likelihood_ratios()
            .map_err(|source| StoreError::Evidence {
                problem_id,
                hypothesis_id,
                source,
            })?;
        let lr = match outcome {
            TestOutcome::Positive => lrs.lr_positive,
            TestOutcome::Negative => lrs.lr_negative,
        };
        self.record_evidence(problem_id, hypothesis_id, lr)
    }

    /// Snapshot of the active hypotheses in rank order.
    pub fn list_ranked(&self, problem_id: ProblemId) -> Result<RankedHypotheses> {
        let problem = self.problem(problem_id)?;
        let state = problem.read().map_err(poisoned)?;
        Ok(state.ranked())
    }

    /// Move a hypothesis to a terminal state. Irreversible.
    pub fn retire(&self, hypothesis_id: HypothesisId, outcome: RetireOutcome) -> Result<Hypothesis> {
        let problem_id = self.owner(hypothesis_id)?;
        let problem = self.problem(problem_id)?;
        let mut state = problem.write().map_err(poisoned)?;

        let hypothesis = state.find_mut(hypothesis_id)?;
        if !hypothesis.is_active() {
            return Err(StoreError::AlreadyRetired {
                hypothesis_id,
                status: hypothesis.status,
            });
        }
        let status = HypothesisStatus::from(outcome);
        hypothesis.status = status;
        state.rerank();

        info!(
            event = event_names::STORE_STATUS_CHANGED,
            stage = %Stage::Store,
            problem_id = %problem_id,
            hypothesis_id = %hypothesis_id,
            status = %status,
            "hypothesis retired"
        );
        Ok(state.find(hypothesis_id)?.clone())
    }

    /// Current copy of one hypothesis, active or retired.
    pub fn get(&self, hypothesis_id: HypothesisId) -> Result<Hypothesis> {
        let problem = self.problem(self.owner(hypothesis_id)?)?;
        let state = problem.read().map_err(poisoned)?;
        Ok(state.find(hypothesis_id)?.clone())
    }

    /// Evidence ledger of one hypothesis, oldest first.
    pub fn history(&self, hypothesis_id: HypothesisId) -> Result<Vec<EvidenceRecord>> {
        Ok(self.get(hypothesis_id)?.evidence)
    }

    /// Serializable copy of a problem.
    pub fn export_problem(&self, problem_id: ProblemId) -> Result<ProblemRecord> {
        let problem = self.problem(problem_id)?;
        let state = problem.read().map_err(poisoned)?;
        Ok(state.record())
    }

    /// Remove a problem, returning its final record.
    pub fn close_problem(&self, problem_id: ProblemId) -> Result<ProblemRecord> {
        let problem = {
            let mut problems = self.problems.write().map_err(poisoned)?;
            problems
                .remove(&problem_id)
                .ok_or(StoreError::ProblemNotFound(problem_id))?
        };
        let state = problem.read().map_err(poisoned)?;
        let record = state.record();

        let mut owners = self.owners.write().map_err(poisoned)?;
        for h in &record.hypotheses {
            owners.remove(&h.id);
        }
        info!(
            event = event_names::STORE_PROBLEM_CLOSED,
            stage = %Stage::Store,
            problem_id = %problem_id,
            hypotheses = record.hypotheses.len(),
            "problem closed"
        );
        Ok(record)
    }

    /// Load a problem previously exported.
    ///
    /// Stored ranks are ignored and recomputed; probabilities, evidence
    /// ledgers and ownership are checked before anything is inserted. Active
    /// hypotheses outside this store's floor and ceiling are retired the same
    /// way new evidence would retire them.
    pub fn import_problem(&self, mut record: ProblemRecord) -> Result<ProblemId> {
        validate_record(&record)?;
        let problem_id = record.problem_id;

        for h in record.hypotheses.iter_mut().filter(|h| h.is_active()) {
            if let Some(status) = self.automatic_transition(h.current_probability) {
                h.status = status;
                info!(
                    event = event_names::STORE_STATUS_CHANGED,
                    stage = %Stage::Store,
                    problem_id = %problem_id,
                    hypothesis_id = %h.id,
                    status = %status,
                    probability = h.current_probability,
                    "imported hypothesis left the active set"
                );
            }
        }

        let mut state = ProblemState {
            id: problem_id,
            created_at: record.created_at,
            next_sequence: record
                .hypotheses
                .iter()
                .map(|h| h.sequence + 1)
                .max()
                .unwrap_or(0),
            hypotheses: record.hypotheses,
        };
        state.rerank();
        let ids: Vec<HypothesisId> = state.hypotheses.iter().map(|h| h.id).collect();

        let mut problems = self.problems.write().map_err(poisoned)?;
        if problems.contains_key(&problem_id) {
            return Err(StoreError::DuplicateProblem(problem_id));
        }
        let mut owners = self.owners.write().map_err(poisoned)?;
        if let Some(taken) = ids.iter().find(|id| owners.contains_key(id)) {
            return Err(StoreError::InvalidRecord(format!(
                "hypothesis {} already belongs to another problem",
                taken
            )));
        }
        for id in &ids {
            owners.insert(*id, problem_id);
        }
        problems.insert(problem_id, Arc::new(RwLock::new(state)));

        info!(
            event = event_names::STORE_PROBLEM_IMPORTED,
            stage = %Stage::Store,
            problem_id = %problem_id,
            hypotheses = ids.len(),
            "problem imported"
        );
        Ok(problem_id)
    }
}

fn validate_record(record: &ProblemRecord) -> Result<()> {
    let mut ids = HashSet::new();
    let mut sequences = HashSet::new();
    let mut active_diagnoses = HashSet::new();

    for h in &record.hypotheses {
        if h.problem_id != record.problem_id {
            return Err(StoreError::InvalidRecord(format!(
                "hypothesis {} belongs to problem {}",
                h.id, h.problem_id
            )));
        }
        if !ids.insert(h.id) {
            return Err(StoreError::InvalidRecord(format!(
                "duplicate hypothesis {}",
                h.id
            )));
        }
        if !sequences.insert(h.sequence) {
            return Err(StoreError::InvalidRecord(format!(
                "duplicate sequence {}",
                h.sequence
            )));
        }
        if h.is_active() && !active_diagnoses.insert(h.diagnosis_id.clone()) {
            return Err(StoreError::DuplicateDiagnosis {
                problem_id: record.problem_id,
                diagnosis_id: h.diagnosis_id.clone(),
            });
        }
        for (field, value) in [
            ("pretest_probability", h.pretest_probability),
            ("current_probability", h.current_probability),
        ] {
            validate_probability(field, value).map_err(|source| StoreError::Evidence {
                problem_id: record.problem_id,
                hypothesis_id: h.id,
                source,
            })?;
        }
        for entry in &h.evidence {
            validate_non_negative("likelihood_ratio", entry.likelihood_ratio)
                .and_then(|_| validate_probability("prior", entry.prior))
                .and_then(|_| validate_probability("posterior", entry.posterior))
                .map_err(|source| StoreError::Evidence {
                    problem_id: record.problem_id,
                    hypothesis_id: h.id,
                    source,
                })?;
        }
    }
    Ok(())
}
