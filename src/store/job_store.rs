//! # Job Record Store
//!
//! Concurrency-safe in-memory table of job records.
//!
//! ## Overview
//!
//! Records live in a sharded [`DashMap`]. Every mutation is a read-modify-write
//! performed while holding the entry's shard lock, so two updates to the same
//! job serialize and readers never observe a half-applied change. A mutation
//! runs against a copy of the record; the copy is committed only if the
//! mutation succeeds and the artifact/error invariant still holds, otherwise
//! the stored record is left untouched.

use crate::error::{FactoryError, FactoryResult};
use crate::models::{Job, JobId, JobView};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<JobId, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record; fails if the id is already present
    pub fn create(&self, job: Job) -> FactoryResult<JobId> {
        if !job.invariant_holds() {
            return Err(FactoryError::InvalidState(format!(
                "job {} violates the artifact/error invariant",
                job.id()
            )));
        }

        let job_id = job.id();
        match self.jobs.entry(job_id) {
            Entry::Occupied(_) => Err(FactoryError::InvalidState(format!(
                "job {job_id} already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(job);
                debug!(job_id = %job_id, "Job record created");
                Ok(job_id)
            }
        }
    }

    /// Clone of the current record
    pub fn get(&self, job_id: JobId) -> FactoryResult<Job> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.value().clone())
            .ok_or(FactoryError::NotFound(job_id))
    }

    pub fn view(&self, job_id: JobId) -> FactoryResult<JobView> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.value().view())
            .ok_or(FactoryError::NotFound(job_id))
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.jobs.contains_key(&job_id)
    }

    /// Atomically apply `mutation` and return the committed record
    pub fn update<F>(&self, job_id: JobId, mutation: F) -> FactoryResult<Job>
    where
        F: FnOnce(&mut Job) -> FactoryResult<()>,
    {
        let mut entry = self
            .jobs
            .get_mut(&job_id)
            .ok_or(FactoryError::NotFound(job_id))?;

        let mut candidate = entry.value().clone();
        mutation(&mut candidate)?;

        if !candidate.invariant_holds() {
            warn!(
                job_id = %job_id,
                status = %candidate.status(),
                "Rejected job update that would break the artifact/error invariant"
            );
            return Err(FactoryError::InvalidState(format!(
                "update to job {job_id} would break the artifact/error invariant"
            )));
        }

        candidate.touch();
        *entry.value_mut() = candidate.clone();
        Ok(candidate)
    }

    /// All records ordered by creation time
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by_key(|job| (job.created_at(), job.id()));
        jobs
    }

    pub fn remove(&self, job_id: JobId) -> FactoryResult<Job> {
        self.jobs
            .remove(&job_id)
            .map(|(_, job)| job)
            .ok_or(FactoryError::NotFound(job_id))
    }

    /// Remove a record only if `predicate` holds, checked under the entry lock
    pub fn remove_if<F>(&self, job_id: JobId, predicate: F) -> Option<Job>
    where
        F: FnOnce(&Job) -> bool,
    {
        self.jobs
            .remove_if(&job_id, |_, job| predicate(job))
            .map(|(_, job)| job)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactRef, GenerationRequest, RecipeDecision};
    use crate::orchestration::types::StageKind;
    use crate::recipes::RecipeKind;
    use crate::state_machine::{JobEvent, JobStatus};
    use std::sync::Arc;

    fn job(topic: &str) -> Job {
        Job::new(&GenerationRequest::parse(topic, "ambient", None, "1080p").unwrap())
    }

    #[test]
    fn test_create_and_get() {
        let store = JobStore::new();
        let record = job("rain on a tin roof");
        let job_id = store.create(record.clone()).unwrap();

        let fetched = store.get(job_id).unwrap();
        assert_eq!(fetched.topic(), "rain on a tin roof");
        assert_eq!(fetched.status(), JobStatus::Queued);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_create_is_rejected() {
        let store = JobStore::new();
        let record = job("topic");
        store.create(record.clone()).unwrap();
        assert!(matches!(
            store.create(record),
            Err(FactoryError::InvalidState(_))
        ));
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = JobStore::new();
        let missing = JobId::new();
        assert_eq!(store.get(missing).unwrap_err(), FactoryError::NotFound(missing));
        assert!(store.update(missing, |_| Ok(())).is_err());
        assert!(store.remove(missing).is_err());
    }

    #[test]
    fn test_invariant_breaking_update_leaves_record_untouched() {
        let store = JobStore::new();
        let job_id = store.create(job("topic")).unwrap();
        let before = store.get(job_id).unwrap();

        let result = store.update(job_id, |job| {
            job.artifact = Some(ArtifactRef::video("out.mp4", None));
            Ok(())
        });
        assert!(matches!(result, Err(FactoryError::InvalidState(_))));

        let after = store.get(job_id).unwrap();
        assert!(after.artifact().is_none());
        assert_eq!(after.updated_at(), before.updated_at());
    }

    #[test]
    fn test_failed_mutation_is_discarded() {
        let store = JobStore::new();
        let job_id = store.create(job("topic")).unwrap();

        let result = store.update(job_id, |job| {
            job.insert_metadata("note", serde_json::json!("half written"));
            job.apply(JobEvent::StartStage(StageKind::Alignment))?;
            Ok(())
        });
        assert!(matches!(result, Err(FactoryError::StateTransitionError(_))));
        assert!(store.get(job_id).unwrap().metadata().is_empty());
    }

    #[test]
    fn test_list_is_ordered_by_creation() {
        let store = JobStore::new();
        let first = store.create(job("first")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.create(job("second")).unwrap();

        let ids: Vec<JobId> = store.list().iter().map(|job| job.id()).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_remove_if_checks_predicate() {
        let store = JobStore::new();
        let job_id = store.create(job("topic")).unwrap();

        assert!(store.remove_if(job_id, |job| job.status().is_terminal()).is_none());
        assert!(store.contains(job_id));

        store.update(job_id, |job| job.apply(JobEvent::Cancel).map(|_| ())).unwrap();
        assert!(store.remove_if(job_id, |job| job.status().is_terminal()).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_updates_serialize() {
        let store = Arc::new(JobStore::new());
        let job_id = store.create(job("topic")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store
                            .update(job_id, |job| {
                                let count = job
                                    .metadata()
                                    .get("count")
                                    .and_then(|v| v.as_u64())
                                    .unwrap_or(0);
                                job.insert_metadata("count", serde_json::json!(count + 1));
                                job.insert_metadata(format!("w{worker}"), serde_json::json!(i));
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let count = store.get(job_id).unwrap().metadata()["count"].as_u64();
        assert_eq!(count, Some(400));
    }

    #[test]
    fn test_update_applies_state_transitions() {
        let store = JobStore::new();
        let job_id = store.create(job("topic")).unwrap();

        let updated = store
            .update(job_id, |job| {
                job.apply(JobEvent::RecipeResolved {
                    recipe: RecipeKind::Ambient,
                    decision: RecipeDecision::Requested,
                    planned_stages: vec![StageKind::VoiceSynthesis],
                })?;
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.status(), JobStatus::Running);
        assert_eq!(updated.resolved_recipe(), Some(RecipeKind::Ambient));
    }
}
