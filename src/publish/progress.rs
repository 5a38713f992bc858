/*!
 * Monotonic progress tracking for a single publish run.
 *
 * One tracker instance exists per run, so reporters never touch another
 * run's state. Percentages only ever move forward: an in-process
 * only-if-greater guard skips stale reports, and the repository write
 * max-merges as a second line against interleaved reporters.
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::database::Repository;

/// Tracks and persists publish progress for one job
pub struct ProgressTracker {
    /// Repository for job progress writes
    repo: Repository,
    /// Job being tracked
    job_id: String,
    /// Highest percentage recorded so far
    last_recorded: Mutex<i64>,
    /// Translation units finished across all steps
    completed_translations: AtomicUsize,
    /// Total translation units in this run, set before fan-out
    total_translations: AtomicUsize,
    /// Percentage where translation progress starts
    base_percentage: i64,
    /// Percentage span translation progress covers
    range_percentage: i64,
}

impl ProgressTracker {
    /// Create a tracker for one publish run
    pub fn new(
        repo: Repository,
        job_id: impl Into<String>,
        base_percentage: i64,
        range_percentage: i64,
    ) -> Self {
        Self {
            repo,
            job_id: job_id.into(),
            last_recorded: Mutex::new(0),
            completed_translations: AtomicUsize::new(0),
            total_translations: AtomicUsize::new(0),
            base_percentage,
            range_percentage,
        }
    }

    /// Record the entry checkpoint of a step: 80% of the step's target
    pub async fn step_started(&self, message: &str, target_percentage: i64) -> Result<()> {
        self.record(message, target_percentage * 8 / 10).await
    }

    /// Record a step's completion at its full target percentage
    pub async fn step_completed(&self, message: &str, target_percentage: i64) -> Result<()> {
        self.record(message, target_percentage).await
    }

    /// Set the total number of translation units for this run
    pub fn set_total_translations(&self, total: usize) {
        self.total_translations.store(total, Ordering::SeqCst);
    }

    /// Count one finished translation unit and record the derived percentage:
    /// base + floor(completed / total * range)
    pub async fn translation_finished(&self, message: &str) -> Result<()> {
        let completed = self.completed_translations.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total_translations.load(Ordering::SeqCst);
        if total == 0 {
            return Ok(());
        }

        let percentage =
            self.base_percentage + (completed.min(total) as i64 * self.range_percentage) / total as i64;
        self.record(message, percentage).await
    }

    /// Number of translation units counted so far
    pub fn completed_translations(&self) -> usize {
        self.completed_translations.load(Ordering::SeqCst)
    }

    /// Record a percentage, skipping it if it would not increase the
    /// highest value recorded by this run
    pub async fn record(&self, message: &str, percentage: i64) -> Result<()> {
        let should_write = {
            let mut last = self.last_recorded.lock();
            if percentage > *last {
                *last = percentage;
                true
            } else {
                false
            }
        };

        if should_write {
            self.repo
                .update_job_progress(&self.job_id, message, percentage)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AssignmentRecord, JobRecord};

    async fn tracker_with_job() -> (Repository, ProgressTracker) {
        let repo = Repository::new_in_memory().unwrap();
        let assignment_id = repo
            .create_assignment(&AssignmentRecord::new("Progress fixture"))
            .await
            .unwrap();
        repo.create_job(&JobRecord::new("job-1".to_string(), assignment_id))
            .await
            .unwrap();
        let tracker = ProgressTracker::new(repo.clone(), "job-1", 20, 40);
        (repo, tracker)
    }

    #[tokio::test]
    async fn test_stepStarted_shouldRecordEightyPercentOfTarget() {
        let (repo, tracker) = tracker_with_job().await;

        tracker.step_started("Reconciling questions", 20).await.unwrap();

        let job = repo.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.percentage, 16);
    }

    #[tokio::test]
    async fn test_record_shouldSkipNonIncreasingValues() {
        let (repo, tracker) = tracker_with_job().await;

        tracker.record("ahead", 50).await.unwrap();
        tracker.record("stale", 30).await.unwrap();
        tracker.record("same", 50).await.unwrap();

        let job = repo.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.percentage, 50);
        // Skipped reports leave the message untouched too
        assert_eq!(job.progress_message, "ahead");
    }

    #[tokio::test]
    async fn test_translationFinished_shouldInterpolateWithinRange() {
        let (repo, tracker) = tracker_with_job().await;
        tracker.set_total_translations(4);

        tracker.translation_finished("1 of 4").await.unwrap();
        let job = repo.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.percentage, 30); // 20 + floor(1/4 * 40)

        tracker.translation_finished("2 of 4").await.unwrap();
        tracker.translation_finished("3 of 4").await.unwrap();
        tracker.translation_finished("4 of 4").await.unwrap();
        let job = repo.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.percentage, 60); // 20 + 40
    }

    #[tokio::test]
    async fn test_translationFinished_shouldBeInertWithoutTotal() {
        let (repo, tracker) = tracker_with_job().await;

        tracker.translation_finished("no total set").await.unwrap();

        let job = repo.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.percentage, 0);
    }
}
