//! Telemetry for the query pipeline
//!
//! Collects pipeline events in memory and keeps running statistics for the
//! chat session summary.

use crate::types::Service;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Events kept for stage averages and `recent_events`; older ones are dropped
const MAX_EVENTS: usize = 1000;

/// Pipeline stages that are timed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieval,
    Generation,
    Critique,
    Augmentation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieval => "retrieval",
            Stage::Generation => "generation",
            Stage::Critique => "critique",
            Stage::Augmentation => "augmentation",
        }
    }
}

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageCompleted {
        stage: Stage,
        duration_ms: u64,
        timestamp: Instant,
    },
    AugmentationTriggered {
        score: f64,
        timestamp: Instant,
    },
    ServiceDegraded {
        service: Service,
        reason: String,
        timestamp: Instant,
    },
    QueryCompleted {
        duration_ms: u64,
        /// Critic score, absent for canned and degraded answers
        score: Option<f64>,
        degraded: bool,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryStats {
    pub queries: usize,
    pub failed_queries: usize,
    pub augmentations: usize,
    pub service_failures: usize,
    pub total_query_ms: u64,
    pub score_sum: f64,
    pub scored_queries: usize,
}

impl TelemetryStats {
    pub fn average_query_ms(&self) -> u64 {
        if self.queries == 0 {
            0
        } else {
            self.total_query_ms / self.queries as u64
        }
    }

    pub fn average_score(&self) -> Option<f64> {
        if self.scored_queries == 0 {
            None
        } else {
            Some(self.score_sum / self.scored_queries as f64)
        }
    }

    /// Share of queries that went through the augmentation pass
    pub fn augmentation_rate(&self) -> f64 {
        if self.queries == 0 {
            0.0
        } else {
            self.augmentations as f64 / self.queries as f64
        }
    }
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<PipelineEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_EVENTS))),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: PipelineEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                PipelineEvent::StageCompleted { .. } => {}
                PipelineEvent::AugmentationTriggered { .. } => {
                    stats.augmentations += 1;
                }
                PipelineEvent::ServiceDegraded { .. } => {
                    stats.service_failures += 1;
                }
                PipelineEvent::QueryCompleted {
                    duration_ms,
                    score,
                    degraded,
                    ..
                } => {
                    stats.queries += 1;
                    stats.total_query_ms += duration_ms;
                    if *degraded {
                        stats.failed_queries += 1;
                    } else if let Some(score) = score {
                        stats.score_sum += score;
                        stats.scored_queries += 1;
                    }
                }
            }
        }

        let mut events = lock(&self.events);
        if events.len() == MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn stage_completed(&self, stage: Stage, duration: Duration) {
        self.record(PipelineEvent::StageCompleted {
            stage,
            duration_ms: duration.as_millis() as u64,
            timestamp: Instant::now(),
        });
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<PipelineEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Mean duration per stage, in stage order, for stages seen so far
    pub fn stage_averages(&self) -> Vec<(Stage, u64)> {
        let events = lock(&self.events);
        [
            Stage::Retrieval,
            Stage::Generation,
            Stage::Critique,
            Stage::Augmentation,
        ]
        .into_iter()
        .filter_map(|wanted| {
            let durations: Vec<u64> = events
                .iter()
                .filter_map(|event| match event {
                    PipelineEvent::StageCompleted {
                        stage, duration_ms, ..
                    } if *stage == wanted => Some(*duration_ms),
                    _ => None,
                })
                .collect();
            if durations.is_empty() {
                None
            } else {
                Some((wanted, durations.iter().sum::<u64>() / durations.len() as u64))
            }
        })
        .collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(duration_ms: u64, score: Option<f64>, degraded: bool) -> PipelineEvent {
        PipelineEvent::QueryCompleted {
            duration_ms,
            score,
            degraded,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_query_stats() {
        let collector = TelemetryCollector::new();
        collector.record(completed(1000, Some(8.0), false));
        collector.record(completed(3000, Some(4.0), false));
        collector.record(completed(500, None, true));

        let stats = collector.get_stats();
        assert_eq!(stats.queries, 3);
        assert_eq!(stats.failed_queries, 1);
        assert_eq!(stats.average_query_ms(), 1500);
        assert_eq!(stats.average_score(), Some(6.0));
    }

    #[test]
    fn test_augmentation_and_degradation_counts() {
        let collector = TelemetryCollector::new();
        collector.record(PipelineEvent::AugmentationTriggered {
            score: 4.0,
            timestamp: Instant::now(),
        });
        collector.record(PipelineEvent::ServiceDegraded {
            service: Service::WebSearch,
            reason: "timeout".to_string(),
            timestamp: Instant::now(),
        });
        collector.record(completed(100, Some(4.0), false));

        let stats = collector.get_stats();
        assert_eq!(stats.augmentations, 1);
        assert_eq!(stats.service_failures, 1);
        assert_eq!(stats.augmentation_rate(), 1.0);
        assert_eq!(collector.event_count(), 3);
    }

    #[test]
    fn test_stage_averages() {
        let collector = TelemetryCollector::new();
        collector.stage_completed(Stage::Generation, Duration::from_millis(100));
        collector.stage_completed(Stage::Generation, Duration::from_millis(300));
        collector.stage_completed(Stage::Retrieval, Duration::from_millis(50));

        assert_eq!(
            collector.stage_averages(),
            vec![(Stage::Retrieval, 50), (Stage::Generation, 200)]
        );
    }

    #[test]
    fn test_recent_events() {
        let collector = TelemetryCollector::new();
        for i in 0..5 {
            collector.record(completed(i, Some(1.0), false));
        }
        assert_eq!(collector.recent_events(2).len(), 2);
        assert!(collector.get_stats().average_score().is_some());
    }

    #[test]
    fn test_zero_score_counts_but_canned_does_not() {
        let collector = TelemetryCollector::new();
        collector.record(completed(100, Some(0.0), false));
        collector.record(completed(100, Some(6.0), false));
        collector.record(completed(5, None, false));

        let stats = collector.get_stats();
        assert_eq!(stats.queries, 3);
        assert_eq!(stats.scored_queries, 2);
        assert_eq!(stats.average_score(), Some(3.0));
    }

    #[test]
    fn test_event_log_is_bounded() {
        let collector = TelemetryCollector::new();
        for i in 0..(MAX_EVENTS as u64 + 50) {
            collector.stage_completed(Stage::Retrieval, Duration::from_millis(i));
        }

        assert_eq!(collector.event_count(), MAX_EVENTS);
        // The oldest events were dropped
        assert!(matches!(
            collector.recent_events(MAX_EVENTS)[0],
            PipelineEvent::StageCompleted { duration_ms: 50, .. }
        ));
        // Counters are not affected by the cap
        assert_eq!(collector.get_stats().queries, 0);
    }
}
