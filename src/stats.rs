//! Run statistics for generators and the supervisor

use std::fmt::Write as _;
use std::time::Duration;

/// Counters kept by one generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStatistics {
    /// Proposals drawn from the heuristic
    pub proposals: u64,
    /// Proposals dropped for exceeding the slot bound
    pub discarded_oversized: u64,
    /// Candidates written to the buffer
    pub published: u64,
    /// Smallest edge count among published candidates
    pub best_published: Option<usize>,
    pub elapsed_time: Duration,
}

impl WorkerStatistics {
    pub fn record_published(&mut self, edge_count: usize) {
        self.published += 1;
        self.best_published = Some(match self.best_published {
            Some(best) => best.min(edge_count),
            None => edge_count,
        });
    }

    /// Fraction of proposals that were small enough to publish (0.0 to 1.0)
    pub fn publish_rate(&self) -> f64 {
        if self.proposals == 0 {
            0.0
        } else {
            self.published as f64 / self.proposals as f64
        }
    }

    /// Proposals per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.proposals as f64 / secs
        }
    }

    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "Time: {:.2?}", self.elapsed_time);
        let _ = writeln!(s, "Proposals: {}", self.proposals);
        let _ = writeln!(s, "Throughput: {:.0} proposals/sec", self.throughput());
        let _ = writeln!(s, "Discarded (too many edges): {}", self.discarded_oversized);
        let _ = writeln!(
            s,
            "Published: {} ({:.2}%)",
            self.published,
            self.publish_rate() * 100.0
        );
        if let Some(best) = self.best_published {
            let _ = writeln!(s, "Best published: {} edges", best);
        }
        s
    }
}

/// Counters kept by the supervisor while draining the buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainStatistics {
    /// Candidates read from the buffer
    pub candidates_read: u64,
    /// Times a candidate beat the best so far
    pub improvements: u64,
    /// Best edge count seen, `None` until the first read
    pub best_edge_count: Option<usize>,
    pub elapsed_time: Duration,
}

impl DrainStatistics {
    /// Record a candidate; returns true if it is a new best.
    pub fn observe(&mut self, edge_count: usize) -> bool {
        self.candidates_read += 1;
        let improved = self.best_edge_count.is_none_or(|best| edge_count < best);
        if improved {
            self.best_edge_count = Some(edge_count);
            self.improvements += 1;
        }
        improved
    }

    /// Candidates read per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.candidates_read as f64 / secs
        }
    }

    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "Time: {:.2?}", self.elapsed_time);
        let _ = writeln!(s, "Candidates read: {}", self.candidates_read);
        let _ = writeln!(s, "Throughput: {:.0} candidates/sec", self.throughput());
        let _ = writeln!(s, "Improvements: {}", self.improvements);
        match self.best_edge_count {
            Some(best) => {
                let _ = writeln!(s, "Best: {} edges", best);
            }
            None => {
                let _ = writeln!(s, "Best: none");
            }
        }
        s
    }
}
