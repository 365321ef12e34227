use std::fmt;
use std::time::Duration;

/// Running counters of one probe session. RTT aggregates cover successful round trips only.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeStatistics {
    sent: u32,
    received: u32,
    total_rtt_ms: f64,
    min_rtt_ms: f64,
    max_rtt_ms: f64,
}

impl Default for ProbeStatistics {
    fn default() -> Self {
        ProbeStatistics {
            sent: 0,
            received: 0,
            total_rtt_ms: 0.0,
            // any first sample replaces it
            min_rtt_ms: f64::MAX,
            max_rtt_ms: 0.0,
        }
    }
}

impl ProbeStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&mut self) {
        self.sent = self.sent.saturating_add(1);
    }

    pub(crate) fn record_reply(&mut self, rtt_ms: f64) {
        debug_assert!(self.received < self.sent, "reply recorded without a matching probe");
        self.received = self.received.saturating_add(1);
        self.total_rtt_ms += rtt_ms;
        self.min_rtt_ms = self.min_rtt_ms.min(rtt_ms);
        self.max_rtt_ms = self.max_rtt_ms.max(rtt_ms);
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn lost(&self) -> u32 {
        self.sent.saturating_sub(self.received)
    }

    /// Zero when nothing was sent yet.
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        f64::from(self.lost()) * 100.0 / f64::from(self.sent)
    }

    pub fn total_rtt_ms(&self) -> f64 {
        self.total_rtt_ms
    }

    pub fn min_rtt_ms(&self) -> Option<f64> {
        (self.received > 0).then_some(self.min_rtt_ms)
    }

    pub fn max_rtt_ms(&self) -> Option<f64> {
        (self.received > 0).then_some(self.max_rtt_ms)
    }

    pub fn avg_rtt_ms(&self) -> Option<f64> {
        (self.received > 0).then(|| self.total_rtt_ms / f64::from(self.received))
    }

    /// Spread between the slowest and the fastest reply, reported as "mdev".
    pub fn mdev_ms(&self) -> Option<f64> {
        (self.received > 0).then(|| self.max_rtt_ms - self.min_rtt_ms)
    }

    /// Estimated session time: the measured round trips plus a full timeout per lost probe.
    /// This is not a wall-clock measurement.
    pub fn estimated_time_ms(&self, timeout: Duration) -> f64 {
        self.total_rtt_ms + f64::from(self.lost()) * timeout.as_secs_f64() * 1000.0
    }
}

/// The closing statistics block, identical whether the session completed or was interrupted.
pub struct StatisticsReport<'a> {
    pub address: &'a str,
    pub statistics: &'a ProbeStatistics,
    pub timeout: Duration,
}

impl fmt::Display for StatisticsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statistics = self.statistics;
        writeln!(f, "--- {} ping statistics ---", self.address)?;
        writeln!(
            f,
            "{} packets transmitted, {} received, {:.2}% packet loss, time {:.2}ms",
            statistics.sent(),
            statistics.received(),
            statistics.loss_percent(),
            statistics.estimated_time_ms(self.timeout),
        )?;
        match (statistics.min_rtt_ms(), statistics.avg_rtt_ms(), statistics.max_rtt_ms(), statistics.mdev_ms()) {
            (Some(min), Some(avg), Some(max), Some(mdev)) => {
                writeln!(f, "rtt min/avg/max/mdev = {min:.3}/{avg:.3}/{max:.3}/{mdev:.3} ms")
            }
            _ => writeln!(f, "No valid responses received."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(1000);

    fn statistics_with(sent: u32, rtts: &[f64]) -> ProbeStatistics {
        let mut statistics = ProbeStatistics::new();
        for _ in 0..sent {
            statistics.record_sent();
        }
        for rtt in rtts {
            statistics.record_reply(*rtt);
        }
        statistics
    }

    #[test]
    fn aggregates_over_samples() {
        let statistics = statistics_with(3, &[10.0, 25.0, 5.0]);

        assert_eq!(Some(5.0), statistics.min_rtt_ms());
        assert_eq!(Some(25.0), statistics.max_rtt_ms());
        assert_eq!(Some(40.0 / 3.0), statistics.avg_rtt_ms());
        assert_eq!(Some(20.0), statistics.mdev_ms());
        assert_eq!(0.0, statistics.loss_percent());
    }

    #[test]
    fn first_sample_replaces_min_sentinel() {
        let statistics = statistics_with(1, &[12_345.0]);
        assert_eq!(Some(12_345.0), statistics.min_rtt_ms());
        assert_eq!(Some(12_345.0), statistics.max_rtt_ms());
        assert_eq!(Some(0.0), statistics.mdev_ms());
    }

    #[test]
    fn no_rtt_without_replies() {
        let statistics = statistics_with(4, &[]);
        assert_eq!(None, statistics.min_rtt_ms());
        assert_eq!(None, statistics.avg_rtt_ms());
        assert_eq!(None, statistics.mdev_ms());
        assert_eq!(100.0, statistics.loss_percent());
        assert_eq!(4, statistics.lost());
    }

    #[test]
    fn loss_is_zero_before_first_probe() {
        let statistics = ProbeStatistics::new();
        assert_eq!(0.0, statistics.loss_percent());
        assert!(statistics.loss_percent().is_finite());
    }

    #[test]
    fn estimated_time_charges_a_timeout_per_lost_probe() {
        let statistics = statistics_with(3, &[1.5, 2.5]);
        assert_eq!(4.0 + 1000.0, statistics.estimated_time_ms(TIMEOUT));
    }

    #[test]
    fn counters_saturate_in_endless_sessions() {
        let mut statistics = ProbeStatistics { sent: u32::MAX, received: u32::MAX - 1, ..ProbeStatistics::new() };

        statistics.record_sent();
        statistics.record_reply(1.0);
        statistics.record_sent();

        assert_eq!(u32::MAX, statistics.sent());
        assert_eq!(u32::MAX, statistics.received());
        assert_eq!(0, statistics.lost());
        assert_eq!(0.0, statistics.loss_percent());
    }

    #[test]
    fn report_with_replies() {
        let statistics = statistics_with(4, &[10.0, 25.0, 5.0]);
        let report = StatisticsReport { address: "127.0.0.1", statistics: &statistics, timeout: TIMEOUT };

        assert_eq!(
            "--- 127.0.0.1 ping statistics ---\n\
             4 packets transmitted, 3 received, 25.00% packet loss, time 1040.00ms\n\
             rtt min/avg/max/mdev = 5.000/13.333/25.000/20.000 ms\n",
            report.to_string()
        );
    }

    #[test]
    fn report_without_replies() {
        let statistics = statistics_with(1, &[]);
        let report = StatisticsReport { address: "192.0.2.1", statistics: &statistics, timeout: TIMEOUT };

        assert_eq!(
            "--- 192.0.2.1 ping statistics ---\n\
             1 packets transmitted, 0 received, 100.00% packet loss, time 1000.00ms\n\
             No valid responses received.\n",
            report.to_string()
        );
    }

    #[test]
    fn report_before_first_probe() {
        let statistics = ProbeStatistics::new();
        let report = StatisticsReport { address: "::1", statistics: &statistics, timeout: TIMEOUT };

        assert_eq!(
            "--- ::1 ping statistics ---\n\
             0 packets transmitted, 0 received, 0.00% packet loss, time 0.00ms\n\
             No valid responses received.\n",
            report.to_string()
        );
    }
}
