use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::media::AudioAnalyser;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Mean magnitude across frequency bins, normalized by `ceiling` and
/// clamped to [0, 1]
pub fn volume_level(bins: &[u8], ceiling: f32) -> f32 {
    if bins.is_empty() || ceiling.is_nan() || ceiling <= 0.0 {
        return 0.0;
    }

    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    let mean = sum as f32 / bins.len() as f32;
    (mean / ceiling).clamp(0.0, 1.0)
}

/// Background loop sampling an analyser into a watch channel
pub(crate) struct VolumeMonitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl VolumeMonitor {
    pub(crate) fn spawn(
        mut analyser: Box<dyn AudioAnalyser>,
        level_tx: Arc<watch::Sender<f32>>,
        interval: Duration,
        ceiling: f32,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut bins = vec![0u8; analyser.frequency_bin_count()];
            let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        analyser.byte_frequency_data(&mut bins);
                        level_tx.send_replace(volume_level(&bins, ceiling));
                    }
                }
            }

            if let Err(e) = analyser.close() {
                warn!("Error closing audio analyser: {}", e);
            }
            debug!("Volume monitor stopped");
        });

        Self { cancel, task }
    }

    /// Cancel the loop and wait until the analyser is released
    pub(crate) async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.task.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_zero() {
        assert_eq!(volume_level(&[0; 128], 128.0), 0.0);
    }

    #[test]
    fn test_mean_is_normalized() {
        let bins = [64u8; 128];
        assert!((volume_level(&bins, 128.0) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_loud_input_is_clamped() {
        assert_eq!(volume_level(&[255; 128], 128.0), 1.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(volume_level(&[], 128.0), 0.0);
        assert_eq!(volume_level(&[100; 4], 0.0), 0.0);
        assert_eq!(volume_level(&[100; 4], f32::NAN), 0.0);
    }
}
