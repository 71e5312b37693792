use std::time::Duration;
use tokio::time::MissedTickBehavior;

use kaze_protocol::{refresh, RefreshOutcome, RegisterBank, SampleScaling};

use super::{control::SlaveControl, traits::SampleSource};

/// Refresh actor: pull a sample every `interval` and write it into the bank.
///
/// The first refresh happens immediately. A missing or malformed sample keeps
/// the previous register values and the loop carries on. Sources may block:
/// each fetch runs on the blocking pool.
pub async fn run_refresh_loop<S: SampleSource + 'static>(
    bank: RegisterBank,
    mut source: S,
    scaling: SampleScaling,
    interval: Duration,
    control: SlaveControl,
) {
    log::info!("Starting refresh loop (interval {interval:?})");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = control.stopped() => break,
            _ = ticker.tick() => {}
        }

        // fetch outside the bank lock; refresh() only locks for the copy
        let fetched = tokio::task::spawn_blocking(move || {
            let sample = source.latest_sample();
            (source, sample)
        })
        .await;
        let sample = match fetched {
            Ok((returned, sample)) => {
                source = returned;
                sample
            }
            Err(err) => {
                log::error!("Sample source panicked, stopping refresh loop: {err}");
                break;
            }
        };
        match refresh(&bank, sample.as_ref(), &scaling) {
            Ok(RefreshOutcome::Written(values)) => {
                log::info!("Values written to holding registers: {values:?}");
            }
            Ok(RefreshOutcome::SampleUnavailable) => {
                log::debug!("No sensor sample available, keeping previous registers");
            }
            Ok(RefreshOutcome::Rejected(err)) => {
                log::warn!("Ignoring malformed sensor sample: {err}");
            }
            Err(err) => {
                log::error!("Failed to update holding registers: {err}");
            }
        }
    }

    log::info!("Refresh loop stopped");
}
