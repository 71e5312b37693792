use anyhow::{anyhow, Result};
use std::sync::Arc;

use kaze_protocol::RegisterBank;

use super::{
    control::SlaveControl,
    request::{RequestActor, RequestOutcome},
    refresh::run_refresh_loop,
    traits::{ModbusHook, ModbusTransport, SampleSource},
    SlaveConfig,
};

/// Handle to a running slave: the request actor on the blocking pool and the
/// refresh actor on the async runtime, sharing one register bank.
pub struct ModbusSlave {
    bank: RegisterBank,
    control: SlaveControl,
    request_handle: tokio::task::JoinHandle<Result<()>>,
    refresh_handle: tokio::task::JoinHandle<()>,
}

impl ModbusSlave {
    /// Spawn both actors. Must be called from inside a tokio runtime.
    pub fn start<T, S>(
        config: SlaveConfig,
        transport: T,
        source: S,
        hooks: Vec<Arc<dyn ModbusHook>>,
    ) -> Result<Self>
    where
        T: ModbusTransport + 'static,
        S: SampleSource + 'static,
    {
        config.validate()?;

        let bank = RegisterBank::new(config.register_count as usize);
        let control = SlaveControl::new();

        let refresh_handle = tokio::spawn(run_refresh_loop(
            bank.clone(),
            source,
            config.scaling,
            config.refresh_interval(),
            control.clone(),
        ));

        let actor = RequestActor::new(transport, bank.clone(), &config);
        let request_handle = {
            let control = control.clone();
            tokio::task::spawn_blocking(move || run_request_loop(actor, &config, &hooks, &control))
        };

        Ok(Self {
            bank,
            control,
            request_handle,
            refresh_handle,
        })
    }

    /// The register bank served by this slave.
    pub fn bank(&self) -> &RegisterBank {
        &self.bank
    }

    pub fn control(&self) -> SlaveControl {
        self.control.clone()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    /// Wait for the request actor to finish, then stop and join the refresh
    /// actor. Returns the request actor's fatal error, if any.
    pub async fn wait(self) -> Result<()> {
        let result = match self.request_handle.await {
            Ok(result) => result,
            Err(err) => Err(anyhow!("Request actor panicked: {err}")),
        };
        self.control.stop();
        if let Err(err) = self.refresh_handle.await {
            log::error!("Refresh actor panicked: {err}");
        }
        result
    }
}

/// Request actor loop. Runs until `control` is stopped or the transport fails
/// `max_transport_failures` times in a row.
pub fn run_request_loop<T: ModbusTransport>(
    mut actor: RequestActor<T>,
    config: &SlaveConfig,
    hooks: &[Arc<dyn ModbusHook>],
    control: &SlaveControl,
) -> Result<()> {
    log::info!("Starting request loop for unit {}", config.unit_id);

    let mut consecutive_failures = 0u32;
    while control.is_running() {
        match actor.poll_once() {
            Ok(outcome) => {
                consecutive_failures = 0;
                match &outcome {
                    RequestOutcome::Idle => {}
                    RequestOutcome::Responded { request, reply, .. } => {
                        for hook in hooks {
                            hook.on_after_response(request, reply);
                        }
                    }
                    RequestOutcome::Dropped(reason) => {
                        log::debug!("Dropped frame: {reason}");
                        for hook in hooks {
                            hook.on_frame_dropped(reason);
                        }
                    }
                }
            }
            Err(err) => {
                consecutive_failures += 1;
                log::warn!(
                    "Transport failure {consecutive_failures}/{}: {err}",
                    config.max_transport_failures
                );
                for hook in hooks {
                    hook.on_error(&err);
                }
                if consecutive_failures >= config.max_transport_failures {
                    log::error!("Transport presumed gone, stopping request loop");
                    return Err(anyhow!(
                        "{consecutive_failures} consecutive transport failures, last: {err}"
                    ));
                }
                std::thread::sleep(config.error_recovery_delay());
            }
        }
    }

    log::info!("Request loop stopped");
    Ok(())
}
