//! Module bootstrap.
//!
//! The host loads the module once, then reports agent session changes.
//! Call tracking only runs while an agent is logged in and the module
//! privilege is granted; device plumbing stays up across sessions so
//! hot-plug state survives a re-login.

use std::sync::Arc;

use tracing::info;

use sidetone_core::OptionsHandle;
use sidetone_hid::DeviceEvent;
use tokio::sync::mpsc;

use crate::engine::{Collaborators, Engine};

pub struct SidetoneModule {
    options: Arc<OptionsHandle>,
    engine: Arc<Engine>,
}

impl SidetoneModule {
    #[must_use]
    pub fn new(options: Arc<OptionsHandle>, collaborators: Collaborators) -> Self {
        let engine = Engine::new(Arc::clone(&options), collaborators);
        Self { options, engine }
    }

    /// One-time startup: connect the device event stream. Device plumbing
    /// runs regardless of the privilege gate; only call tracking is gated.
    pub fn initialize(&self, events: mpsc::UnboundedReceiver<DeviceEvent>) {
        if !self.options.can_use() {
            info!("Module privilege not granted, call tracking stays disabled");
        }
        self.engine.start(events);
    }

    /// An agent logged in: begin tracking their calls, privilege allowing.
    pub fn on_login(&self) {
        if !self.options.can_use() {
            info!("Module privilege not granted, ignoring login");
            return;
        }
        self.engine.register_interaction_event_handler();
    }

    /// The agent logged out: stop tracking. Safe to call when login never
    /// registered anything.
    pub fn on_logout(&self) {
        self.engine.unregister_interaction_event_handler();
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ExecutionContext, Job};
    use crate::testutil::{FakeDirectory, FakeEndpoint, FakeInteractions, RecordingDevice};
    use sidetone_core::telephony::CommandExecutor;
    use sidetone_core::{Options, OptionsHandle};

    struct InlineExec;

    impl ExecutionContext for InlineExec {
        fn is_current(&self) -> bool {
            true
        }
        fn run_sync(&self, job: Job) {
            job();
        }
    }

    struct NullExecutor;

    impl CommandExecutor for NullExecutor {
        fn execute(
            &self,
            _: sidetone_core::CommandChain,
            _: sidetone_core::CommandParams,
        ) -> sidetone_core::Result<()> {
            Ok(())
        }
    }

    fn module(options: Options) -> (SidetoneModule, Arc<FakeInteractions>) {
        let interactions = FakeInteractions::new();
        let endpoint = FakeEndpoint::new("ep-1");
        let module = SidetoneModule::new(
            OptionsHandle::new(options),
            Collaborators {
                commands: Arc::new(NullExecutor),
                interactions: Arc::clone(&interactions) as _,
                endpoints: FakeDirectory::new(&[("call-1", &endpoint)]),
                exec: Arc::new(InlineExec),
                resolver: None,
            },
        );
        (module, interactions)
    }

    #[test]
    fn test_login_registers_and_logout_detaches() {
        let (module, interactions) = module(Options::default());

        module.on_login();
        assert_eq!(interactions.subscriber_count(), 1);

        module.on_logout();
        assert_eq!(interactions.subscriber_count(), 0);
    }

    #[test]
    fn test_privilege_gate_blocks_login() {
        let mut options = Options::default();
        options.module.enabled = false;
        let (module, interactions) = module(options);

        module.on_login();
        assert_eq!(interactions.subscriber_count(), 0);

        // Logout with nothing registered is harmless
        module.on_logout();
    }

    #[test]
    fn test_device_plumbing_runs_without_privilege() {
        let mut options = Options::default();
        options.module.enabled = false;
        let (module, _interactions) = module(options);

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        module.initialize(rx);

        let device = RecordingDevice::new("d1");
        tx.send(sidetone_hid::DeviceEvent::Attached(Arc::clone(&device) as _)).unwrap();

        // Hot-plug state survives sessions even while call tracking is off
        for _ in 0..50 {
            if !module.engine().snapshot().devices.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(module.engine().snapshot().devices, vec!["d1".to_string()]);
    }
}
