//! Shutdown and alert subscriber registry.
//!
//! Two independent, append-only lists. Dispatch is synchronous, in
//! registration order, on the caller's thread (normally the monitoring
//! loop), so subscribers must be non-blocking. A panicking subscriber is
//! logged as a [`CallbackFault`] and the remaining subscribers still run.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use neuroacon_core::error::panic_message;
use neuroacon_core::{CallbackFault, CallbackKind, SafetyLevel, ShutdownReason};

pub type ShutdownCallback = Arc<dyn Fn(ShutdownReason) + Send + Sync>;
pub type AlertCallback = Arc<dyn Fn(SafetyLevel, &str) + Send + Sync>;

#[derive(Default)]
pub struct CallbackRegistry {
    shutdown: RwLock<Vec<ShutdownCallback>>,
    alert: RwLock<Vec<AlertCallback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_shutdown<F>(&self, callback: F)
    where
        F: Fn(ShutdownReason) + Send + Sync + 'static,
    {
        self.shutdown
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
        tracing::info!("Registered emergency shutdown callback");
    }

    pub fn register_alert<F>(&self, callback: F)
    where
        F: Fn(SafetyLevel, &str) + Send + Sync + 'static,
    {
        self.alert
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
        tracing::info!("Registered safety alert callback");
    }

    pub fn shutdown_len(&self) -> usize {
        self.shutdown.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn alert_len(&self) -> usize {
        self.alert.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Notify every shutdown subscriber. Returns the faults that occurred.
    pub fn dispatch_shutdown(&self, reason: ShutdownReason) -> Vec<CallbackFault> {
        // Snapshot so subscribers can register further callbacks without
        // deadlocking on the list lock.
        let subscribers = self
            .shutdown
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        subscribers
            .iter()
            .enumerate()
            .filter_map(|(index, callback)| {
                isolate(CallbackKind::Shutdown, index, || callback(reason)).err()
            })
            .collect()
    }

    /// Notify every alert subscriber. Returns the faults that occurred.
    pub fn dispatch_alert(&self, level: SafetyLevel, message: &str) -> Vec<CallbackFault> {
        let subscribers = self
            .alert
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        subscribers
            .iter()
            .enumerate()
            .filter_map(|(index, callback)| {
                isolate(CallbackKind::Alert, index, || callback(level, message)).err()
            })
            .collect()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("shutdown", &self.shutdown_len())
            .field("alert", &self.alert_len())
            .finish()
    }
}

fn isolate(kind: CallbackKind, index: usize, call: impl FnOnce()) -> Result<(), CallbackFault> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| {
        let fault = CallbackFault {
            kind,
            index,
            message: panic_message(payload.as_ref()),
        };
        tracing::error!(error = %fault, "Error in {kind} callback");
        fault
    })
}
