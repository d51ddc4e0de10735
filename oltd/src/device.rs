// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! The device registry and the per-device request/response machinery.
//!
//! Each device record holds a single-slot mailbox: the sequencer submits
//! one request at a time, the dispatcher drops the next routed frame into
//! the mailbox, and anything arriving while nobody waits falls through to
//! the event surface.  Concurrent submitters on one device queue up FIFO
//! behind an async mutex; different devices proceed in parallel.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::timeout;

use common::network::MacAddr;
use l2oam::ObjectContext;
use l2oam::PackageVariant;

use crate::transport::TxHandle;
use crate::types::OltdError;
use crate::types::OltdResult;

/// How long a submitted request may wait for its response.  Sized to the
/// slowest observed OLT round-trip.
pub const RESPONSE_TIMER: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceKind {
    Olt,
    Onu,
}

/// Logical slots for the protocol-filter actions created while enabling
/// the OLT.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ActionSlot {
    PonPort,
    EthPort,
}

/// Flow parameters applied by the most recent add-flow, and the defaults
/// used when the caller leaves them out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlowParams {
    pub cir: Vec<u8>,
    pub pir: Vec<u8>,
    pub tpid: Vec<u8>,
    pub vid: Vec<u8>,
    pub inner_tpid: Vec<u8>,
    pub inner_vid: Vec<u8>,
}

impl Default for FlowParams {
    fn default() -> Self {
        FlowParams {
            cir: vec![0x00, 0x00, 0x03, 0xe8],
            pir: vec![0x00, 0x98, 0x96, 0x80],
            tpid: vec![0x88, 0xa8],
            vid: vec![0x00, 0x64],
            inner_tpid: vec![0x81, 0x00],
            inner_vid: vec![0x00, 0x0a],
        }
    }
}

/// Mutable per-device state, guarded by the record's mutex and committed
/// by the sequencer only after the final ack of each step.
#[derive(Debug, Default)]
pub struct DeviceState {
    pub active: bool,
    /// Autonomous events are acted on only once the OLT has been enabled.
    pub autonomous: bool,
    pub flow_added: bool,
    pub variant: Option<PackageVariant>,

    pub vendor: String,
    pub model: String,
    pub hardware: String,
    pub firmware: String,
    pub serial: String,

    /// OLT-issued IDs for the protocol-filter actions.
    pub action_ids: BTreeMap<ActionSlot, u32>,
    /// Down/up traffic-control references last read for this device.
    pub references: Option<(ObjectContext, ObjectContext)>,
    /// Down/up traffic-profile objects created for this session.
    pub profiles: Option<(ObjectContext, ObjectContext)>,
    /// The L2 switching domain created by add-flow-to-device.
    pub switching_domain: Option<ObjectContext>,
    pub flow: Option<FlowParams>,

    /// PON link instance assigned by the registration event (ONUs only).
    pub onu_instance: Option<u32>,
    pub link_up: bool,
}

/// One known device: the OLT or one of its ONUs.
pub struct Device {
    pub mac: MacAddr,
    pub id: String,
    pub kind: DeviceKind,
    pub state: Mutex<DeviceState>,

    // Serializes request/response exchanges on this device.
    exchange_lock: TokioMutex<()>,
    resp_tx: mpsc::Sender<Vec<u8>>,
    resp_rx: TokioMutex<mpsc::Receiver<Vec<u8>>>,
    waiters: AtomicUsize,

    ka_tx: mpsc::Sender<Vec<u8>>,
    ka_rx: TokioMutex<mpsc::Receiver<Vec<u8>>>,
}

impl Device {
    pub fn new(mac: MacAddr, id: &str, kind: DeviceKind) -> Arc<Device> {
        let (resp_tx, resp_rx) = mpsc::channel(1);
        let (ka_tx, ka_rx) = mpsc::channel(4);
        Arc::new(Device {
            mac,
            id: id.to_string(),
            kind,
            state: Mutex::new(DeviceState::default()),
            exchange_lock: TokioMutex::new(()),
            resp_tx,
            resp_rx: TokioMutex::new(resp_rx),
            waiters: AtomicUsize::new(0),
            ka_tx,
            ka_rx: TokioMutex::new(ka_rx),
        })
    }

    /// Whether a sequencer call is currently waiting on this device.
    pub fn has_waiter(&self) -> bool {
        self.waiters.load(Ordering::SeqCst) > 0
    }

    /// Hand a solicited-response candidate to the waiter, if there is one.
    /// Returns false when nobody is waiting (the frame then belongs to the
    /// event surface).
    pub fn deliver_response(&self, payload: Vec<u8>) -> bool {
        if !self.has_waiter() {
            return false;
        }
        self.resp_tx.try_send(payload).is_ok()
    }

    /// Queue an inbound Information frame for the keepalive engine.
    pub fn deliver_keepalive(&self, payload: Vec<u8>) {
        // A full queue just means the engine is behind on a periodic
        // signal; dropping is harmless.
        let _ = self.ka_tx.try_send(payload);
    }

    pub(crate) async fn take_keepalive_rx(
        &self,
    ) -> tokio::sync::MutexGuard<'_, mpsc::Receiver<Vec<u8>>> {
        self.ka_rx.lock().await
    }

    /// Transmit `frame` and wait for the next frame the dispatcher routes
    /// to this device.  At most one exchange runs at a time; timing out
    /// after `RESPONSE_TIMER` surfaces the failing step.
    pub async fn exchange(
        &self,
        tx: &TxHandle,
        frame: Vec<u8>,
        step: &'static str,
    ) -> OltdResult<Vec<u8>> {
        let _guard = self.exchange_lock.lock().await;
        let mut rx = self.resp_rx.lock().await;

        // Drop any response that arrived after a previous waiter gave up.
        while rx.try_recv().is_ok() {}

        self.waiters.fetch_add(1, Ordering::SeqCst);
        let _waiter = WaiterGuard(&self.waiters);
        tx.send(frame)?;

        match timeout(RESPONSE_TIMER, rx.recv()).await {
            Ok(Some(resp)) => Ok(resp),
            Ok(None) => {
                Err(OltdError::Transport("mailbox closed".to_string()))
            }
            Err(_) => Err(OltdError::Timeout {
                device: self.id.clone(),
                step,
            }),
        }
    }
}

// Decrements the waiter count even when the exchange future is dropped by
// cancellation.
struct WaiterGuard<'a>(&'a AtomicUsize);

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Process-wide map of known devices, keyed independently by MAC and by
/// the opaque device ID handed upward.
#[derive(Default)]
pub struct DeviceMap {
    by_mac: Mutex<BTreeMap<MacAddr, Arc<Device>>>,
    by_id: Mutex<BTreeMap<String, Arc<Device>>>,
}

impl DeviceMap {
    pub fn new() -> DeviceMap {
        DeviceMap::default()
    }

    /// Create a device entry if it does not exist yet.  Returns the entry
    /// and whether this call created it.
    pub fn insert(
        &self,
        mac: MacAddr,
        id: &str,
        kind: DeviceKind,
    ) -> (Arc<Device>, bool) {
        let mut by_mac = self.by_mac.lock().unwrap();
        if let Some(dev) = by_mac.get(&mac) {
            return (dev.clone(), false);
        }
        let dev = Device::new(mac, id, kind);
        by_mac.insert(mac, dev.clone());
        self.by_id
            .lock()
            .unwrap()
            .insert(id.to_string(), dev.clone());
        (dev, true)
    }

    pub fn get_by_mac(&self, mac: MacAddr) -> Option<Arc<Device>> {
        self.by_mac.lock().unwrap().get(&mac).cloned()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<Device>> {
        self.by_id.lock().unwrap().get(id).cloned()
    }

    pub fn delete(&self, id: &str) -> Option<Arc<Device>> {
        let dev = self.by_id.lock().unwrap().remove(id)?;
        self.by_mac.lock().unwrap().remove(&dev.mac);
        Some(dev)
    }

    pub fn delete_all(&self) {
        self.by_mac.lock().unwrap().clear();
        self.by_id.lock().unwrap().clear();
    }

    pub fn all(&self) -> Vec<Arc<Device>> {
        self.by_mac.lock().unwrap().values().cloned().collect()
    }

    /// Every known ONU, in MAC order.
    pub fn onus(&self) -> Vec<Arc<Device>> {
        self.by_mac
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.kind == DeviceKind::Onu)
            .cloned()
            .collect()
    }

    /// The OLT record, if one has been adopted.
    pub fn olt(&self) -> Option<Arc<Device>> {
        self.by_mac
            .lock()
            .unwrap()
            .values()
            .find(|d| d.kind == DeviceKind::Olt)
            .cloned()
    }
}
