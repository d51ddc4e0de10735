// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! The upward event surface: autonomous frames and state transitions that
//! the orchestration layer needs to hear about.

use std::sync::Arc;

use slog::debug;
use slog::info;
use slog::warn;

use common::network::MacAddr;
use l2oam::toam::AutonomousEvent;

use crate::device::Device;
use crate::device::DeviceKind;
use crate::ledger;
use crate::Adapter;

/// Events published on the adapter's broadcast channel.
#[derive(Clone, Debug)]
pub enum Event {
    /// A previously unseen ONU showed up behind the OLT.
    OnuDiscovered { mac: MacAddr, instance: u32 },
    /// The OLT assigned (or re-announced) a PON link for an ONU.
    OnuRegistered {
        device_id: String,
        mac: MacAddr,
        instance: u32,
    },
    /// A device missed too many keepalives.
    DeviceUnreachable { device_id: String },
    /// A frame the dispatcher could not attribute, or an EAPOL frame
    /// passed through from a subscriber port.
    PacketIn { source: MacAddr, frame: Vec<u8> },
}

/// Handle a TOAM frame nobody was waiting for.  Registration events create
/// the ONU record; everything else is just logged.
pub(crate) async fn handle_unsolicited(
    adapter: &Arc<Adapter>,
    source: &Arc<Device>,
    payload: &[u8],
) {
    let event = match AutonomousEvent::parse(payload) {
        Ok(ev) => ev,
        Err(e) => {
            debug!(
                adapter.log,
                "undecodable unsolicited frame";
                "device" => &source.id,
                "error" => %e,
            );
            return;
        }
    };

    if !event.is_registration() {
        debug!(
            adapter.log,
            "unsolicited event";
            "device" => &source.id,
            "branch" => event.resp.vc_branch,
            "leaf" => event.resp.vc_leaf,
        );
        return;
    }

    match event.registration() {
        Ok((instance, mac)) => {
            register_onu(adapter, instance, mac).await;
        }
        Err(e) => {
            warn!(adapter.log, "bad registration event"; "error" => %e);
        }
    }
}

/// Create (or refresh) the ONU record named by a registration event, note
/// it in the status ledger, and announce it upward.
pub(crate) async fn register_onu(
    adapter: &Arc<Adapter>,
    instance: u32,
    mac: MacAddr,
) {
    let id = format!("onu-{}", u64::from(mac));
    let (dev, created) =
        adapter.devices.insert(mac, &id, DeviceKind::Onu);
    {
        let mut state = dev.state.lock().unwrap();
        state.onu_instance = Some(instance);
        state.link_up = true;
    }

    if created {
        adapter.spawn_keepalive(&dev);
        let entry = ledger::OnuStatus {
            id: id.clone(),
            admin_state: "ENABLED".to_string(),
            ope_state: "ACTIVE".to_string(),
            con_state: "REACHABLE".to_string(),
            mac_addr: mac.to_string(),
            reboot_state: String::new(),
        };
        if let Err(e) = adapter.ledger.add(&entry) {
            warn!(adapter.log, "failed to record ONU"; "error" => %e);
        }
        adapter.emit(Event::OnuDiscovered { mac, instance });
    }

    info!(
        adapter.log,
        "ONU registered";
        "device" => &id,
        "mac" => %mac,
        "instance" => instance,
    );
    adapter.emit(Event::OnuRegistered {
        device_id: id,
        mac,
        instance,
    });
}
