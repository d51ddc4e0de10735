// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Inbound frame classification.  One task owns this; for a given source
//! MAC, frames are handled strictly in arrival order.

use std::sync::Arc;

use slog::debug;
use slog::error;
use tokio::sync::mpsc;

use l2oam::eth;
use l2oam::eth::EthFrame;

use crate::events;
use crate::events::Event;
use crate::Adapter;

pub(crate) async fn run(
    adapter: Arc<Adapter>,
    mut frames: mpsc::Receiver<EthFrame>,
) {
    while let Some(frame) = frames.recv().await {
        handle_frame(&adapter, frame).await;
    }
    debug!(adapter.log, "transport closed, dispatcher exiting");
}

pub(crate) async fn handle_frame(adapter: &Arc<Adapter>, frame: EthFrame) {
    match frame.ethertype {
        // Subscriber authentication traffic: pass through for a known
        // ONU, packet-in for anything else.
        eth::ETHERTYPE_EAPOL | eth::ETHERTYPE_CTAG => {
            match adapter.devices.get_by_mac(frame.src) {
                Some(dev) => {
                    debug!(adapter.log, "EAPOL pass-through";
                        "device" => &dev.id);
                }
                None => {
                    debug!(adapter.log, "EAPOL from unknown source";
                        "mac" => %frame.src);
                }
            }
            adapter.emit(Event::PacketIn {
                source: frame.src,
                frame: frame.payload,
            });
        }
        eth::ETHERTYPE_L2OAM => {
            if frame.payload.len() < 4 {
                debug!(adapter.log, "runt OAM frame"; "mac" => %frame.src);
                return;
            }
            let Some(dev) = adapter.devices.get_by_mac(frame.src) else {
                error!(adapter.log, "OAM frame from unknown source";
                    "mac" => %frame.src);
                adapter.emit(Event::PacketIn {
                    source: frame.src,
                    frame: frame.payload,
                });
                return;
            };

            let opcode = frame.payload[0];
            let code = frame.payload[3];
            if opcode == l2oam::OPCODE_OAM && code == l2oam::CODE_INFO {
                dev.deliver_keepalive(frame.payload);
            } else if dev.deliver_response(frame.payload.clone()) {
                // A sequencer call was waiting; it owns the frame now.
            } else {
                events::handle_unsolicited(adapter, &dev, &frame.payload)
                    .await;
            }
        }
        other => {
            debug!(adapter.log, "dropping unhandled EtherType";
                "ethertype" => format!("{other:#06x}"),
                "mac" => %frame.src);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;
    use crate::test_fixture;
    use common::network::MacAddr;
    use l2oam::info::OampduInfo;
    use l2oam::toam::AutonomousEvent;
    use l2oam::PackageVariant;

    fn olt_frame(src: MacAddr, payload: Vec<u8>) -> EthFrame {
        EthFrame {
            dst: MacAddr::new(2, 0, 0, 0, 0, 0xfe),
            src,
            ethertype: eth::ETHERTYPE_L2OAM,
            payload,
        }
    }

    #[tokio::test]
    async fn test_unknown_source_becomes_packet_in() {
        let (adapter, _sent) = test_fixture();
        let mut events = adapter.subscribe_events();

        let stranger = MacAddr::new(6, 6, 6, 6, 6, 6);
        handle_frame(
            &adapter,
            olt_frame(stranger, vec![0x03, 0x00, 0x50, 0xfe]),
        )
        .await;

        match events.try_recv().unwrap() {
            Event::PacketIn { source, .. } => assert_eq!(source, stranger),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keepalive_routed_to_engine() {
        let (adapter, _sent) = test_fixture();
        let mac = MacAddr::new(2, 0, 0, 0, 0, 1);
        let (dev, _) = adapter.devices.insert(mac, "olt-1", DeviceKind::Olt);

        let ka = OampduInfo::phase1(PackageVariant::B).encode();
        handle_frame(&adapter, olt_frame(mac, ka.clone())).await;

        let mut rx = dev.take_keepalive_rx().await;
        assert_eq!(rx.try_recv().unwrap(), ka);
    }

    #[tokio::test]
    async fn test_solicited_response_reaches_waiter() {
        let (adapter, mut sent) = test_fixture();
        let mac = MacAddr::new(2, 0, 0, 0, 0, 1);
        let (dev, _) = adapter.devices.insert(mac, "olt-1", DeviceKind::Olt);

        let waiter = {
            let dev = dev.clone();
            let tx = adapter.tx.clone();
            tokio::spawn(async move {
                dev.exchange(&tx, vec![0x00], "probe").await
            })
        };
        // The request leaving the transmitter means the waiter is parked.
        sent.recv().await.unwrap();

        let resp = vec![0x03, 0x00, 0x50, 0xfe, 0xaa];
        handle_frame(&adapter, olt_frame(mac, resp.clone())).await;
        assert_eq!(waiter.await.unwrap().unwrap(), resp);
    }

    #[tokio::test]
    async fn test_unsolicited_registration_creates_onu() {
        let (adapter, _sent) = test_fixture();
        let olt_mac = MacAddr::new(2, 0, 0, 0, 0, 1);
        adapter.devices.insert(olt_mac, "olt-1", DeviceKind::Olt);
        let mut events = adapter.subscribe_events();

        let onu_mac = MacAddr::new(2, 0, 0, 0, 0, 9);
        let reg = AutonomousEvent::registration_frame(3, onu_mac);
        handle_frame(&adapter, olt_frame(olt_mac, reg)).await;

        let onu = adapter.devices.get_by_mac(onu_mac).expect("ONU record");
        assert_eq!(onu.state.lock().unwrap().onu_instance, Some(3));

        match events.try_recv().unwrap() {
            Event::OnuDiscovered { mac, instance } => {
                assert_eq!(mac, onu_mac);
                assert_eq!(instance, 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::OnuRegistered { .. }
        ));
    }

    #[tokio::test]
    async fn test_eapol_passes_through() {
        let (adapter, _sent) = test_fixture();
        let onu_mac = MacAddr::new(2, 0, 0, 0, 0, 9);
        adapter.devices.insert(onu_mac, "onu-1", DeviceKind::Onu);
        let mut events = adapter.subscribe_events();

        handle_frame(
            &adapter,
            EthFrame {
                dst: MacAddr::BROADCAST,
                src: onu_mac,
                ethertype: eth::ETHERTYPE_EAPOL,
                payload: vec![0x01, 0x00, 0x00, 0x00],
            },
        )
        .await;

        assert!(matches!(
            events.try_recv().unwrap(),
            Event::PacketIn { .. }
        ));
    }
}
