// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Per-device keepalive: the three-phase OAMPDU Information handshake and
//! the reachability tracking built on it.  The state machine is plain data
//! so it can be driven without any I/O; `run` wraps it in the periodic
//! task attached to each device.

use std::sync::Arc;
use std::time::Duration;

use slog::debug;
use slog::info;
use slog::warn;
use tokio::time::interval;

use l2oam::info::OampduInfo;
use l2oam::PackageVariant;

use crate::device::Device;
use crate::events::Event;
use crate::Adapter;

pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(1);

/// Consecutive unanswered ticks before a device is declared unreachable.
pub const MISS_THRESHOLD: u32 = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    First,
    Second,
    Final,
}

/// What the engine wants done on a timer tick.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Tick {
    Send(Vec<u8>),
    /// Too many silent ticks; emit the frame anyway but announce the loss.
    Unreachable(Vec<u8>),
}

pub struct KeepAlive {
    phase: Phase,
    variant: PackageVariant,
    peer_local_info: Option<Vec<u8>>,
    misses: u32,
    lost: bool,
}

impl KeepAlive {
    pub fn new(variant: PackageVariant) -> KeepAlive {
        KeepAlive {
            phase: Phase::First,
            variant,
            peer_local_info: None,
            misses: 0,
            lost: false,
        }
    }

    pub fn variant(&self) -> PackageVariant {
        self.variant
    }

    /// The frame for the current phase, and reachability accounting for
    /// the silence since the previous tick.
    pub fn tick(&mut self) -> Tick {
        let frame = match (self.phase, &self.peer_local_info) {
            (Phase::First, _) | (_, None) => {
                OampduInfo::phase1(self.variant)
            }
            (Phase::Second, Some(li)) => OampduInfo::phase2(li, self.variant),
            (Phase::Final, Some(li)) => OampduInfo::phase3(li),
        }
        .encode();

        self.misses += 1;
        if self.misses > MISS_THRESHOLD && !self.lost {
            self.lost = true;
            return Tick::Unreachable(frame);
        }
        Tick::Send(frame)
    }

    /// Process an Information frame from the peer.  Returns the variant
    /// newly learned from its Organization-Specific TLV, if any.
    pub fn on_frame(&mut self, info: &OampduInfo) -> Option<PackageVariant> {
        self.misses = 0;
        let was_lost = std::mem::take(&mut self.lost);
        if was_lost {
            self.phase = Phase::First;
        }

        if let Some(li) = &info.local_info {
            self.peer_local_info = Some(li.clone());
        }

        let learned = info.variant();
        if let Some(v) = learned {
            self.variant = v;
        }

        match self.phase {
            Phase::First => {
                if self.peer_local_info.is_some() {
                    self.phase = Phase::Second;
                }
            }
            Phase::Second => {
                // The peer echoing us back means it saw our second phase.
                if info.remote_info.is_some() {
                    self.phase = Phase::Final;
                }
            }
            Phase::Final => {}
        }
        learned
    }

    pub fn reachable(&self) -> bool {
        !self.lost
    }
}

/// The per-device keepalive task, started when the device is adopted or
/// registered.  Runs until the device record is dropped from the registry.
pub(crate) async fn run(adapter: Arc<Adapter>, dev: Arc<Device>) {
    let log = adapter
        .log
        .new(slog::o!("unit" => "keepalive", "device" => dev.id.clone()));
    let initial = dev
        .state
        .lock()
        .unwrap()
        .variant
        .unwrap_or(PackageVariant::B);
    let mut engine = KeepAlive::new(initial);
    let mut ticker = interval(KEEPALIVE_PERIOD);
    let mut ka_rx = dev.take_keepalive_rx().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = match engine.tick() {
                    Tick::Send(f) => f,
                    Tick::Unreachable(f) => {
                        warn!(log, "device unreachable");
                        adapter.emit(Event::DeviceUnreachable {
                            device_id: dev.id.clone(),
                        });
                        dev.state.lock().unwrap().active = false;
                        f
                    }
                };
                let eth = adapter.assemble(
                    dev.mac,
                    l2oam::eth::ETHERTYPE_L2OAM,
                    &frame,
                );
                if adapter.tx.send(eth).is_err() {
                    debug!(log, "transmitter gone, keepalive exiting");
                    return;
                }
            }
            payload = ka_rx.recv() => {
                let Some(payload) = payload else {
                    debug!(log, "device dropped, keepalive exiting");
                    return;
                };
                let info = match OampduInfo::parse(&payload) {
                    Ok(i) => i,
                    Err(e) => {
                        debug!(log, "bad Information frame: {e}");
                        continue;
                    }
                };
                let recorded = dev.state.lock().unwrap().variant;
                if let Some(v) = recorded {
                    if !info.matches(v) {
                        warn!(log, "peer fingerprint conflicts with \
                              recorded variant"; "recorded" => ?v);
                    }
                }
                let was_reachable = engine.reachable();
                if let Some(variant) = engine.on_frame(&info) {
                    let mut state = dev.state.lock().unwrap();
                    if state.variant != Some(variant) {
                        info!(log, "learned package variant";
                            "variant" => ?variant);
                        state.variant = Some(variant);
                    }
                }
                if !was_reachable && engine.reachable() {
                    info!(log, "device reachable again");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2oam::FLAGS_INFO_FINAL;
    use l2oam::FLAGS_INFO_FIRST;
    use l2oam::FLAGS_INFO_SECOND;

    fn peer_frame(
        flags: u16,
        echo_us: bool,
        variant: Option<PackageVariant>,
    ) -> OampduInfo {
        OampduInfo {
            flags,
            local_info: Some(vec![0xbb; 14]),
            remote_info: echo_us.then(|| vec![0xcc; 14]),
            org_specific: variant.map(|v| match v {
                PackageVariant::A => vec![0x00, 0x10, 0x00, 0x00, 0x23],
                PackageVariant::B => vec![0x90, 0x82, 0x60, 0x02, 0x01, 0x01],
            }),
        }
    }

    #[test]
    fn test_phase_progression() {
        let mut ka = KeepAlive::new(PackageVariant::B);

        // Phase one until the peer says something.
        let Tick::Send(f) = ka.tick() else { panic!() };
        let sent = OampduInfo::parse(&f).unwrap();
        assert_eq!(sent.flags, FLAGS_INFO_FIRST);

        // Peer's first frame moves us to phase two, echoing its local
        // info.
        let learned = ka.on_frame(&peer_frame(
            FLAGS_INFO_FIRST,
            false,
            Some(PackageVariant::A),
        ));
        assert_eq!(learned, Some(PackageVariant::A));
        let Tick::Send(f) = ka.tick() else { panic!() };
        let sent = OampduInfo::parse(&f).unwrap();
        assert_eq!(sent.flags, FLAGS_INFO_SECOND);
        assert_eq!(sent.remote_info.as_deref(), Some(&[0xbb; 14][..]));

        // The peer echoing us moves us to steady state.
        ka.on_frame(&peer_frame(FLAGS_INFO_SECOND, true, None));
        let Tick::Send(f) = ka.tick() else { panic!() };
        assert_eq!(OampduInfo::parse(&f).unwrap().flags, FLAGS_INFO_FINAL);
    }

    #[test]
    fn test_unreachable_after_misses() {
        let mut ka = KeepAlive::new(PackageVariant::B);
        for _ in 0..MISS_THRESHOLD {
            assert!(matches!(ka.tick(), Tick::Send(_)));
        }
        assert!(matches!(ka.tick(), Tick::Unreachable(_)));
        assert!(!ka.reachable());
        // Only announced once.
        assert!(matches!(ka.tick(), Tick::Send(_)));
    }

    #[test]
    fn test_recovery_restarts_handshake() {
        let mut ka = KeepAlive::new(PackageVariant::B);
        for _ in 0..=MISS_THRESHOLD {
            ka.tick();
        }
        assert!(!ka.reachable());

        ka.on_frame(&peer_frame(FLAGS_INFO_FIRST, false, None));
        assert!(ka.reachable());
        // Back in the handshake, not steady state.
        let Tick::Send(f) = ka.tick() else { panic!() };
        assert_eq!(
            OampduInfo::parse(&f).unwrap().flags,
            FLAGS_INFO_SECOND
        );
    }

    #[test]
    fn test_variant_sticks() {
        let mut ka = KeepAlive::new(PackageVariant::B);
        ka.on_frame(&peer_frame(
            FLAGS_INFO_FIRST,
            false,
            Some(PackageVariant::A),
        ));
        // A steady-state frame with no fingerprint leaves it alone.
        ka.on_frame(&peer_frame(FLAGS_INFO_FINAL, true, None));
        assert_eq!(ka.variant(), PackageVariant::A);
    }
}
