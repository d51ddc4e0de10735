// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! The single raw-Ethernet attachment to the access network.  One capture
//! handle feeds inbound frames to the dispatcher from a dedicated thread;
//! a second handle drains an mpsc channel of outbound frames, so senders
//! never contend for the socket itself.

use std::thread;

use slog::debug;
use slog::error;
use slog::info;
use tokio::sync::mpsc;

use l2oam::eth::EthFrame;

use crate::types::OltdError;
use crate::types::OltdResult;

/// Everything the OS-level filter lets through: slow-protocol OAM, EAPOL,
/// and both tag TPIDs.
const BPF_FILTER: &str = "ether proto 0xa8c8 or ether proto 0x888e \
                          or ether proto 0x8100 or ether proto 0x88a8";

const SNAPLEN: i32 = 1500;
const PCAP_TIMEOUT_MS: i32 = 1000;

/// A clone-able handle for queueing a frame for emission.  Sending never
/// blocks the caller.
#[derive(Clone)]
pub struct TxHandle {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl TxHandle {
    pub fn send(&self, frame: Vec<u8>) -> OltdResult<()> {
        self.tx
            .send(frame)
            .map_err(|_| OltdError::Transport("transmitter gone".to_string()))
    }
}

/// A transmit handle paired with its drain side, for wiring up a transport
/// (or a test double).
pub fn channel() -> (TxHandle, mpsc::UnboundedReceiver<Vec<u8>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TxHandle { tx }, rx)
}

fn open_capture(
    interface: &str,
) -> OltdResult<pcap::Capture<pcap::Active>> {
    let device = pcap::Device::from(interface);
    let cap = pcap::Capture::from_device(device)?
        .promisc(true)
        .snaplen(SNAPLEN)
        .timeout(PCAP_TIMEOUT_MS)
        .immediate_mode(true)
        .open()?;
    Ok(cap)
}

/// Open the interface and start the receive and transmit workers.  Failure
/// to open is fatal; per-frame failures later are logged and dropped.
pub fn start(
    log: &slog::Logger,
    interface: &str,
    strip_stag: bool,
    frames_out: mpsc::Sender<EthFrame>,
) -> OltdResult<TxHandle> {
    let mut rx_cap = open_capture(interface)?;
    rx_cap.filter(BPF_FILTER, true)?;
    let mut tx_cap = open_capture(interface)?;

    info!(log, "transport open"; "interface" => interface);

    let rx_log = log.new(slog::o!("unit" => "transport_rx"));
    thread::spawn(move || {
        loop {
            let data = match rx_cap.next_packet() {
                Ok(pkt) => pkt.data.to_vec(),
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(e) => {
                    error!(rx_log, "capture died: {e}");
                    return;
                }
            };
            let frame = match EthFrame::parse(&data) {
                Ok(f) => f,
                Err(e) => {
                    debug!(rx_log, "skipping undecodable frame: {e}");
                    continue;
                }
            };
            let frame = if strip_stag {
                match frame.strip_stag() {
                    Ok(f) => f,
                    Err(e) => {
                        debug!(rx_log, "skipping bad s-tag: {e}");
                        continue;
                    }
                }
            } else {
                frame
            };
            if frames_out.blocking_send(frame).is_err() {
                debug!(rx_log, "dispatcher gone, receive thread exiting");
                return;
            }
        }
    });

    let (handle, mut out_rx) = channel();
    let tx_log = log.new(slog::o!("unit" => "transport_tx"));
    thread::spawn(move || {
        while let Some(frame) = out_rx.blocking_recv() {
            if let Err(e) = tx_cap.sendpacket(&frame[..]) {
                error!(tx_log, "failed to send frame: {e}");
            }
        }
        debug!(tx_log, "transmit thread exiting");
    });

    Ok(handle)
}
