// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Main application entry point for `oltd`, the EPON OLT management
//! adapter.  It owns one raw-Ethernet attachment to the access network and
//! turns abstract operations (adopt, enable, provision a flow, reboot)
//! into the vendor L2OAM dialect the OLT speaks.

use std::sync::Arc;

use anyhow::Context;
use futures::stream::StreamExt;
use libc::c_int;
use signal_hook::consts::SIGHUP;
use signal_hook::consts::SIGINT;
use signal_hook::consts::SIGQUIT;
use signal_hook::consts::SIGTERM;
use signal_hook_tokio::Signals;
use slog::error;
use slog::info;
use structopt::StructOpt;
use tokio::sync::broadcast;
use tokio::sync::mpsc;

use common::network::MacAddr;
use l2oam::eth;

use crate::device::Device;
use crate::device::DeviceKind;
use crate::device::DeviceMap;
use crate::events::Event;
use crate::ledger::Ledger;
use crate::tags::CorrelationTags;
use crate::transport::TxHandle;
use crate::types::OltdResult;

mod config;
mod ctl;
mod device;
mod dispatch;
mod events;
mod keepalive;
mod ledger;
mod mount;
mod sequence;
mod tags;
mod transport;
mod types;

#[derive(Debug, Default, StructOpt)]
#[structopt(name = "oltd", about = "EPON OLT management adapter")]
pub(crate) struct Opt {
    #[structopt(
        long,
        help = "send log data to the named file rather than stdout"
    )]
    log_file: Option<String>,

    #[structopt(
        long,
        short = "l",
        help = "format logs for 'human' or 'json' consumption"
    )]
    log_format: Option<common::logging::LogFormat>,

    #[structopt(
        long,
        default_value = "eth0",
        help = "OS name of the interface facing the OLT"
    )]
    interface_name: String,

    #[structopt(
        long,
        help = "source MAC address placed in every outbound frame",
        parse(try_from_str)
    )]
    src_mac: Option<MacAddr>,

    #[structopt(
        long,
        help = "MAC address of the OLT to adopt at startup",
        parse(try_from_str)
    )]
    olt_mac: Option<MacAddr>,

    #[structopt(long, help = "send management frames without the outer \
                              S-tag")]
    no_vlan: bool,

    #[structopt(
        long,
        help = "directory for the ONU ledger and the command file"
    )]
    state_dir: Option<String>,
}

/// The main context object for running all of `oltd`.
pub struct Adapter {
    pub log: slog::Logger,
    pub config: config::Config,
    pub devices: DeviceMap,
    pub tags: CorrelationTags,
    pub tx: TxHandle,
    pub ledger: Ledger,
    events: broadcast::Sender<Event>,
}

impl Adapter {
    pub fn new(
        log: slog::Logger,
        config: config::Config,
        tx: TxHandle,
    ) -> Arc<Adapter> {
        let (events, _) = broadcast::channel(64);
        let ledger = Ledger::new(&config.state_dir);
        Arc::new(Adapter {
            log,
            config,
            devices: DeviceMap::new(),
            tags: CorrelationTags::new(),
            tx,
            ledger,
            events,
        })
    }

    /// A live feed of the adapter's upward events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: Event) {
        // A send error just means nobody is subscribed right now.
        let _ = self.events.send(event);
    }

    /// Build the on-wire form of one frame to `dst`.  Management traffic
    /// gets the outer S-tag when VLAN mode is on; discovery never does.
    pub(crate) fn assemble(
        &self,
        dst: MacAddr,
        ethertype: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        if self.config.vlan_mode && ethertype != eth::ETHERTYPE_DISCOVERY {
            eth::frame_tagged(dst, self.config.src_mac, ethertype, payload)
        } else {
            eth::frame(dst, self.config.src_mac, ethertype, payload)
        }
    }

    pub(crate) fn olt(&self) -> OltdResult<Arc<Device>> {
        self.devices.olt().ok_or_else(|| {
            types::OltdError::PreconditionUnmet(
                "no OLT has been adopted".to_string(),
            )
        })
    }

    /// Create the OLT record and start talking to it.  Idempotent; the
    /// keepalive engine starts on first adoption.
    pub async fn adopt_device(
        self: &Arc<Self>,
        mac: MacAddr,
    ) -> OltdResult<String> {
        let id = format!("olt-{:012x}", u64::from(mac));
        let (dev, created) = self.devices.insert(mac, &id, DeviceKind::Olt);
        if created {
            info!(self.log, "adopted OLT"; "device" => &id, "mac" => %mac);
            self.spawn_keepalive(&dev);
        }
        Ok(dev.id.clone())
    }

    pub(crate) fn spawn_keepalive(self: &Arc<Self>, dev: &Arc<Device>) {
        tokio::spawn(keepalive::run(self.clone(), dev.clone()));
    }
}

async fn handle_signals(adapter: &Adapter, mut signals: Signals) {
    let log = adapter.log.new(slog::o!("unit" => "signal_handler"));
    let handle = signals.handle();
    while let Some(signal) = signals.next().await {
        match signal {
            SIGTERM | SIGQUIT | SIGINT | SIGHUP => {
                info!(log, "received signal"; "sig" => signal);
                handle.close();
                return;
            }
            _ => unreachable!(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opt::from_args();
    let config = config::build_config(&opts)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let log =
        common::logging::init("oltd", &config.log_file, config.log_format)?;
    info!(log, "oltd config: {config:#?}");

    let (frames_tx, frames_rx) = mpsc::channel(256);
    let tx = transport::start(
        &log,
        &config.interface_name,
        config.vlan_mode,
        frames_tx,
    )
    .context("opening the OLT-facing interface")?;

    let adapter = Adapter::new(log, config, tx);

    tokio::spawn(dispatch::run(adapter.clone(), frames_rx));
    tokio::spawn(ledger::watch(adapter.clone()));
    tokio::spawn(ctl::watch(adapter.clone()));

    if let Some(mac) = adapter.config.olt_mac {
        let id = adapter.adopt_device(mac).await?;
        match adapter.get_device_info().await {
            Ok(info) => {
                info!(adapter.log, "OLT online"; "device" => &id,
                    "serial" => &info.serial_number);
                if let Err(e) = adapter.enable_indication().await {
                    error!(adapter.log, "failed to enable indications";
                        "error" => %e);
                }
            }
            Err(e) => {
                error!(adapter.log, "discovery failed"; "device" => &id,
                    "error" => %e);
            }
        }
    }

    const SIGNALS: &[c_int] = &[SIGTERM, SIGQUIT, SIGINT, SIGHUP];
    let signals = Signals::new(SIGNALS).unwrap();
    handle_signals(&adapter, signals).await;

    info!(adapter.log, "done");
    Ok(())
}

/// An adapter wired to an in-memory transmitter, plus the drain side of
/// that transmitter, for exercising sequences without an interface.
#[cfg(test)]
pub(crate) fn test_fixture(
) -> (Arc<Adapter>, mpsc::UnboundedReceiver<Vec<u8>>) {
    use slog::Drain;

    let decorator = slog_term::PlainDecorator::new(std::io::sink());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let log = slog::Logger::root(drain, slog::o!());

    let (tx, sent) = transport::channel();
    let config = config::Config {
        src_mac: MacAddr::new(0x02, 0, 0, 0, 0, 0xfe),
        state_dir: {
            let dir = std::env::temp_dir()
                .join(format!("oltd-fixture-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            dir
        },
        ..config::Config::default()
    };
    (Adapter::new(log, config, tx), sent)
}
