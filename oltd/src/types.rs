// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! General types used throughout `oltd`.

use std::convert;

pub type OltdResult<T> = Result<T, OltdError>;

#[derive(Debug, thiserror::Error)]
pub enum OltdError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("frame error: {0}")]
    Frame(#[from] l2oam::FrameError),
    #[error("no response from {device} for {step}")]
    Timeout { device: String, step: &'static str },
    #[error("{step} rejected with result code {code:#04x}")]
    ProtocolReject { step: &'static str, code: u8 },
    #[error("precondition unmet: {0}")]
    PreconditionUnmet(String),
    #[error("no such device: {0}")]
    NoSuchDevice(String),
    #[error("Error: {0}")]
    Other(String),
}

impl convert::From<pcap::Error> for OltdError {
    fn from(err: pcap::Error) -> Self {
        OltdError::Transport(err.to_string())
    }
}

impl convert::From<serde_json::Error> for OltdError {
    fn from(err: serde_json::Error) -> Self {
        OltdError::Other(format!("JSON error: {err}"))
    }
}

impl convert::From<String> for OltdError {
    fn from(err: String) -> Self {
        OltdError::Other(err)
    }
}

impl convert::From<&str> for OltdError {
    fn from(err: &str) -> Self {
        OltdError::Other(err.to_string())
    }
}
