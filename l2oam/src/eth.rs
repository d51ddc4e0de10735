// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Ethernet-II framing for L2OAM traffic, including the optional outer
//! management S-tag used when the link to the OLT is VLAN-switched.

use bytes::BufMut;
use bytes::BytesMut;

use common::network::MacAddr;

use crate::parse_error;
use crate::pbuf::ParseBuffer;
use crate::FrameResult;

pub const ETHERTYPE_L2OAM: u16 = 0xa8c8;
pub const ETHERTYPE_EAPOL: u16 = 0x888e;
pub const ETHERTYPE_CTAG: u16 = 0x8100;
pub const ETHERTYPE_STAG: u16 = 0x88a8;
pub const ETHERTYPE_DISCOVERY: u16 = 0x8809;

/// VID of the outer management S-tag.
pub const MGMT_VID: u16 = 0x0ffb;

/// A decoded Ethernet frame, after any outer S-tag has been stripped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EthFrame {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
    pub payload: Vec<u8>,
}

impl EthFrame {
    pub fn parse(data: &[u8]) -> FrameResult<EthFrame> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let dst = pb.get_mac()?;
        let src = pb.get_mac()?;
        let ethertype = pb.get_u16()?;
        let payload = pb.get_bytes(pb.bytes_left())?;
        Ok(EthFrame {
            dst,
            src,
            ethertype,
            payload,
        })
    }

    /// If this frame carries an outer S-tag, peel it off and return the
    /// inner frame.  Frames without an S-tag are returned unchanged.
    pub fn strip_stag(self) -> FrameResult<EthFrame> {
        if self.ethertype != ETHERTYPE_STAG {
            return Ok(self);
        }
        let mut pb = ParseBuffer::new_from_slice(&self.payload);
        let _tci = pb.get_u16()?;
        let inner_type = pb.get_u16()?;
        if pb.bytes_left() == 0 {
            return Err(parse_error(&pb, "empty s-tagged frame"));
        }
        let payload = pb.get_bytes(pb.bytes_left())?;
        Ok(EthFrame {
            dst: self.dst,
            src: self.src,
            ethertype: inner_type,
            payload,
        })
    }
}

/// Assemble an untagged frame.
pub fn frame(
    dst: MacAddr,
    src: MacAddr,
    ethertype: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut v = BytesMut::with_capacity(14 + payload.len());
    v.put_slice(&dst.to_vec());
    v.put_slice(&src.to_vec());
    v.put_u16(ethertype);
    v.put_slice(payload);
    v.to_vec()
}

/// Assemble a frame wrapped in the outer management S-tag.
pub fn frame_tagged(
    dst: MacAddr,
    src: MacAddr,
    ethertype: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut v = BytesMut::with_capacity(18 + payload.len());
    v.put_slice(&dst.to_vec());
    v.put_slice(&src.to_vec());
    v.put_u16(ETHERTYPE_STAG);
    v.put_u16(MGMT_VID);
    v.put_u16(ethertype);
    v.put_slice(payload);
    v.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn macs() -> (MacAddr, MacAddr) {
        (
            MacAddr::new(0xe8, 0xb4, 0x70, 0x70, 0x04, 0x07),
            MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55),
        )
    }

    #[test]
    fn test_untagged_roundtrip() {
        let (dst, src) = macs();
        let raw = frame(dst, src, ETHERTYPE_L2OAM, &[0x03, 0x00, 0x50]);
        let f = EthFrame::parse(&raw).unwrap();
        assert_eq!(f.dst, dst);
        assert_eq!(f.src, src);
        assert_eq!(f.ethertype, ETHERTYPE_L2OAM);
        assert_eq!(f.payload, vec![0x03, 0x00, 0x50]);
    }

    #[test]
    fn test_tag_layout() {
        let (dst, src) = macs();
        let raw = frame_tagged(dst, src, ETHERTYPE_L2OAM, &[0xaa]);
        // Outer tag sits between the source MAC and the inner EtherType.
        assert_eq!(&raw[12..18], hex!("88 a8 0f fb a8 c8"));
    }

    #[test]
    fn test_strip_stag() {
        let (dst, src) = macs();
        let raw = frame_tagged(dst, src, ETHERTYPE_L2OAM, &[0x03, 0x00]);
        let f = EthFrame::parse(&raw).unwrap().strip_stag().unwrap();
        assert_eq!(f.ethertype, ETHERTYPE_L2OAM);
        assert_eq!(f.payload, vec![0x03, 0x00]);
    }

    #[test]
    fn test_strip_noop_without_tag() {
        let (dst, src) = macs();
        let raw = frame(dst, src, ETHERTYPE_EAPOL, &[0x01]);
        let f = EthFrame::parse(&raw).unwrap();
        let g = f.clone().strip_stag().unwrap();
        assert_eq!(f, g);
    }

    #[test]
    fn test_short_frame() {
        assert!(EthFrame::parse(&[0x00, 0x01]).is_err());
    }
}
