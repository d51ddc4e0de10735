// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! OAMPDU Information frames: the three-phase keepalive handshake run with
//! every device, and the variant fingerprint carried in the
//! Organization-Specific Information TLV.
//!
//! TLV lengths here count the type and length bytes as well as the value.

use bytes::BufMut;
use bytes::BytesMut;

use crate::parse_error;
use crate::pbuf::ParseBuffer;
use crate::FrameError;
use crate::FrameResult;
use crate::CODE_INFO;
use crate::FLAGS_INFO_FINAL;
use crate::FLAGS_INFO_FIRST;
use crate::FLAGS_INFO_SECOND;
use crate::OPCODE_OAM;
use crate::PackageVariant;

pub const TLV_LOCAL_INFO: u8 = 0x01;
pub const TLV_REMOTE_INFO: u8 = 0x02;
pub const TLV_ORG_SPECIFIC: u8 = 0xfe;

/// The Local Information payload we advertise in every phase.
pub const LOCAL_INFO: [u8; 14] = [
    0x01, 0x00, 0x00, 0x00, 0x1b, 0x04, 0xb0, 0x2a, 0xea, 0x15, 0x00, 0x00,
    0x00, 0x23,
];

fn org_specific(variant: PackageVariant) -> Vec<u8> {
    match variant {
        PackageVariant::A => vec![0x00, 0x10, 0x00, 0x00, 0x23],
        PackageVariant::B => vec![0x90, 0x82, 0x60, 0x02, 0x01, 0x01],
    }
}

/// A decoded (or to-be-encoded) Information PDU.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OampduInfo {
    pub flags: u16,
    pub local_info: Option<Vec<u8>>,
    pub remote_info: Option<Vec<u8>>,
    pub org_specific: Option<Vec<u8>>,
}

impl OampduInfo {
    /// First handshake phase: our Local Information and our variant
    /// fingerprint.
    pub fn phase1(variant: PackageVariant) -> OampduInfo {
        OampduInfo {
            flags: FLAGS_INFO_FIRST,
            local_info: Some(LOCAL_INFO.to_vec()),
            remote_info: None,
            org_specific: Some(org_specific(variant)),
        }
    }

    /// Second phase: echo the peer's Local Information back as our Remote
    /// Information.
    pub fn phase2(peer_li: &[u8], variant: PackageVariant) -> OampduInfo {
        OampduInfo {
            flags: FLAGS_INFO_SECOND,
            local_info: Some(LOCAL_INFO.to_vec()),
            remote_info: Some(peer_li.to_vec()),
            org_specific: Some(org_specific(variant)),
        }
    }

    /// Steady state: local and remote information only.
    pub fn phase3(peer_li: &[u8]) -> OampduInfo {
        OampduInfo {
            flags: FLAGS_INFO_FINAL,
            local_info: Some(LOCAL_INFO.to_vec()),
            remote_info: Some(peer_li.to_vec()),
            org_specific: None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::new();
        v.put_u8(OPCODE_OAM);
        v.put_u16(self.flags);
        v.put_u8(CODE_INFO);
        for (tlv_type, value) in [
            (TLV_LOCAL_INFO, &self.local_info),
            (TLV_REMOTE_INFO, &self.remote_info),
            (TLV_ORG_SPECIFIC, &self.org_specific),
        ] {
            if let Some(value) = value {
                v.put_u8(tlv_type);
                v.put_u8((value.len() + 2) as u8);
                v.put_slice(value);
            }
        }
        v.to_vec()
    }

    pub fn parse(data: &[u8]) -> FrameResult<OampduInfo> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let opcode = pb.get_u8()?;
        let flags = pb.get_u16()?;
        let code = pb.get_u8()?;
        if opcode != OPCODE_OAM || code != CODE_INFO {
            return Err(parse_error(&pb, "not an Information PDU"));
        }

        let mut info = OampduInfo {
            flags,
            ..Default::default()
        };
        while pb.bytes_left() >= 2 {
            let tlv_type = pb.get_u8()?;
            let tlv_len = pb.get_u8()?;
            if tlv_len == 0 {
                break;
            }
            if tlv_len < 2 {
                return Err(parse_error(&pb, "TLV shorter than its header"));
            }
            let value = pb.get_bytes(tlv_len as usize - 2)?;
            match tlv_type {
                TLV_LOCAL_INFO => info.local_info = Some(value),
                TLV_REMOTE_INFO => info.remote_info = Some(value),
                TLV_ORG_SPECIFIC => info.org_specific = Some(value),
                t => return Err(FrameError::UnknownTlvType { tlv_type: t }),
            }
        }
        Ok(info)
    }

    /// Infer the firmware dialect from the Organization-Specific TLV.
    /// `None` means the frame doesn't discriminate (no OSI at all, as in
    /// steady-state keepalives).
    pub fn variant(&self) -> Option<PackageVariant> {
        let osi = self.org_specific.as_ref()?;
        if osi.len() >= 3 {
            if osi[0] == 0x00 && osi[1] == 0x10 && osi[2] == 0x00 {
                return Some(PackageVariant::A);
            }
            if osi[0] == 0x90 && osi[1] == 0x82 && osi[2] == 0x60 {
                return Some(PackageVariant::B);
            }
        }
        None
    }

    /// Whether this frame is consistent with `variant`.  Frames without a
    /// discriminating OSI match every variant.
    pub fn matches(&self, variant: PackageVariant) -> bool {
        match self.variant() {
            None => true,
            Some(v) => v == variant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_phase1_layout() {
        let v = OampduInfo::phase1(PackageVariant::A).encode();
        assert_eq!(&v[0..4], hex!("03 00 08 00"));
        // Local Information TLV: length 16 covers type+length+value.
        assert_eq!(v[4], TLV_LOCAL_INFO);
        assert_eq!(v[5], 16);
        assert_eq!(&v[6..20], LOCAL_INFO);
        // Variant fingerprint.
        assert_eq!(&v[20..27], hex!("fe 07 00 10 00 00 23"));
    }

    #[test]
    fn test_phase2_echoes_peer() {
        let peer = [0xaa; 14];
        let info = OampduInfo::phase2(&peer, PackageVariant::B);
        let parsed = OampduInfo::parse(&info.encode()).unwrap();
        assert_eq!(parsed.flags, FLAGS_INFO_SECOND);
        assert_eq!(parsed.remote_info.as_deref(), Some(&peer[..]));
        assert_eq!(parsed.variant(), Some(PackageVariant::B));
    }

    #[test]
    fn test_phase3_has_no_osi() {
        let info = OampduInfo::phase3(&LOCAL_INFO);
        let parsed = OampduInfo::parse(&info.encode()).unwrap();
        assert_eq!(parsed.flags, FLAGS_INFO_FINAL);
        assert!(parsed.org_specific.is_none());
        assert_eq!(parsed.variant(), None);
        assert!(parsed.matches(PackageVariant::A));
        assert!(parsed.matches(PackageVariant::B));
    }

    #[test]
    fn test_variant_discrimination() {
        let a = OampduInfo {
            flags: FLAGS_INFO_FIRST,
            org_specific: Some(vec![0x00, 0x10, 0x00, 0x00, 0x23]),
            ..Default::default()
        };
        assert_eq!(a.variant(), Some(PackageVariant::A));
        assert!(a.matches(PackageVariant::A));
        assert!(!a.matches(PackageVariant::B));

        let b = OampduInfo {
            flags: FLAGS_INFO_FIRST,
            org_specific: Some(vec![0x90, 0x82, 0x60, 0x00, 0x00]),
            ..Default::default()
        };
        assert_eq!(b.variant(), Some(PackageVariant::B));
    }

    #[test]
    fn test_tlv_walk_stops_at_zero_length() {
        let bytes = hex!("03 00 08 00 01 04 aa bb 00 00 ff ff");
        let parsed = OampduInfo::parse(&bytes).unwrap();
        assert_eq!(parsed.local_info.as_deref(), Some(&hex!("aa bb")[..]));
        assert!(parsed.remote_info.is_none());
    }

    #[test]
    fn test_unknown_tlv_type() {
        let bytes = hex!("03 00 08 00 09 04 aa bb");
        match OampduInfo::parse(&bytes) {
            Err(FrameError::UnknownTlvType { tlv_type }) => {
                assert_eq!(tlv_type, 0x09)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
