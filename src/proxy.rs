//! PROXY protocol v1 (text) and v2 (binary) preamble decoding (spec §4.B).
//!
//! There's no teacher code for this — `pkg/http` never terminates a proxied
//! connection — so the shape here (a plain decode function returning bytes
//! consumed plus a small error enum) follows the style of the standalone
//! `proxy_protocol.rs` reference implementations in the retrieval pack
//! (e.g. the EasyPost/hyper-networklistener-proxy one) rather than a teacher
//! file, while keeping this crate's error/`Span`-free conventions (addresses
//! are parsed eagerly into `std::net` types, since nothing downstream needs
//! to re-slice the preamble).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use crate::errors::*;

/// The peer/local addresses recovered from a PROXY preamble. Only
/// meaningful when `RequestFlags::PROXIED` is set on the owning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProxyInfo {
    /// Absent for a v2 `LOCAL` command, whose addresses are unspecified.
    pub peer: Option<SocketAddr>,
    pub local: Option<SocketAddr>,
}

pub enum ProxyDecode {
    /// No PROXY preamble was present; the buffer is untouched.
    NotPresent,
    Present { info: ProxyInfo, consumed: usize },
}

const V1_MAX_HEADER_LEN: usize = 108;
const V2_SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];
const V2_FIXED_HEADER_LEN: usize = 16;

/// Peeks at the first bytes of `data` and, if they form a PROXY preamble,
/// decodes it and reports how many bytes to skip before continuing to parse
/// the request line. Returns `Err` only when a preamble was clearly started
/// but turned out malformed (the driver maps this to `400 Bad Request`).
pub fn decode_proxy_preamble(data: &[u8]) -> Result<ProxyDecode> {
    if data.len() >= 4 && &data[0..4] == b"PROX" {
        return decode_v1(data);
    }

    if data.len() >= 4 && &data[0..4] == b"\r\n\r\n" {
        return decode_v2(data);
    }

    Ok(ProxyDecode::NotPresent)
}

fn decode_v1(data: &[u8]) -> Result<ProxyDecode> {
    let search_len = data.len().min(V1_MAX_HEADER_LEN);
    let crlf_at = data[..search_len]
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or_else(|| err_msg("PROXY v1 header missing CRLF within 108 bytes"))?;

    let line = &data[..crlf_at];
    let line = std::str::from_utf8(line).map_err(|_| err_msg("PROXY v1 header is not UTF-8"))?;

    let line = line
        .strip_prefix("PROXY ")
        .ok_or_else(|| err_msg("PROXY v1 header missing 'PROXY ' prefix"))?;

    let mut parts = line.split(' ');
    let protocol = parts.next().ok_or_else(|| err_msg("PROXY v1 missing protocol"))?;
    let src_addr = parts.next().ok_or_else(|| err_msg("PROXY v1 missing source address"))?;
    let dst_addr = parts
        .next()
        .ok_or_else(|| err_msg("PROXY v1 missing destination address"))?;
    let src_port = parts.next().ok_or_else(|| err_msg("PROXY v1 missing source port"))?;
    let dst_port = parts
        .next()
        .ok_or_else(|| err_msg("PROXY v1 missing destination port"))?;

    if parts.next().is_some() {
        return Err(err_msg("PROXY v1 header has too many fields"));
    }

    match protocol {
        "TCP4" | "TCP6" => {}
        _ => return Err(format_err!("Unsupported PROXY v1 protocol: {}", protocol)),
    }

    let src_ip = IpAddr::from_str(src_addr).map_err(|_| err_msg("Invalid PROXY v1 source address"))?;
    let dst_ip =
        IpAddr::from_str(dst_addr).map_err(|_| err_msg("Invalid PROXY v1 destination address"))?;
    let src_port = parse_port(src_port)?;
    let dst_port = parse_port(dst_port)?;

    Ok(ProxyDecode::Present {
        info: ProxyInfo {
            peer: Some(SocketAddr::new(src_ip, src_port)),
            local: Some(SocketAddr::new(dst_ip, dst_port)),
        },
        consumed: crlf_at + 2,
    })
}

fn parse_port(s: &str) -> Result<u16> {
    let v: u32 = s.parse().map_err(|_| err_msg("PROXY v1 port is not numeric"))?;
    if v > 65535 {
        return Err(err_msg("PROXY v1 port out of range"));
    }
    Ok(v as u16)
}

fn decode_v2(data: &[u8]) -> Result<ProxyDecode> {
    if data.len() < V2_FIXED_HEADER_LEN {
        return Err(err_msg("PROXY v2 header shorter than fixed structure"));
    }

    if data[0..12] != V2_SIGNATURE {
        return Err(err_msg("PROXY v2 signature mismatch"));
    }

    let cmd_ver = data[12];
    let fam = data[13];
    let declared_len = u16::from_be_bytes([data[14], data[15]]) as usize;

    if V2_FIXED_HEADER_LEN + declared_len > data.len() {
        return Err(err_msg("PROXY v2 declared length exceeds available data"));
    }

    let addr_block = &data[V2_FIXED_HEADER_LEN..V2_FIXED_HEADER_LEN + declared_len];
    let consumed = V2_FIXED_HEADER_LEN + declared_len;

    let info = match cmd_ver {
        0x20 => ProxyInfo::default(),
        0x21 => match fam {
            0x11 => {
                if addr_block.len() < 12 {
                    return Err(err_msg("PROXY v2 IPv4 address block too short"));
                }
                let src = Ipv4Addr::new(addr_block[0], addr_block[1], addr_block[2], addr_block[3]);
                let dst = Ipv4Addr::new(addr_block[4], addr_block[5], addr_block[6], addr_block[7]);
                let src_port = u16::from_be_bytes([addr_block[8], addr_block[9]]);
                let dst_port = u16::from_be_bytes([addr_block[10], addr_block[11]]);
                ProxyInfo {
                    peer: Some(SocketAddr::new(IpAddr::V4(src), src_port)),
                    local: Some(SocketAddr::new(IpAddr::V4(dst), dst_port)),
                }
            }
            0x21 => {
                if addr_block.len() < 36 {
                    return Err(err_msg("PROXY v2 IPv6 address block too short"));
                }
                let mut src_octets = [0u8; 16];
                let mut dst_octets = [0u8; 16];
                src_octets.copy_from_slice(&addr_block[0..16]);
                dst_octets.copy_from_slice(&addr_block[16..32]);
                let src_port = u16::from_be_bytes([addr_block[32], addr_block[33]]);
                let dst_port = u16::from_be_bytes([addr_block[34], addr_block[35]]);
                ProxyInfo {
                    peer: Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(src_octets)), src_port)),
                    local: Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(dst_octets)), dst_port)),
                }
            }
            _ => return Err(format_err!("Unsupported PROXY v2 family byte: 0x{:02x}", fam)),
        },
        _ => return Err(format_err!("Unsupported PROXY v2 command/version byte: 0x{:02x}", cmd_ver)),
    };

    Ok(ProxyDecode::Present { info, consumed })
}
