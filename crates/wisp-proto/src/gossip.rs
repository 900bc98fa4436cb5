//! Node-info payload bodies: peer discovery and addressee location.
//!
//! The first payload byte of a NODE_INFO frame selects a subtype; the rest is
//! the subtype's body. Counts are big-endian `u16`, addresses are UTF-8 with
//! a one-byte length prefix.

use crate::error::GossipError;
use crate::KEY_SIZE;

/// Longest address that fits the wire's one-byte length prefix.
pub const MAX_ADDRESS_LEN: usize = u8::MAX as usize;

const REQUEST_CLIENTS: u8 = 0;
const RESPONSE_CLIENTS: u8 = 1;
const REQUEST_SERVERS: u8 = 2;
const RESPONSE_SERVERS: u8 = 3;
const ADD_SERVER: u8 = 4;
const QUERY_CLIENT: u8 = 5;
const QUERY_RESPONSE: u8 = 6;

/// One advertised peer: its public key and the address it can be dialed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAdvert {
    /// The peer's public key.
    pub key: [u8; KEY_SIZE],
    /// The peer's dialable address.
    pub address: String,
}

/// Decoded NODE_INFO payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInfo {
    /// Subtype 0. Reserved, unused.
    RequestClients,
    /// Subtype 1. Reserved, unused.
    ResponseClients,
    /// Subtype 2. Ask a node for its known peers.
    RequestServers,
    /// Subtype 3. The known-peer list.
    ResponseServers(Vec<ServerAdvert>),
    /// Subtype 4. Ask a node to dial an address.
    AddServer(String),
    /// Subtype 5. One-hop federated lookup for an addressee.
    QueryClient([u8; KEY_SIZE]),
    /// Subtype 6. Lookup answer; `owner` is the hosting node when found.
    QueryResponse {
        /// The addressee that was looked up.
        target: [u8; KEY_SIZE],
        /// Public key of the node hosting the addressee, if any.
        owner: Option<[u8; KEY_SIZE]>,
    },
}

impl NodeInfo {
    /// The subtype byte this payload encodes to.
    #[must_use]
    pub fn subtype(&self) -> u8 {
        match self {
            Self::RequestClients => REQUEST_CLIENTS,
            Self::ResponseClients => RESPONSE_CLIENTS,
            Self::RequestServers => REQUEST_SERVERS,
            Self::ResponseServers(_) => RESPONSE_SERVERS,
            Self::AddServer(_) => ADD_SERVER,
            Self::QueryClient(_) => QUERY_CLIENT,
            Self::QueryResponse { .. } => QUERY_RESPONSE,
        }
    }

    /// Encode into a NODE_INFO frame payload.
    ///
    /// # Errors
    ///
    /// [`GossipError::AddressTooLong`] if an address does not fit the
    /// one-byte length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, GossipError> {
        let mut buf = vec![self.subtype()];
        match self {
            Self::RequestClients | Self::ResponseClients | Self::RequestServers => {}
            Self::ResponseServers(adverts) => {
                let count = u16::try_from(adverts.len()).unwrap_or(u16::MAX);
                buf.extend_from_slice(&count.to_be_bytes());
                for advert in adverts.iter().take(usize::from(count)) {
                    buf.extend_from_slice(&advert.key);
                    push_address(&mut buf, &advert.address)?;
                }
            }
            Self::AddServer(address) => {
                push_address(&mut buf, address)?;
            }
            Self::QueryClient(target) => {
                buf.extend_from_slice(target);
            }
            Self::QueryResponse { target, owner } => {
                buf.push(u8::from(owner.is_some()));
                buf.extend_from_slice(target);
                if let Some(owner) = owner {
                    buf.extend_from_slice(owner);
                }
            }
        }
        Ok(buf)
    }

    /// Decode a NODE_INFO frame payload.
    ///
    /// # Errors
    ///
    /// Returns a [`GossipError`] describing the first malformation: empty
    /// payload, unknown subtype, a body shorter than its declared fields, a
    /// non-UTF-8 address, or an out-of-range status byte.
    pub fn decode(payload: &[u8]) -> Result<Self, GossipError> {
        let (&subtype, body) = payload.split_first().ok_or(GossipError::Empty)?;
        match subtype {
            REQUEST_CLIENTS => Ok(Self::RequestClients),
            RESPONSE_CLIENTS => Ok(Self::ResponseClients),
            REQUEST_SERVERS => Ok(Self::RequestServers),
            RESPONSE_SERVERS => {
                let mut cursor = Cursor::new(body, subtype);
                let count = u16::from_be_bytes(cursor.array::<2>()?);
                let mut adverts = Vec::with_capacity(usize::from(count).min(64));
                for _ in 0..count {
                    let key = cursor.array::<KEY_SIZE>()?;
                    let address = cursor.address()?;
                    adverts.push(ServerAdvert { key, address });
                }
                Ok(Self::ResponseServers(adverts))
            }
            ADD_SERVER => {
                let mut cursor = Cursor::new(body, subtype);
                Ok(Self::AddServer(cursor.address()?))
            }
            QUERY_CLIENT => {
                let mut cursor = Cursor::new(body, subtype);
                Ok(Self::QueryClient(cursor.array::<KEY_SIZE>()?))
            }
            QUERY_RESPONSE => {
                let mut cursor = Cursor::new(body, subtype);
                let status = cursor.array::<1>()?[0];
                let target = cursor.array::<KEY_SIZE>()?;
                let owner = match status {
                    0 => None,
                    1 => Some(cursor.array::<KEY_SIZE>()?),
                    other => return Err(GossipError::InvalidStatus(other)),
                };
                Ok(Self::QueryResponse { target, owner })
            }
            other => Err(GossipError::UnknownSubtype(other)),
        }
    }
}

fn push_address(buf: &mut Vec<u8>, address: &str) -> Result<(), GossipError> {
    let bytes = address.as_bytes();
    if bytes.len() > MAX_ADDRESS_LEN {
        return Err(GossipError::AddressTooLong(MAX_ADDRESS_LEN));
    }
    buf.push(bytes.len() as u8);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked reader over a subtype body.
struct Cursor<'a> {
    body: &'a [u8],
    subtype: u8,
}

impl<'a> Cursor<'a> {
    fn new(body: &'a [u8], subtype: u8) -> Self {
        Self { body, subtype }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], GossipError> {
        if self.body.len() < n {
            return Err(GossipError::Truncated {
                subtype: self.subtype,
            });
        }
        let (head, rest) = self.body.split_at(n);
        self.body = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], GossipError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn address(&mut self) -> Result<String, GossipError> {
        let len = usize::from(self.array::<1>()?[0]);
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| GossipError::InvalidAddress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_servers_roundtrip() {
        let bytes = NodeInfo::RequestServers.encode().unwrap();
        assert_eq!(bytes, vec![2]);
        assert_eq!(NodeInfo::decode(&bytes).unwrap(), NodeInfo::RequestServers);
    }

    #[test]
    fn test_response_servers_roundtrip() {
        let msg = NodeInfo::ResponseServers(vec![
            ServerAdvert {
                key: [1u8; 32],
                address: "ws://relay-a:8080".into(),
            },
            ServerAdvert {
                key: [2u8; 32],
                address: "ws://relay-b:9090".into(),
            },
        ]);

        let bytes = msg.encode().unwrap();
        assert_eq!(NodeInfo::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_response_servers_empty_list() {
        let msg = NodeInfo::ResponseServers(Vec::new());
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes, vec![3, 0, 0]);
        assert_eq!(NodeInfo::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_add_server_roundtrip() {
        let msg = NodeInfo::AddServer("ws://127.0.0.1:8080".into());
        let bytes = msg.encode().unwrap();
        assert_eq!(NodeInfo::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_query_client_roundtrip() {
        let msg = NodeInfo::QueryClient([42u8; 32]);
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes.len(), 1 + 32);
        assert_eq!(NodeInfo::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_query_response_found() {
        let msg = NodeInfo::QueryResponse {
            target: [3u8; 32],
            owner: Some([4u8; 32]),
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes[1], 1);
        assert_eq!(bytes.len(), 1 + 1 + 32 + 32);
        assert_eq!(NodeInfo::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_query_response_not_found() {
        let msg = NodeInfo::QueryResponse {
            target: [3u8; 32],
            owner: None,
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes[1], 0);
        assert_eq!(bytes.len(), 1 + 1 + 32);
        assert_eq!(NodeInfo::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert_eq!(NodeInfo::decode(&[]).unwrap_err(), GossipError::Empty);
    }

    #[test]
    fn test_unknown_subtype_rejected() {
        assert_eq!(
            NodeInfo::decode(&[9]).unwrap_err(),
            GossipError::UnknownSubtype(9)
        );
    }

    #[test]
    fn test_truncated_query_rejected() {
        let err = NodeInfo::decode(&[5, 1, 2, 3]).unwrap_err();
        assert_eq!(err, GossipError::Truncated { subtype: 5 });
    }

    #[test]
    fn test_found_response_missing_owner_rejected() {
        let mut bytes = vec![6, 1];
        bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            NodeInfo::decode(&bytes).unwrap_err(),
            GossipError::Truncated { subtype: 6 }
        );
    }

    #[test]
    fn test_bad_status_rejected() {
        let mut bytes = vec![6, 7];
        bytes.extend_from_slice(&[0u8; 64]);
        assert_eq!(
            NodeInfo::decode(&bytes).unwrap_err(),
            GossipError::InvalidStatus(7)
        );
    }

    #[test]
    fn test_address_length_past_end_rejected() {
        // declared length 10, only 3 bytes follow
        let bytes = vec![4, 10, b'w', b's', b':'];
        assert_eq!(
            NodeInfo::decode(&bytes).unwrap_err(),
            GossipError::Truncated { subtype: 4 }
        );
    }

    #[test]
    fn test_non_utf8_address_rejected() {
        let bytes = vec![4, 2, 0xFF, 0xFE];
        assert_eq!(
            NodeInfo::decode(&bytes).unwrap_err(),
            GossipError::InvalidAddress
        );
    }

    #[test]
    fn test_oversized_address_rejected_on_encode() {
        let msg = NodeInfo::AddServer("x".repeat(300));
        assert_eq!(
            msg.encode().unwrap_err(),
            GossipError::AddressTooLong(MAX_ADDRESS_LEN)
        );
    }
}
