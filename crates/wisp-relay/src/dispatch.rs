//! Frame-type dispatch.

use crate::error::RelayError;
use crate::node::RelayNode;
use crate::session::{Session, SessionRole};
use std::sync::Arc;
use wisp_proto::{Frame, FrameType};

impl RelayNode {
    /// Route one decoded frame to its handler.
    ///
    /// # Errors
    ///
    /// Any error closes the session: handshake failures, or DATA/NODE_INFO
    /// from a session that has not authenticated. Unknown frame types never
    /// reach here; the codec rejects them and the reader closes the session.
    pub(crate) async fn dispatch(
        &self,
        session: &Arc<Session>,
        frame: Frame,
    ) -> Result<(), RelayError> {
        match frame.frame_type {
            FrameType::Handshake => {
                self.handshake
                    .handle(&self.directories, session, &frame)
                    .await
            }
            FrameType::Data | FrameType::SignedData => {
                if session.role() == SessionRole::Unset {
                    return Err(RelayError::Auth("data frame before authentication"));
                }
                self.router.route(session, frame).await
            }
            FrameType::NodeInfo => {
                if session.role() == SessionRole::Unset {
                    return Err(RelayError::Auth("node-info before authentication"));
                }
                self.gossip.handle(session, &frame).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::session::testing::session_pair;

    #[tokio::test]
    async fn test_data_before_authentication_is_fatal() {
        let node = RelayNode::new(RelayConfig::ephemeral());
        let (session, _rx) = session_pair(1);

        let frame = Frame::new(FrameType::Data, vec![0u8; 40]);
        assert!(matches!(
            node.dispatch(&session, frame).await,
            Err(RelayError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_node_info_before_authentication_is_fatal() {
        let node = RelayNode::new(RelayConfig::ephemeral());
        let (session, _rx) = session_pair(1);

        let frame = Frame::new(FrameType::NodeInfo, vec![2]);
        assert!(matches!(
            node.dispatch(&session, frame).await,
            Err(RelayError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_data_from_authenticated_session_is_routed() {
        let node = RelayNode::new(RelayConfig::ephemeral());
        let (session, _rx) = session_pair(1);
        session.set_role(SessionRole::Client);

        // unknown addressee: accepted and parked
        let frame = Frame::new(FrameType::Data, vec![9u8; 40]);
        node.dispatch(&session, frame).await.unwrap();
        assert_eq!(node.pending_queries(), 1);
    }
}
