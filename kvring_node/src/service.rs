use kvring_proto::chord::{
    chord_server::Chord, DeleteRequest, DeleteResponse, Empty, FindSuccessorRequest, GetRequest,
    GetResponse, NodeAddress, NodeState, PassSuccessorRequest, PutRequest, PutResponse,
};
use kvring_proto::Identifier;
use log::debug;
use tonic::{Request, Response, Status};

use crate::error::ChordError;
use crate::node::Node;

impl Node {
    fn ensure_listening(&self) -> Result<(), Status> {
        if self.is_listening() {
            Ok(())
        } else {
            Err(ChordError::NotListening.into())
        }
    }
}

#[tonic::async_trait]
impl Chord for Node {
    async fn find_successor(
        &self,
        request: Request<FindSuccessorRequest>,
    ) -> Result<Response<NodeAddress>, Status> {
        let raw = request.into_inner().id;
        let id = Identifier::from_bytes_be(&raw).ok_or(ChordError::InvalidIdentifier(raw.len()))?;
        let address = Node::find_successor(self, &id).await?;
        Ok(Response::new(NodeAddress { address }))
    }

    async fn get_predecessor(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<NodeAddress>, Status> {
        let address = self.predecessor().await.unwrap_or_default();
        Ok(Response::new(NodeAddress { address }))
    }

    async fn notify(&self, request: Request<NodeAddress>) -> Result<Response<Empty>, Status> {
        self.ensure_listening()?;
        let candidate = request.into_inner().address;
        if candidate.is_empty() {
            return Err(ChordError::MissingAddress("notify").into());
        }
        Node::notify(self, &candidate).await;
        Ok(Response::new(Empty {}))
    }

    async fn put(&self, request: Request<PutRequest>) -> Result<Response<PutResponse>, Status> {
        self.ensure_listening()?;
        let req = request.into_inner();
        debug!("{}: put {}", self.addr, req.key);
        self.put_local(req.key, req.value).await;
        Ok(Response::new(PutResponse { success: true }))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        self.ensure_listening()?;
        let req = request.into_inner();
        let response = match self.get_local(&req.key).await {
            Some(value) => GetResponse { value, found: true },
            None => GetResponse {
                value: String::new(),
                found: false,
            },
        };
        Ok(Response::new(response))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        self.ensure_listening()?;
        let req = request.into_inner();
        let deleted = self.delete_local(&req.key).await;
        Ok(Response::new(DeleteResponse { deleted }))
    }

    async fn ping(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(Response::new(Empty {}))
    }

    async fn pass_successor(
        &self,
        request: Request<PassSuccessorRequest>,
    ) -> Result<Response<NodeAddress>, Status> {
        let index = request.into_inner().index as usize;
        let address = self.successor_at(index).await.unwrap_or_default();
        Ok(Response::new(NodeAddress { address }))
    }

    async fn migrate_when_joining(
        &self,
        request: Request<NodeAddress>,
    ) -> Result<Response<Empty>, Status> {
        self.ensure_listening()?;
        let joiner = request.into_inner().address;
        Node::migrate_when_joining(self, &joiner).await?;
        Ok(Response::new(Empty {}))
    }

    async fn dump(&self, _request: Request<Empty>) -> Result<Response<NodeState>, Status> {
        let state: NodeState = Node::dump(self).await.into();
        Ok(Response::new(state))
    }
}
