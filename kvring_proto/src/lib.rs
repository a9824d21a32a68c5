pub mod id;

pub use id::{between, hash, Identifier};

/// Wire messages and the generated `Chord` service.
///
/// An empty `address` in a [`chord::NodeAddress`] means "no node", which is how
/// `GetPredecessor` reports an unknown predecessor.
pub mod chord {
    use std::collections::HashMap;

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Empty {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NodeAddress {
        #[prost(string, tag = "1")]
        pub address: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FindSuccessorRequest {
        /// 20 big-endian bytes.
        #[prost(bytes = "vec", tag = "1")]
        pub id: Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PutRequest {
        #[prost(string, tag = "1")]
        pub key: String,
        #[prost(string, tag = "2")]
        pub value: String,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct PutResponse {
        #[prost(bool, tag = "1")]
        pub success: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetRequest {
        #[prost(string, tag = "1")]
        pub key: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetResponse {
        #[prost(string, tag = "1")]
        pub value: String,
        #[prost(bool, tag = "2")]
        pub found: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DeleteRequest {
        #[prost(string, tag = "1")]
        pub key: String,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct DeleteResponse {
        #[prost(bool, tag = "1")]
        pub deleted: bool,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct PassSuccessorRequest {
        #[prost(uint32, tag = "1")]
        pub index: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NodeState {
        #[prost(string, tag = "1")]
        pub address: String,
        #[prost(bytes = "vec", tag = "2")]
        pub id: Vec<u8>,
        #[prost(string, repeated, tag = "3")]
        pub successors: Vec<String>,
        #[prost(string, tag = "4")]
        pub predecessor: String,
        #[prost(string, repeated, tag = "5")]
        pub finger_table: Vec<String>,
        #[prost(map = "string, string", tag = "6")]
        pub store: HashMap<String, String>,
    }

    include!(concat!(env!("OUT_DIR"), "/chord.Chord.rs"));
}
