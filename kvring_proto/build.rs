use tonic_build::manual::{Builder, Method, Service};

// The wire messages are hand-written prost structs in src/lib.rs, so the
// service stubs are generated from this table instead of a .proto file.
const METHODS: &[(&str, &str, &str, &str)] = &[
    ("find_successor", "FindSuccessor", "FindSuccessorRequest", "NodeAddress"),
    ("get_predecessor", "GetPredecessor", "Empty", "NodeAddress"),
    ("notify", "Notify", "NodeAddress", "Empty"),
    ("put", "Put", "PutRequest", "PutResponse"),
    ("get", "Get", "GetRequest", "GetResponse"),
    ("delete", "Delete", "DeleteRequest", "DeleteResponse"),
    ("ping", "Ping", "Empty", "Empty"),
    ("pass_successor", "PassSuccessor", "PassSuccessorRequest", "NodeAddress"),
    ("migrate_when_joining", "MigrateWhenJoining", "NodeAddress", "Empty"),
    ("dump", "Dump", "Empty", "NodeState"),
];

fn main() {
    let mut service = Service::builder().name("Chord").package("chord");

    for (name, route, input, output) in METHODS {
        service = service.method(
            Method::builder()
                .name(name)
                .route_name(route)
                .input_type(format!("crate::chord::{input}"))
                .output_type(format!("crate::chord::{output}"))
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        );
    }

    Builder::new().compile(&[service.build()]);
}
