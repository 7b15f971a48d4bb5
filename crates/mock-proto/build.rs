use prost_build::Config;
use std::path::PathBuf;

const PROTOS: &[&str] = &[
    "proto/confidence/iam/v1/auth.proto",
    "proto/confidence/flags/resolver/v1/internal_api.proto",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    let includes = vec![PathBuf::from("proto"), protoc_bin_vendored::include_path()?];
    let descriptor_path = PathBuf::from(std::env::var("OUT_DIR")?).join("mock_descriptor.bin");

    // Reflection backs the gateway's proto3 JSON mapping
    let mut config = Config::new();
    prost_reflect_build::Builder::new()
        .descriptor_pool("crate::DESCRIPTOR_POOL")
        .configure(&mut config, PROTOS, &includes)?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(&descriptor_path)
        .compile_protos_with_config(config, PROTOS, &includes)?;

    // Tell cargo to recompile if any .proto files change
    println!("cargo:rerun-if-changed=proto/");

    Ok(())
}
