fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_file = "proto/node_agent.proto";

    println!("cargo:rerun-if-changed={proto_file}");

    // Use the vendored protoc so builds don't depend on a system install.
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_build::compile_protos(proto_file)?;

    Ok(())
}
